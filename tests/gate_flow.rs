//! End-to-end HTTP flow tests against a live server.

use alloy::signers::local::PrivateKeySigner;
use inkgate::config::schema::ChapterPriceConfig;
use inkgate::config::GateConfig;
use serde_json::Value;

mod common;
use common::{sign_message, spawn_gate, test_signer, ADMIN_KEY};

fn flow_config() -> GateConfig {
    let mut config = GateConfig::default();
    config.rate_limit.enabled = false;
    config.pricing.overrides.push(ChapterPriceConfig {
        chapter_id: 99,
        cost: 1000,
    });
    config
}

/// Run the nonce → sign → verify handshake, returning the bearer token.
async fn authenticate(
    client: &reqwest::Client,
    base: &str,
    signer: &PrivateKeySigner,
) -> String {
    let address = signer.address().to_string();

    let nonce_body: Value = client
        .post(format!("{base}/auth/nonce"))
        .json(&serde_json::json!({ "address": address }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let message = nonce_body["message"].as_str().unwrap().to_string();
    assert!(message.contains(nonce_body["nonce"].as_str().unwrap()));

    let signature = sign_message(signer, &message);
    let response = client
        .post(format!("{base}/auth/verify"))
        .json(&serde_json::json!({
            "address": address,
            "message": message,
            "signature": signature,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_full_unlock_flow() {
    let (addr, admin_addr, _state) = spawn_gate(flow_config()).await;
    let base = format!("http://{addr}");
    let admin_base = format!("http://{admin_addr}");
    let client = reqwest::Client::new();
    let signer = test_signer();

    let token = authenticate(&client, &base, &signer).await;

    // Fresh account starts at zero
    let balance: Value = client
        .get(format!("{base}/credits/balance"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(balance["balance"], 0);

    // Admin credits 625 (the package the reader would buy on-chain)
    let adjust = client
        .post(format!("{admin_base}/admin/adjust"))
        .bearer_auth(ADMIN_KEY)
        .json(&serde_json::json!({
            "address": signer.address().to_string(),
            "amount": 625,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(adjust.status(), 200);
    let adjust_body: Value = adjust.json().await.unwrap();
    assert_eq!(adjust_body["new_balance"], 625);

    // Unlock a default-priced chapter (cost 5)
    let unlock: Value = client
        .post(format!("{base}/content/12/unlock"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(unlock["unlocked"], true);
    assert_eq!(unlock["newly_unlocked"], true);
    assert_eq!(unlock["new_balance"], 620);

    // Re-unlock is free and idempotent
    let again: Value = client
        .post(format!("{base}/content/12/unlock"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(again["unlocked"], true);
    assert_eq!(again["newly_unlocked"], false);
    assert_eq!(again["new_balance"], 620);

    // A chapter priced beyond the balance is rejected with details
    let expensive = client
        .post(format!("{base}/content/99/unlock"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(expensive.status(), 409);
    let expensive_body: Value = expensive.json().await.unwrap();
    assert_eq!(expensive_body["error"], "insufficient_credits");
    assert_eq!(expensive_body["required"], 1000);
    assert_eq!(expensive_body["available"], 620);

    // Balance unchanged by the rejection
    let balance: Value = client
        .get(format!("{base}/credits/balance"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(balance["balance"], 620);
}

#[tokio::test]
async fn test_auth_replay_rejected() {
    let (addr, _, _state) = spawn_gate(flow_config()).await;
    let base = format!("http://{addr}");
    let client = reqwest::Client::new();
    let signer = test_signer();
    let address = signer.address().to_string();

    let nonce_body: Value = client
        .post(format!("{base}/auth/nonce"))
        .json(&serde_json::json!({ "address": address }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let message = nonce_body["message"].as_str().unwrap().to_string();
    let signature = sign_message(&signer, &message);
    let payload = serde_json::json!({
        "address": address,
        "message": message,
        "signature": signature,
    });

    let first = client
        .post(format!("{base}/auth/verify"))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), 200);

    // Same well-formed message and valid signature: nonce already consumed
    let replay = client
        .post(format!("{base}/auth/verify"))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(replay.status(), 401);
    let replay_body: Value = replay.json().await.unwrap();
    assert_eq!(replay_body["error"], "nonce_invalid");
}

#[tokio::test]
async fn test_unauthenticated_requests_rejected() {
    let (addr, _, _state) = spawn_gate(flow_config()).await;
    let base = format!("http://{addr}");
    let client = reqwest::Client::new();

    let no_token = client
        .get(format!("{base}/credits/balance"))
        .send()
        .await
        .unwrap();
    assert_eq!(no_token.status(), 401);

    let bad_token = client
        .post(format!("{base}/content/1/unlock"))
        .bearer_auth("not-a-session")
        .send()
        .await
        .unwrap();
    assert_eq!(bad_token.status(), 401);
}

#[tokio::test]
async fn test_purchase_verify_unavailable_without_chain() {
    let (addr, _, _state) = spawn_gate(flow_config()).await;
    let base = format!("http://{addr}");
    let client = reqwest::Client::new();
    let signer = test_signer();

    let token = authenticate(&client, &base, &signer).await;
    let response = client
        .post(format!("{base}/credits/verify"))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "external_tx_id": "0x0000000000000000000000000000000000000000000000000000000000000001",
            "chain_id": 1,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 503);
}

#[tokio::test]
async fn test_admin_requires_key() {
    let (_, admin_addr, _state) = spawn_gate(flow_config()).await;
    let admin_base = format!("http://{admin_addr}");
    let client = reqwest::Client::new();

    let no_key = client
        .get(format!("{admin_base}/admin/status"))
        .send()
        .await
        .unwrap();
    assert_eq!(no_key.status(), 401);

    let wrong_key = client
        .get(format!("{admin_base}/admin/status"))
        .bearer_auth("wrong-key")
        .send()
        .await
        .unwrap();
    assert_eq!(wrong_key.status(), 401);

    let good: Value = client
        .get(format!("{admin_base}/admin/status"))
        .bearer_auth(ADMIN_KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(good["status"], "operational");
}

#[tokio::test]
async fn test_auth_rate_limit() {
    let mut config = flow_config();
    config.rate_limit.enabled = true;
    config.rate_limit.requests_per_second = 1;
    config.rate_limit.burst_size = 2;

    let (addr, _, _state) = spawn_gate(config).await;
    let base = format!("http://{addr}");
    let client = reqwest::Client::new();
    let address = test_signer().address().to_string();

    let mut limited = 0;
    for _ in 0..6 {
        let response = client
            .post(format!("{base}/auth/nonce"))
            .json(&serde_json::json!({ "address": address }))
            .send()
            .await
            .unwrap();
        if response.status() == 429 {
            limited += 1;
        }
    }
    assert!(limited > 0, "burst of 6 must trip a 2-token bucket");
}

#[tokio::test]
async fn test_invalid_address_rejected() {
    let (addr, _, _state) = spawn_gate(flow_config()).await;
    let base = format!("http://{addr}");
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/auth/nonce"))
        .json(&serde_json::json!({ "address": "not-an-address" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}
