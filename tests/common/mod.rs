//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::Arc;

use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use tokio::net::TcpListener;

use inkgate::admin::setup_admin_router;
use inkgate::config::GateConfig;
use inkgate::http::{build_router, build_state, AppState};

// Well-known test private key (Anvil's first account)
#[allow(dead_code)]
pub const TEST_PRIVATE_KEY: &str =
    "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

pub const ADMIN_KEY: &str = "test-admin-key";

/// Start the public and admin servers on ephemeral ports.
pub async fn spawn_gate(mut config: GateConfig) -> (SocketAddr, SocketAddr, AppState) {
    config.admin.enabled = true;
    config.admin.api_key = ADMIN_KEY.to_string();
    config.observability.metrics_enabled = false;

    let config = Arc::new(config);
    let state = build_state(config, None).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build_router(state.clone()).into_make_service_with_connect_info::<SocketAddr>();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let admin_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let admin_addr = admin_listener.local_addr().unwrap();
    let admin_app = setup_admin_router(state.clone()).into_make_service();
    tokio::spawn(async move {
        axum::serve(admin_listener, admin_app).await.unwrap();
    });

    (addr, admin_addr, state)
}

#[allow(dead_code)]
pub fn test_signer() -> PrivateKeySigner {
    TEST_PRIVATE_KEY.parse().unwrap()
}

#[allow(dead_code)]
pub fn sign_message(signer: &PrivateKeySigner, message: &str) -> String {
    let signature = signer.sign_message_sync(message.as_bytes()).unwrap();
    format!("0x{}", alloy::hex::encode(signature.as_bytes()))
}
