//! Route handlers for the public API.

use alloy::primitives::{Address, TxHash};
use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::accounts::Role;
use crate::auth::{AccountContext, AuthError};
use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::observability::metrics;

#[derive(Debug, Deserialize)]
pub struct NonceRequest {
    pub address: String,
}

#[derive(Debug, Serialize)]
pub struct NonceResponse {
    pub nonce: String,
    pub message: String,
    pub expires_at: u64,
}

/// `POST /auth/nonce` - issue a sign-in challenge.
pub async fn request_nonce(
    State(state): State<AppState>,
    Json(request): Json<NonceRequest>,
) -> Result<Json<NonceResponse>, ApiError> {
    let address: Address = request
        .address
        .trim()
        .parse()
        .map_err(|_| ApiError::BadRequest("invalid wallet address".to_string()))?;
    if address.is_zero() {
        return Err(ApiError::BadRequest("zero address not allowed".to_string()));
    }

    let (nonce, message) = state.authenticator.challenge(address);
    Ok(Json(NonceResponse {
        nonce: nonce.value,
        message,
        expires_at: nonce.expires_at,
    }))
}

#[derive(Debug, Deserialize)]
pub struct VerifyAuthRequest {
    pub address: String,
    pub message: String,
    pub signature: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: Uuid,
    pub account_id: Uuid,
    pub address: Address,
    pub role: Role,
    pub expires_at: u64,
}

/// `POST /auth/verify` - verify a signed challenge, establish a session.
pub async fn verify_auth(
    State(state): State<AppState>,
    Json(request): Json<VerifyAuthRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = state
        .authenticator
        .verify(&request.address, &request.message, &request.signature)
        .map_err(|e| {
            metrics::record_auth(match &e {
                AuthError::SignatureMismatch => "signature_mismatch",
                AuthError::NonceInvalid => "nonce_invalid",
                AuthError::MalformedMessage(_) => "malformed",
            });
            ApiError::from(e)
        })?;
    metrics::record_auth("success");

    Ok(Json(SessionResponse {
        token: session.token,
        account_id: session.account_id,
        address: session.address,
        role: session.role,
        expires_at: session.expires_at,
    }))
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub balance: i64,
}

/// `GET /credits/balance` - the caller's current balance.
pub async fn get_balance(
    State(state): State<AppState>,
    Extension(ctx): Extension<AccountContext>,
) -> Json<BalanceResponse> {
    Json(BalanceResponse {
        balance: state.ledger.balance_of(&ctx.account_id),
    })
}

#[derive(Debug, Deserialize)]
pub struct VerifyPurchaseRequest {
    pub external_tx_id: String,
    pub chain_id: u64,
}

#[derive(Debug, Serialize)]
pub struct CreditResponse {
    pub credits_added: u64,
    pub new_balance: i64,
    pub already_credited: bool,
}

/// `POST /credits/verify` - reconcile an on-chain purchase into the ledger.
///
/// The caller's own session fixes the account; submitting someone else's
/// transaction fails the payer check inside the verifier.
pub async fn verify_purchase(
    State(state): State<AppState>,
    Extension(ctx): Extension<AccountContext>,
    Json(request): Json<VerifyPurchaseRequest>,
) -> Result<Json<CreditResponse>, ApiError> {
    let verifier = state
        .verifier
        .as_ref()
        .ok_or(ApiError::ServiceUnavailable("purchase crediting disabled"))?;

    let tx_hash: TxHash = request
        .external_tx_id
        .trim()
        .parse()
        .map_err(|_| ApiError::BadRequest("invalid transaction hash".to_string()))?;

    let result = verifier
        .verify(tx_hash, request.chain_id, ctx.account_id, ctx.address)
        .await?;

    Ok(Json(CreditResponse {
        credits_added: result.credits_added,
        new_balance: result.new_balance,
        already_credited: result.already_credited,
    }))
}

#[derive(Debug, Serialize)]
pub struct UnlockResponse {
    pub unlocked: bool,
    /// False when the chapter was already owned (no charge occurred).
    pub newly_unlocked: bool,
    pub chapter_id: u64,
    pub new_balance: i64,
}

/// `POST /content/{chapter_id}/unlock` - spend credits for permanent access.
pub async fn unlock_chapter(
    State(state): State<AppState>,
    Extension(ctx): Extension<AccountContext>,
    Path(chapter_id): Path<u64>,
) -> Result<Json<UnlockResponse>, ApiError> {
    let cost = state.pricing.load().cost_of(chapter_id);
    let outcome = state.unlocks.unlock(ctx.account_id, chapter_id, cost)?;

    Ok(Json(UnlockResponse {
        unlocked: true,
        newly_unlocked: outcome.newly_unlocked,
        chapter_id,
        new_balance: outcome.new_balance,
    }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub chain: &'static str,
}

/// `GET /health` - liveness plus chain reachability.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let chain = match &state.chain {
        Some(client) => {
            if client.is_healthy().await {
                "healthy"
            } else {
                "unreachable"
            }
        }
        None => "disabled",
    };
    Json(HealthResponse {
        status: "ok",
        chain,
    })
}
