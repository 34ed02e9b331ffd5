//! API error mapping.
//!
//! Idempotency-signaling outcomes never reach this type - the stores absorb
//! them into successes. Everything here is a genuine, user-actionable
//! failure with a machine-readable `error` kind.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::auth::AuthError;
use crate::credits::VerifyError;
use crate::entitlements::UnlockError;

/// Boundary error for the public API.
#[derive(Debug)]
pub enum ApiError {
    Auth(AuthError),
    Verify(VerifyError),
    Unlock(UnlockError),
    BadRequest(String),
    Unauthorized(&'static str),
    NotFound(&'static str),
    ServiceUnavailable(&'static str),
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        ApiError::Auth(e)
    }
}

impl From<VerifyError> for ApiError {
    fn from(e: VerifyError) -> Self {
        ApiError::Verify(e)
    }
}

impl From<UnlockError> for ApiError {
    fn from(e: UnlockError) -> Self {
        ApiError::Unlock(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Auth(AuthError::MalformedMessage(detail)) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "malformed_message", "detail": detail }),
            ),
            ApiError::Auth(AuthError::SignatureMismatch) => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "signature_mismatch" }),
            ),
            ApiError::Auth(AuthError::NonceInvalid) => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "nonce_invalid" }),
            ),
            ApiError::Verify(VerifyError::TxNotFound) => (
                StatusCode::NOT_FOUND,
                json!({ "error": "tx_not_found", "retryable": true }),
            ),
            ApiError::Verify(VerifyError::WrongChain { expected, actual }) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": "wrong_chain", "expected": expected, "actual": actual }),
            ),
            ApiError::Verify(VerifyError::WrongContract) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": "wrong_contract" }),
            ),
            ApiError::Verify(VerifyError::AddressMismatch) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": "address_mismatch" }),
            ),
            ApiError::Verify(VerifyError::MalformedEvent(detail)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": "malformed_event", "detail": detail }),
            ),
            ApiError::Unlock(UnlockError::InsufficientCredits {
                required,
                available,
            }) => (
                StatusCode::CONFLICT,
                json!({
                    "error": "insufficient_credits",
                    "required": required,
                    "available": available,
                }),
            ),
            ApiError::BadRequest(detail) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "bad_request", "detail": detail }),
            ),
            ApiError::Unauthorized(detail) => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "unauthorized", "detail": detail }),
            ),
            ApiError::NotFound(detail) => (
                StatusCode::NOT_FOUND,
                json!({ "error": "not_found", "detail": detail }),
            ),
            ApiError::ServiceUnavailable(detail) => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "error": "service_unavailable", "detail": detail }),
            ),
        };
        (status, Json(body)).into_response()
    }
}
