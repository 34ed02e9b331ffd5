//! Admin API handlers: inspection, manual adjustment, reconciliation.

use alloy::primitives::Address;
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::accounts::{Account, Role};
use crate::entitlements::Entitlement;
use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::ledger::{BalanceDrift, LedgerError, Transaction, TxKind};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub accounts: usize,
    pub entitlements: usize,
    pub live_sessions: usize,
    pub live_nonces: usize,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        accounts: state.accounts.count(),
        entitlements: state.entitlements.count(),
        live_sessions: state.sessions.len(),
        live_nonces: state.nonces.len(),
    })
}

#[derive(Serialize)]
pub struct AccountLedgerView {
    pub account: Account,
    pub balance: i64,
    pub transactions: Vec<Transaction>,
}

fn resolve_account(state: &AppState, address: &str) -> Result<Account, ApiError> {
    let address: Address = address
        .trim()
        .parse()
        .map_err(|_| ApiError::BadRequest("invalid wallet address".to_string()))?;
    state
        .accounts
        .get_by_address(&address)
        .ok_or(ApiError::NotFound("no account for that address"))
}

/// `GET /admin/accounts/{address}/ledger`
pub async fn get_account_ledger(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<AccountLedgerView>, ApiError> {
    let account = resolve_account(&state, &address)?;
    Ok(Json(AccountLedgerView {
        balance: state.ledger.balance_of(&account.id),
        transactions: state.ledger.transactions_of(&account.id),
        account,
    }))
}

/// `GET /admin/accounts/{address}/entitlements`
pub async fn get_account_entitlements(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<Vec<Entitlement>>, ApiError> {
    let account = resolve_account(&state, &address)?;
    Ok(Json(state.entitlements.for_account(&account.id)))
}

#[derive(Deserialize)]
pub struct AdjustRequest {
    pub address: String,
    /// Signed credit delta; negative debits obey the non-negative invariant.
    pub amount: i64,
}

#[derive(Serialize)]
pub struct AdjustResponse {
    pub account_id: Uuid,
    pub new_balance: i64,
    pub transaction: Transaction,
}

/// `POST /admin/adjust` - manual ledger correction.
pub async fn post_adjust(
    State(state): State<AppState>,
    Json(request): Json<AdjustRequest>,
) -> Result<Json<AdjustResponse>, ApiError> {
    let account = resolve_account(&state, &request.address)?;

    let transaction = state
        .ledger
        .record(account.id, request.amount, TxKind::AdminAdjustment, None)
        .map_err(|e| match e {
            LedgerError::InsufficientCredits {
                required,
                available,
            } => ApiError::Unlock(crate::entitlements::UnlockError::InsufficientCredits {
                required,
                available,
            }),
            LedgerError::InvalidAmount { .. } => {
                ApiError::BadRequest("adjustment amount must be non-zero".to_string())
            }
            LedgerError::DuplicateExternalTx { .. } => {
                ApiError::BadRequest("adjustments cannot carry an external id".to_string())
            }
        })?;

    tracing::info!(
        account_id = %account.id,
        amount = request.amount,
        "Admin adjustment recorded"
    );
    Ok(Json(AdjustResponse {
        account_id: account.id,
        new_balance: state.ledger.balance_of(&account.id),
        transaction,
    }))
}

#[derive(Serialize)]
pub struct ReconcileResponse {
    pub accounts_checked: usize,
    pub drifts: Vec<BalanceDrift>,
}

/// `POST /admin/reconcile` - recompute every balance from the log.
pub async fn post_reconcile(State(state): State<AppState>) -> Json<ReconcileResponse> {
    let accounts_checked = state.ledger.account_count();
    let drifts = state.ledger.reconcile();
    Json(ReconcileResponse {
        accounts_checked,
        drifts,
    })
}

#[derive(Deserialize)]
pub struct RoleRequest {
    pub address: String,
    pub role: Role,
}

/// `POST /admin/role` - change an account's role flag.
pub async fn post_role(
    State(state): State<AppState>,
    Json(request): Json<RoleRequest>,
) -> Result<Json<Account>, ApiError> {
    let account = resolve_account(&state, &request.address)?;
    let updated = state
        .accounts
        .set_role(&account.address, request.role)
        .ok_or(ApiError::NotFound("no account for that address"))?;
    Ok(Json(updated))
}
