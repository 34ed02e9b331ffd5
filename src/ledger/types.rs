//! Ledger row types and error definitions.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Transaction kind. The sign of the amount is fixed by the kind, never
/// inferred from free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
    /// On-chain purchase credit. Always positive, carries the external id.
    Purchase,
    /// Chapter unlock debit. Always negative.
    Spend,
    /// Compensating credit after a raced unlock. Always positive.
    Refund,
    /// Manual operator adjustment. Either sign, never zero.
    AdminAdjustment,
}

impl TxKind {
    /// Whether `amount` has the sign this kind permits.
    pub fn permits(self, amount: i64) -> bool {
        match self {
            TxKind::Purchase | TxKind::Refund => amount > 0,
            TxKind::Spend => amount < 0,
            TxKind::AdminAdjustment => amount != 0,
        }
    }
}

/// Transaction status. Rows are immutable once they reach a terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    Pending,
    Confirmed,
    Failed,
}

/// A single ledger row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Internal row id.
    pub id: Uuid,
    /// Owning account.
    pub account_id: Uuid,
    /// Signed credit amount (positive = credit, negative = debit).
    pub amount: i64,
    /// Kind, fixing the sign convention.
    pub kind: TxKind,
    /// Status; only confirmed rows count toward the balance.
    pub status: TxStatus,
    /// On-chain transaction hash for purchase rows; unique across the log.
    pub external_tx_id: Option<String>,
    /// Creation timestamp (seconds since epoch).
    pub created_at: u64,
}

/// Ledger rejection reasons.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Debit would take the balance below zero.
    #[error("Insufficient credits: required {required}, available {available}")]
    InsufficientCredits { required: u64, available: u64 },

    /// The external transaction id was already credited. Callers treat this
    /// as idempotent success; `amount` is what the earlier row credited.
    #[error("External transaction already credited ({amount})")]
    DuplicateExternalTx { amount: i64 },

    /// Amount violates the sign convention of the kind.
    #[error("Amount {amount} not permitted for {kind:?} rows")]
    InvalidAmount { kind: TxKind, amount: i64 },
}
