//! Credit ledger subsystem.
//!
//! # Data Flow
//! ```text
//! PurchaseVerifier ──record(+amount, PURCHASE, tx hash)──▶ store.rs
//! UnlockCoordinator ─record(-cost, SPEND)───────────────▶ store.rs
//!                   ─record(+cost, REFUND)──────────────▶ store.rs (race repair)
//! Admin API ────────record(±amount, ADMIN_ADJUSTMENT)───▶ store.rs
//! ```
//!
//! # Design Decisions
//! - The confirmed transaction log is ground truth; balances are a cache
//! - The external-id unique index is the sole double-credit defense
//! - Per-account serialization happens at the storage layer, not in handlers

pub mod store;
pub mod types;

pub use store::{BalanceDrift, LedgerStore};
pub use types::{LedgerError, Transaction, TxKind, TxStatus};
