//! Entitlement subsystem: permanent chapter access.
//!
//! # Data Flow
//! ```text
//! POST /content/{chapter}/unlock
//!     → unlock.rs (coordinator: check, debit, grant, refund-on-race)
//!     → store.rs (one row per (account, chapter), concurrent-safe)
//! ```

pub mod store;
pub mod unlock;

pub use store::{Entitlement, EntitlementStore, GrantOutcome};
pub use unlock::{UnlockCoordinator, UnlockError, UnlockOutcome};
