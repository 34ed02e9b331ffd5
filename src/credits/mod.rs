//! Purchase crediting subsystem.
//!
//! # Data Flow
//! ```text
//! POST /credits/verify {tx hash, chain id}
//!     → verifier.rs (receipt, depth, contract, event, payer)
//!     → packages.rs (package id → credits)
//!     → ledger (record PURCHASE, unique on tx hash)
//! ```
//!
//! Duplicate submissions are absorbed here and reported as success.

pub mod packages;
pub mod verifier;

pub use packages::PackageTable;
pub use verifier::{CreditResult, PurchaseVerifier, VerifyError};
