//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Configuration (RPC URLs, chain id)
//!     → client.rs (RPC connection with timeouts, failover)
//!     → credits::verifier (receipt lookup, event decoding)
//! ```
//!
//! # Security Constraints
//! - All RPC calls have configurable timeouts
//! - Graceful degradation when blockchain unreachable
//! - The gate never holds keys; it only reads chain state

pub mod client;
pub mod types;

pub use client::ChainClient;
pub use types::{BlockchainConfig, ChainError, ChainId};
