//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GateConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//!
//! On reload signal:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → pricing table swapped atomically (arc-swap)
//!     → handlers observe new prices
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; only pricing is hot-swapped
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use schema::{
    AdminConfig, AuthConfig, BlockchainConfig, CreditsConfig, GateConfig, ListenerConfig,
    PricingConfig, RateLimitConfig, StorageConfig,
};
