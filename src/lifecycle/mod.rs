//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Initialize stores → Spawn background tasks
//!     → Start listeners
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Persist snapshots → Exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then stores, then listeners
//! - Shutdown drains through a broadcast channel all tasks subscribe to

pub mod shutdown;

pub use shutdown::Shutdown;
