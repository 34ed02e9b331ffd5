//! Wallet authentication subsystem.
//!
//! # Data Flow
//! ```text
//! POST /auth/nonce
//!     → nonce.rs (issue one-time challenge, TTL)
//!     → authenticator.rs (build sign-in message)
//!
//! POST /auth/verify
//!     → authenticator.rs (EIP-191 recovery, claimed-address check)
//!     → nonce.rs (atomic single-use consume)
//!     → accounts (create-or-load)
//!     → session.rs (bearer token)
//! ```

pub mod authenticator;
pub mod nonce;
pub mod session;

pub use authenticator::{AuthError, WalletAuthenticator};
pub use nonce::{IssuedNonce, NonceRegistry};
pub use session::{AccountContext, Session, SessionStore};
