//! Public HTTP surface.
//!
//! # Routes
//! - `POST /auth/nonce` - issue a sign-in challenge
//! - `POST /auth/verify` - verify signature, establish session
//! - `GET  /credits/balance` - authenticated balance query
//! - `POST /credits/verify` - reconcile an on-chain purchase
//! - `POST /content/{chapter_id}/unlock` - spend credits for access
//! - `GET  /health` - liveness and chain reachability

pub mod error;
pub mod handlers;
pub mod server;

pub use server::{build_router, build_state, AppState, GateServer};
