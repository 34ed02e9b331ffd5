//! inkgate - on-chain credit ledger and chapter-unlock gate.
//!
//! Readers prove control of a wallet by signing a one-time challenge, buy
//! credits on-chain, submit the transaction hash for crediting, and spend
//! credits to permanently unlock chapters.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌───────────────────────────────────────────────────┐
//!                    │                      INKGATE                       │
//!                    │                                                    │
//!  POST /auth/* ─────┼─▶ auth (nonce registry, EIP-191 recovery,          │
//!                    │         sessions) ──▶ accounts (create-or-load)    │
//!                    │                                                    │
//!  POST /credits/ ───┼─▶ credits::verifier ──▶ blockchain::client         │
//!       verify       │        │                  (receipt, depth)         │
//!                    │        └──record(+n, PURCHASE, tx hash)──▶ ledger  │
//!                    │                                                    │
//!  POST /content/ ───┼─▶ entitlements::unlock ──record(-n, SPEND)─▶ ledger│
//!       {id}/unlock  │        └──grant (one row per account+chapter)      │
//!                    │                                                    │
//!                    │  ┌──────────────────────────────────────────────┐  │
//!                    │  │            Cross-Cutting Concerns             │  │
//!                    │  │  config (+hot reload)   observability         │  │
//!                    │  │  security (rate limit)  lifecycle (shutdown)  │  │
//!                    │  │  admin API              net (TLS)             │  │
//!                    │  └──────────────────────────────────────────────┘  │
//!                    └───────────────────────────────────────────────────┘
//! ```
//!
//! The invariant surface shared by the ledger, verifier, and unlock
//! coordinator: balances always equal the confirmed log, an external tx
//! hash credits at most once, an entitlement exists at most once per
//! (account, chapter), and a nonce authenticates at most once.

// Core subsystems
pub mod accounts;
pub mod auth;
pub mod credits;
pub mod entitlements;
pub mod ledger;

// Infrastructure
pub mod blockchain;
pub mod config;
pub mod http;
pub mod net;

// Cross-cutting concerns
pub mod admin;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::GateConfig;
pub use http::GateServer;
pub use lifecycle::Shutdown;
