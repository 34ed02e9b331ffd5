//! Security hardening.
//!
//! Body-size limits and request timeouts live in the HTTP middleware stack;
//! this module holds the per-IP rate limiter for the auth endpoints.

pub mod rate_limit;

pub use rate_limit::{rate_limit_middleware, RateLimiterState};
