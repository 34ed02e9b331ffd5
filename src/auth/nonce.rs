//! One-time sign-in challenges.
//!
//! Nonces are keyed by wallet address with a short TTL. Consumption is a
//! single atomic check-and-remove, so two concurrent authentication attempts
//! with the same nonce yield exactly one success.

use std::time::{SystemTime, UNIX_EPOCH};

use alloy::primitives::Address;
use dashmap::DashMap;
use rand::RngCore;

/// An issued, not-yet-consumed challenge.
#[derive(Debug, Clone)]
pub struct IssuedNonce {
    /// Random challenge value (hex).
    pub value: String,
    /// Issue timestamp (seconds since epoch).
    pub issued_at: u64,
    /// Expiry timestamp (seconds since epoch).
    pub expires_at: u64,
}

impl IssuedNonce {
    fn is_expired(&self, now: u64) -> bool {
        now >= self.expires_at
    }
}

/// Keyed TTL store of sign-in challenges.
///
/// Issuing a new nonce for an address invalidates the previous one; a wallet
/// only ever has one live challenge.
pub struct NonceRegistry {
    nonces: DashMap<Address, IssuedNonce>,
    ttl_secs: u64,
}

impl NonceRegistry {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            nonces: DashMap::new(),
            ttl_secs,
        }
    }

    /// Issue a fresh challenge for an address.
    pub fn issue(&self, address: Address) -> IssuedNonce {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let nonce = IssuedNonce {
            value: alloy::hex::encode(bytes),
            issued_at: now,
            expires_at: now + self.ttl_secs,
        };
        self.nonces.insert(address, nonce.clone());
        tracing::debug!(address = %address, expires_at = nonce.expires_at, "Nonce issued");
        nonce
    }

    /// Atomically consume a challenge.
    ///
    /// Succeeds only when the stored value matches and has not expired; the
    /// entry is removed in the same step, so a second caller always fails.
    pub fn consume(&self, address: &Address, value: &str) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        self.nonces
            .remove_if(address, |_, nonce| {
                nonce.value == value && !nonce.is_expired(now)
            })
            .is_some()
    }

    /// Drop expired challenges. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let before = self.nonces.len();
        self.nonces.retain(|_, nonce| !nonce.is_expired(now));
        before - self.nonces.len()
    }

    /// Number of live challenges.
    pub fn len(&self) -> usize {
        self.nonces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nonces.is_empty()
    }
}
