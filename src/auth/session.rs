//! Explicit session objects for authenticated wallets.
//!
//! Sessions replace ambient "current user" state: the bearer token resolves
//! to a session row, and handlers receive an [`AccountContext`] extension.

use std::time::{SystemTime, UNIX_EPOCH};

use alloy::primitives::Address;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::accounts::{Account, Role};

/// An authenticated session bound to an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token presented by the client.
    pub token: Uuid,
    /// Account the session is bound to.
    pub account_id: Uuid,
    /// Wallet address of the account.
    pub address: Address,
    /// Role at session creation time.
    pub role: Role,
    /// Creation timestamp (seconds since epoch).
    pub created_at: u64,
    /// Expiry timestamp (seconds since epoch).
    pub expires_at: u64,
}

/// Context attached to authenticated requests.
#[derive(Debug, Clone)]
pub struct AccountContext {
    pub account_id: Uuid,
    pub address: Address,
    pub role: Role,
}

impl From<&Session> for AccountContext {
    fn from(session: &Session) -> Self {
        Self {
            account_id: session.account_id,
            address: session.address,
            role: session.role,
        }
    }
}

/// Thread-safe session store with TTL.
pub struct SessionStore {
    sessions: DashMap<Uuid, Session>,
    ttl_secs: u64,
}

impl SessionStore {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl_secs,
        }
    }

    /// Create a session for an authenticated account.
    pub fn create(&self, account: &Account) -> Session {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let session = Session {
            token: Uuid::new_v4(),
            account_id: account.id,
            address: account.address,
            role: account.role,
            created_at: now,
            expires_at: now + self.ttl_secs,
        };
        self.sessions.insert(session.token, session.clone());
        session
    }

    /// Resolve a bearer token. Expired sessions are removed on access.
    pub fn get(&self, token: &Uuid) -> Option<Session> {
        let session = self.sessions.get(token).map(|r| r.value().clone())?;
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        if session.expires_at <= now {
            self.sessions.remove(token);
            return None;
        }
        Some(session)
    }

    /// Drop a session explicitly.
    pub fn revoke(&self, token: &Uuid) -> bool {
        self.sessions.remove(token).is_some()
    }

    /// Drop expired sessions. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let before = self.sessions.len();
        self.sessions.retain(|_, session| session.expires_at > now);
        before - self.sessions.len()
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
