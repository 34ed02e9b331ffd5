//! Account registry keyed by wallet address.
//!
//! The wallet address is the canonical identity; the internal uuid exists so
//! ledger and entitlement rows survive address checksumming differences.
//! Accounts are created on first successful wallet authentication.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use alloy::primitives::Address;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Platform role attached to an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Reader,
    Admin,
}

/// A platform account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Internal identifier used by the ledger and entitlement stores.
    pub id: Uuid,
    /// Wallet address (unique, canonical).
    pub address: Address,
    /// Role flag.
    pub role: Role,
    /// Creation timestamp (seconds since epoch).
    pub created_at: u64,
}

/// Thread-safe account store with JSON snapshot persistence.
#[derive(Default)]
pub struct AccountStore {
    by_address: DashMap<Address, Account>,
    by_id: DashMap<Uuid, Address>,
    persistence_path: Option<PathBuf>,
}

impl AccountStore {
    /// Create a new empty store.
    pub fn new(persistence_path: Option<PathBuf>) -> Self {
        Self {
            by_address: DashMap::new(),
            by_id: DashMap::new(),
            persistence_path,
        }
    }

    /// Load from a snapshot file if it exists.
    pub fn load_from_file(path: &Path) -> std::io::Result<Self> {
        let store = Self::new(Some(path.to_path_buf()));
        if path.exists() {
            let file = std::fs::File::open(path)?;
            let reader = std::io::BufReader::new(file);
            let accounts: Vec<Account> = serde_json::from_reader(reader)?;

            for account in accounts {
                store.by_id.insert(account.id, account.address);
                store.by_address.insert(account.address, account);
            }
            tracing::info!("Loaded {} accounts from snapshot", store.by_address.len());
        }
        Ok(store)
    }

    /// Save to the snapshot file.
    pub fn save_to_file(&self) -> std::io::Result<()> {
        if let Some(path) = &self.persistence_path {
            let file = std::fs::File::create(path)?;
            let writer = std::io::BufWriter::new(file);
            let accounts: Vec<Account> = self.by_address.iter().map(|r| r.value().clone()).collect();
            serde_json::to_writer(writer, &accounts)?;
            tracing::debug!("Saved {} accounts to snapshot", accounts.len());
        }
        Ok(())
    }

    /// Load the account for an address, creating it on first sight.
    ///
    /// Creation is serialized per address by the map entry, so two
    /// concurrent first logins observe the same row.
    pub fn get_or_create(&self, address: Address) -> Account {
        let account = self
            .by_address
            .entry(address)
            .or_insert_with(|| {
                let now = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_secs();
                let account = Account {
                    id: Uuid::new_v4(),
                    address,
                    role: Role::Reader,
                    created_at: now,
                };
                tracing::info!(account_id = %account.id, address = %address, "Account created");
                account
            })
            .clone();
        self.by_id.insert(account.id, address);
        account
    }

    /// Look up an account by wallet address.
    pub fn get_by_address(&self, address: &Address) -> Option<Account> {
        self.by_address.get(address).map(|r| r.value().clone())
    }

    /// Look up an account by internal id.
    pub fn get_by_id(&self, id: &Uuid) -> Option<Account> {
        let address = *self.by_id.get(id)?.value();
        self.get_by_address(&address)
    }

    /// Change the role of an existing account.
    pub fn set_role(&self, address: &Address, role: Role) -> Option<Account> {
        let mut entry = self.by_address.get_mut(address)?;
        entry.role = role;
        Some(entry.clone())
    }

    /// Number of registered accounts.
    pub fn count(&self) -> usize {
        self.by_address.len()
    }
}
