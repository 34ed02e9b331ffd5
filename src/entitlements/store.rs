//! Durable record of permanently unlocked chapters.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Permanent access by one account to one chapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entitlement {
    pub account_id: Uuid,
    pub chapter_id: u64,
    /// Credits spent at grant time (0 for free chapters).
    pub credits_spent: u64,
    /// Grant timestamp (seconds since epoch).
    pub granted_at: u64,
}

/// Outcome of a grant attempt. Both cases are success for the caller; the
/// distinction only matters to the unlock coordinator's refund path.
#[derive(Debug, Clone)]
pub enum GrantOutcome {
    /// This call created the row.
    Created(Entitlement),
    /// The row already existed; the existing grant is returned.
    AlreadyGranted(Entitlement),
}

impl GrantOutcome {
    pub fn entitlement(&self) -> &Entitlement {
        match self {
            GrantOutcome::Created(e) | GrantOutcome::AlreadyGranted(e) => e,
        }
    }
}

/// Thread-safe entitlement store keyed by (account, chapter).
#[derive(Default)]
pub struct EntitlementStore {
    grants: DashMap<(Uuid, u64), Entitlement>,
    persistence_path: Option<PathBuf>,
}

impl EntitlementStore {
    /// Create a new empty store.
    pub fn new(persistence_path: Option<PathBuf>) -> Self {
        Self {
            grants: DashMap::new(),
            persistence_path,
        }
    }

    /// Load from a snapshot file if it exists.
    pub fn load_from_file(path: &Path) -> std::io::Result<Self> {
        let store = Self::new(Some(path.to_path_buf()));
        if path.exists() {
            let file = std::fs::File::open(path)?;
            let reader = std::io::BufReader::new(file);
            let rows: Vec<Entitlement> = serde_json::from_reader(reader)?;

            for row in rows {
                store.grants.insert((row.account_id, row.chapter_id), row);
            }
            tracing::info!("Loaded {} entitlements from snapshot", store.grants.len());
        }
        Ok(store)
    }

    /// Save to the snapshot file.
    pub fn save_to_file(&self) -> std::io::Result<()> {
        if let Some(path) = &self.persistence_path {
            let file = std::fs::File::create(path)?;
            let writer = std::io::BufWriter::new(file);
            let rows: Vec<Entitlement> = self.grants.iter().map(|r| r.value().clone()).collect();
            serde_json::to_writer(writer, &rows)?;
            tracing::debug!("Saved {} entitlements to snapshot", rows.len());
        }
        Ok(())
    }

    /// Whether the account has unlocked the chapter.
    pub fn has(&self, account_id: &Uuid, chapter_id: u64) -> bool {
        self.grants.contains_key(&(*account_id, chapter_id))
    }

    /// The existing grant, if any.
    pub fn get(&self, account_id: &Uuid, chapter_id: u64) -> Option<Entitlement> {
        self.grants
            .get(&(*account_id, chapter_id))
            .map(|r| r.value().clone())
    }

    /// Grant access, creating at most one row per (account, chapter).
    ///
    /// Concurrent callers are serialized on the map entry; exactly one
    /// observes `Created`, the rest `AlreadyGranted` with the winner's row.
    pub fn grant(&self, account_id: Uuid, chapter_id: u64, credits_spent: u64) -> GrantOutcome {
        match self.grants.entry((account_id, chapter_id)) {
            Entry::Occupied(existing) => GrantOutcome::AlreadyGranted(existing.get().clone()),
            Entry::Vacant(slot) => {
                let now = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_secs();
                let entitlement = Entitlement {
                    account_id,
                    chapter_id,
                    credits_spent,
                    granted_at: now,
                };
                tracing::info!(
                    account_id = %account_id,
                    chapter_id = chapter_id,
                    credits_spent = credits_spent,
                    "Entitlement granted"
                );
                GrantOutcome::Created(slot.insert(entitlement).clone())
            }
        }
    }

    /// All chapters unlocked by an account.
    pub fn for_account(&self, account_id: &Uuid) -> Vec<Entitlement> {
        let mut rows: Vec<Entitlement> = self
            .grants
            .iter()
            .filter(|r| r.key().0 == *account_id)
            .map(|r| r.value().clone())
            .collect();
        rows.sort_by_key(|e| e.chapter_id);
        rows
    }

    /// Total number of grants.
    pub fn count(&self) -> usize {
        self.grants.len()
    }
}
