//! Append-only transaction log with cached per-account balances.
//!
//! # Invariants
//! - The confirmed log is ground truth; the cached balance is a materialized
//!   view updated inside the same per-account critical section as the insert
//! - A debit commits only if the resulting balance stays non-negative
//! - An external transaction id appears at most once across the whole log
//!
//! The per-account critical section is the map entry lock held for the
//! duration of the check-and-write; cross-account traffic does not contend.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;

use crate::ledger::types::{LedgerError, Transaction, TxKind, TxStatus};

/// Per-account log plus its materialized balance.
#[derive(Debug, Default)]
struct AccountLedger {
    entries: Vec<Transaction>,
    balance: i64,
}

impl AccountLedger {
    fn recompute(&self) -> i64 {
        self.entries
            .iter()
            .filter(|tx| tx.status == TxStatus::Confirmed)
            .map(|tx| tx.amount)
            .sum()
    }
}

/// Claim row in the external-id uniqueness index.
#[derive(Debug, Clone, Copy)]
struct ExternalClaim {
    account_id: Uuid,
    amount: i64,
}

/// A cached balance that disagreed with its log during reconciliation.
#[derive(Debug, Clone, Serialize)]
pub struct BalanceDrift {
    pub account_id: Uuid,
    pub cached: i64,
    pub recomputed: i64,
}

/// The single source of truth for account balances.
pub struct LedgerStore {
    ledgers: DashMap<Uuid, AccountLedger>,
    external_index: DashMap<String, ExternalClaim>,
    persistence_path: Option<PathBuf>,
}

impl LedgerStore {
    /// Create a new empty store.
    pub fn new(persistence_path: Option<PathBuf>) -> Self {
        Self {
            ledgers: DashMap::new(),
            external_index: DashMap::new(),
            persistence_path,
        }
    }

    /// Load from a snapshot file if it exists.
    ///
    /// Balances and the external-id index are rebuilt from the log rather
    /// than trusted from the file.
    pub fn load_from_file(path: &Path) -> std::io::Result<Self> {
        let store = Self::new(Some(path.to_path_buf()));
        if path.exists() {
            let file = std::fs::File::open(path)?;
            let reader = std::io::BufReader::new(file);
            let logs: HashMap<Uuid, Vec<Transaction>> = serde_json::from_reader(reader)?;

            let mut rows = 0usize;
            for (account_id, entries) in logs {
                for tx in &entries {
                    if let Some(external) = &tx.external_tx_id {
                        let claim = ExternalClaim {
                            account_id,
                            amount: tx.amount,
                        };
                        if store.external_index.insert(external.clone(), claim).is_some() {
                            tracing::error!(
                                external_tx_id = %external,
                                "Snapshot contains a duplicated external id"
                            );
                        }
                    }
                }
                rows += entries.len();
                let mut ledger = AccountLedger {
                    balance: 0,
                    entries,
                };
                ledger.balance = ledger.recompute();
                store.ledgers.insert(account_id, ledger);
            }
            tracing::info!(
                accounts = store.ledgers.len(),
                rows = rows,
                "Loaded ledger snapshot"
            );
        }
        Ok(store)
    }

    /// Save the transaction log to the snapshot file.
    pub fn save_to_file(&self) -> std::io::Result<()> {
        if let Some(path) = &self.persistence_path {
            let file = std::fs::File::create(path)?;
            let writer = std::io::BufWriter::new(file);
            let logs: HashMap<Uuid, Vec<Transaction>> = self
                .ledgers
                .iter()
                .map(|r| (*r.key(), r.value().entries.clone()))
                .collect();
            serde_json::to_writer(writer, &logs)?;
            tracing::debug!(accounts = logs.len(), "Saved ledger snapshot");
        }
        Ok(())
    }

    /// Append a confirmed transaction; the only write path into the log.
    ///
    /// With an external id, uniqueness is claimed before anything else and a
    /// duplicate returns [`LedgerError::DuplicateExternalTx`] carrying the
    /// previously credited amount. Debits check and write under the account
    /// entry lock, so the balance can never be driven below zero by a race.
    pub fn record(
        &self,
        account_id: Uuid,
        amount: i64,
        kind: TxKind,
        external_tx_id: Option<String>,
    ) -> Result<Transaction, LedgerError> {
        if !kind.permits(amount) {
            return Err(LedgerError::InvalidAmount { kind, amount });
        }

        if let Some(external) = &external_tx_id {
            match self.external_index.entry(external.clone()) {
                Entry::Occupied(claim) => {
                    return Err(LedgerError::DuplicateExternalTx {
                        amount: claim.get().amount,
                    });
                }
                Entry::Vacant(slot) => {
                    slot.insert(ExternalClaim { account_id, amount });
                }
            }
        }

        let mut ledger = self.ledgers.entry(account_id).or_default();

        if amount < 0 && ledger.balance + amount < 0 {
            // roll back the uniqueness claim; the row was never written
            if let Some(external) = &external_tx_id {
                self.external_index.remove(external);
            }
            return Err(LedgerError::InsufficientCredits {
                required: amount.unsigned_abs(),
                available: ledger.balance.max(0) as u64,
            });
        }

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let tx = Transaction {
            id: Uuid::new_v4(),
            account_id,
            amount,
            kind,
            status: TxStatus::Confirmed,
            external_tx_id,
            created_at: now,
        };
        ledger.balance += amount;
        ledger.entries.push(tx.clone());

        tracing::debug!(
            account_id = %account_id,
            amount = amount,
            kind = ?kind,
            balance = ledger.balance,
            "Transaction recorded"
        );
        Ok(tx)
    }

    /// Current balance: the materialized sum of confirmed rows.
    pub fn balance_of(&self, account_id: &Uuid) -> i64 {
        self.ledgers.get(account_id).map(|l| l.balance).unwrap_or(0)
    }

    /// Balance recomputed from the log, bypassing the cache.
    pub fn recompute_balance(&self, account_id: &Uuid) -> i64 {
        self.ledgers
            .get(account_id)
            .map(|l| l.recompute())
            .unwrap_or(0)
    }

    /// All rows for an account, oldest first.
    pub fn transactions_of(&self, account_id: &Uuid) -> Vec<Transaction> {
        self.ledgers
            .get(account_id)
            .map(|l| l.entries.clone())
            .unwrap_or_default()
    }

    /// Recompute every cached balance from its log and repair drift.
    ///
    /// Runs inside each account's entry lock, so concurrent writers observe
    /// either the old or the repaired value, never an intermediate one.
    pub fn reconcile(&self) -> Vec<BalanceDrift> {
        let mut drifts = Vec::new();
        for mut entry in self.ledgers.iter_mut() {
            let recomputed = entry.recompute();
            if recomputed != entry.balance {
                drifts.push(BalanceDrift {
                    account_id: *entry.key(),
                    cached: entry.balance,
                    recomputed,
                });
                tracing::error!(
                    account_id = %entry.key(),
                    cached = entry.balance,
                    recomputed = recomputed,
                    "Balance drift repaired from transaction log"
                );
                entry.balance = recomputed;
            }
        }
        drifts
    }

    /// Number of accounts with at least one row.
    pub fn account_count(&self) -> usize {
        self.ledgers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_then_debit() {
        let ledger = LedgerStore::new(None);
        let account = Uuid::new_v4();

        ledger
            .record(account, 625, TxKind::Purchase, Some("0xabc".to_string()))
            .unwrap();
        assert_eq!(ledger.balance_of(&account), 625);

        ledger.record(account, -5, TxKind::Spend, None).unwrap();
        assert_eq!(ledger.balance_of(&account), 620);
        assert_eq!(ledger.recompute_balance(&account), 620);
    }

    #[test]
    fn test_debit_below_zero_rejected() {
        let ledger = LedgerStore::new(None);
        let account = Uuid::new_v4();

        ledger
            .record(account, 3, TxKind::AdminAdjustment, None)
            .unwrap();
        let err = ledger.record(account, -5, TxKind::Spend, None).unwrap_err();
        match err {
            LedgerError::InsufficientCredits {
                required,
                available,
            } => {
                assert_eq!(required, 5);
                assert_eq!(available, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // Nothing was written
        assert_eq!(ledger.balance_of(&account), 3);
        assert_eq!(ledger.transactions_of(&account).len(), 1);
    }

    #[test]
    fn test_duplicate_external_id() {
        let ledger = LedgerStore::new(None);
        let account = Uuid::new_v4();

        ledger
            .record(account, 625, TxKind::Purchase, Some("0xdead".to_string()))
            .unwrap();
        let err = ledger
            .record(account, 625, TxKind::Purchase, Some("0xdead".to_string()))
            .unwrap_err();
        match err {
            LedgerError::DuplicateExternalTx { amount } => assert_eq!(amount, 625),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(ledger.balance_of(&account), 625);
    }

    #[test]
    fn test_sign_convention_enforced() {
        let ledger = LedgerStore::new(None);
        let account = Uuid::new_v4();

        assert!(matches!(
            ledger.record(account, -10, TxKind::Purchase, None),
            Err(LedgerError::InvalidAmount { .. })
        ));
        assert!(matches!(
            ledger.record(account, 0, TxKind::AdminAdjustment, None),
            Err(LedgerError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn test_balance_equals_log_sum() {
        let ledger = LedgerStore::new(None);
        let account = Uuid::new_v4();

        ledger
            .record(account, 100, TxKind::AdminAdjustment, None)
            .unwrap();
        ledger.record(account, -30, TxKind::Spend, None).unwrap();
        ledger.record(account, 30, TxKind::Refund, None).unwrap();
        ledger.record(account, -60, TxKind::Spend, None).unwrap();

        assert_eq!(ledger.balance_of(&account), 40);
        assert_eq!(
            ledger.balance_of(&account),
            ledger.recompute_balance(&account)
        );
        assert!(ledger.reconcile().is_empty());
    }

    #[test]
    fn test_snapshot_rebuilds_balance_and_index() {
        let path = std::env::temp_dir().join("inkgate_test_ledger.json");
        let account = Uuid::new_v4();

        let ledger = LedgerStore::new(Some(path.clone()));
        ledger
            .record(account, 625, TxKind::Purchase, Some("0xfeed".to_string()))
            .unwrap();
        ledger.record(account, -5, TxKind::Spend, None).unwrap();
        ledger.save_to_file().unwrap();

        let restored = LedgerStore::load_from_file(&path).unwrap();
        assert_eq!(restored.balance_of(&account), 620);
        // The uniqueness index survives the reload
        assert!(matches!(
            restored.record(account, 625, TxKind::Purchase, Some("0xfeed".to_string())),
            Err(LedgerError::DuplicateExternalTx { .. })
        ));

        std::fs::remove_file(path).unwrap_or_default();
    }

    #[test]
    fn test_concurrent_debits_never_overdraw() {
        use std::sync::Arc;

        let ledger = Arc::new(LedgerStore::new(None));
        let account = Uuid::new_v4();
        ledger
            .record(account, 10, TxKind::AdminAdjustment, None)
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let ledger = ledger.clone();
            handles.push(std::thread::spawn(move || {
                ledger.record(account, -3, TxKind::Spend, None).is_ok()
            }));
        }
        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        // 10 credits fund exactly three 3-credit debits
        assert_eq!(successes, 3);
        assert_eq!(ledger.balance_of(&account), 1);
        assert_eq!(
            ledger.balance_of(&account),
            ledger.recompute_balance(&account)
        );
    }

    #[test]
    fn test_concurrent_duplicate_external_single_credit() {
        use std::sync::Arc;

        let ledger = Arc::new(LedgerStore::new(None));
        let account = Uuid::new_v4();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let ledger = ledger.clone();
            handles.push(std::thread::spawn(move || {
                ledger
                    .record(account, 625, TxKind::Purchase, Some("0xrace".to_string()))
                    .is_ok()
            }));
        }
        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(successes, 1);
        assert_eq!(ledger.balance_of(&account), 625);
    }
}
