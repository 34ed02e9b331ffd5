//! The unlock coordinator: the only writer allowed to pair a ledger debit
//! with an entitlement grant.
//!
//! Per (account, chapter) request the flow is:
//!
//! ```text
//! CHECK_ENTITLEMENT → [already unlocked: DONE, ledger untouched]
//!     → DEBIT (atomic check-and-write in the ledger)
//!         → [insufficient: FAIL, nothing written]
//!     → GRANT
//!         → [raced, already granted: REFUND the committed debit, DONE]
//!     → DONE
//! ```
//!
//! Once the debit commits the coordinator always drives the request to a
//! reconciled terminal state; the refund is the one case where the ledger
//! corrects itself.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::entitlements::store::{EntitlementStore, GrantOutcome};
use crate::ledger::{LedgerError, LedgerStore, TxKind};
use crate::observability::metrics;

/// Unlock rejection reasons.
#[derive(Debug, Error)]
pub enum UnlockError {
    /// Balance cannot cover the chapter cost. Nothing was written.
    #[error("Insufficient credits: required {required}, available {available}")]
    InsufficientCredits { required: u64, available: u64 },
}

/// A completed unlock.
#[derive(Debug, Clone)]
pub struct UnlockOutcome {
    /// The grant backing the unlock (existing or fresh).
    pub entitlement: crate::entitlements::store::Entitlement,
    /// False when the chapter was already unlocked (no charge).
    pub newly_unlocked: bool,
    /// Balance after the operation.
    pub new_balance: i64,
}

/// Coordinates debits and grants for chapter unlocks.
pub struct UnlockCoordinator {
    ledger: Arc<LedgerStore>,
    entitlements: Arc<EntitlementStore>,
}

impl UnlockCoordinator {
    pub fn new(ledger: Arc<LedgerStore>, entitlements: Arc<EntitlementStore>) -> Self {
        Self {
            ledger,
            entitlements,
        }
    }

    /// Unlock a chapter for an account at the given cost.
    ///
    /// Idempotent: re-unlocking an owned chapter succeeds without touching
    /// the ledger.
    pub fn unlock(
        &self,
        account_id: Uuid,
        chapter_id: u64,
        cost: u64,
    ) -> Result<UnlockOutcome, UnlockError> {
        // CHECK_ENTITLEMENT: free re-unlock, no double charge
        if let Some(existing) = self.entitlements.get(&account_id, chapter_id) {
            metrics::record_unlock("already_unlocked");
            return Ok(UnlockOutcome {
                entitlement: existing,
                newly_unlocked: false,
                new_balance: self.ledger.balance_of(&account_id),
            });
        }

        // Free chapters grant without a ledger row
        if cost == 0 {
            let outcome = self.entitlements.grant(account_id, chapter_id, 0);
            let newly_unlocked = matches!(outcome, GrantOutcome::Created(_));
            metrics::record_unlock("free");
            return Ok(UnlockOutcome {
                entitlement: outcome.entitlement().clone(),
                newly_unlocked,
                new_balance: self.ledger.balance_of(&account_id),
            });
        }

        // DEBIT: single atomic check-and-write against the balance
        if let Err(e) = self
            .ledger
            .record(account_id, -(cost as i64), TxKind::Spend, None)
        {
            return match e {
                LedgerError::InsufficientCredits {
                    required,
                    available,
                } => {
                    metrics::record_unlock("insufficient_credits");
                    Err(UnlockError::InsufficientCredits {
                        required,
                        available,
                    })
                }
                // cost > 0 keeps SPEND within its sign convention and spend
                // rows carry no external id, so no other rejection can occur
                other => {
                    tracing::error!(
                        account_id = %account_id,
                        chapter_id = chapter_id,
                        error = %other,
                        "Unexpected ledger rejection during unlock"
                    );
                    metrics::record_unlock("error");
                    Err(UnlockError::InsufficientCredits {
                        required: cost,
                        available: self.ledger.balance_of(&account_id).max(0) as u64,
                    })
                }
            };
        }

        // GRANT: at most one row; a raced duplicate refunds the debit
        match self.entitlements.grant(account_id, chapter_id, cost) {
            GrantOutcome::Created(entitlement) => {
                metrics::record_unlock("unlocked");
                Ok(UnlockOutcome {
                    entitlement,
                    newly_unlocked: true,
                    new_balance: self.ledger.balance_of(&account_id),
                })
            }
            GrantOutcome::AlreadyGranted(entitlement) => {
                // The debit already committed; compensate and report success
                if let Err(e) =
                    self.ledger
                        .record(account_id, cost as i64, TxKind::Refund, None)
                {
                    tracing::error!(
                        account_id = %account_id,
                        chapter_id = chapter_id,
                        error = %e,
                        "Failed to refund raced unlock debit"
                    );
                }
                tracing::warn!(
                    account_id = %account_id,
                    chapter_id = chapter_id,
                    "Concurrent unlock raced past the entitlement check; debit refunded"
                );
                metrics::record_unlock("raced_refunded");
                Ok(UnlockOutcome {
                    entitlement,
                    newly_unlocked: false,
                    new_balance: self.ledger.balance_of(&account_id),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::TxStatus;

    fn coordinator() -> (UnlockCoordinator, Arc<LedgerStore>, Arc<EntitlementStore>) {
        let ledger = Arc::new(LedgerStore::new(None));
        let entitlements = Arc::new(EntitlementStore::new(None));
        (
            UnlockCoordinator::new(ledger.clone(), entitlements.clone()),
            ledger,
            entitlements,
        )
    }

    #[test]
    fn test_unlock_exact_balance() {
        let (coordinator, ledger, entitlements) = coordinator();
        let account = Uuid::new_v4();
        ledger
            .record(account, 5, TxKind::AdminAdjustment, None)
            .unwrap();

        let outcome = coordinator.unlock(account, 12, 5).unwrap();
        assert!(outcome.newly_unlocked);
        assert_eq!(outcome.new_balance, 0);
        assert!(entitlements.has(&account, 12));
    }

    #[test]
    fn test_reunlock_is_free() {
        let (coordinator, ledger, _) = coordinator();
        let account = Uuid::new_v4();
        ledger
            .record(account, 5, TxKind::AdminAdjustment, None)
            .unwrap();

        coordinator.unlock(account, 12, 5).unwrap();
        let again = coordinator.unlock(account, 12, 5).unwrap();
        assert!(!again.newly_unlocked);
        assert_eq!(again.new_balance, 0);
        // No second debit was written
        assert_eq!(ledger.transactions_of(&account).len(), 2);
    }

    #[test]
    fn test_insufficient_credits_writes_nothing() {
        let (coordinator, ledger, entitlements) = coordinator();
        let account = Uuid::new_v4();
        ledger
            .record(account, 3, TxKind::AdminAdjustment, None)
            .unwrap();

        let err = coordinator.unlock(account, 12, 5).unwrap_err();
        match err {
            UnlockError::InsufficientCredits {
                required,
                available,
            } => {
                assert_eq!(required, 5);
                assert_eq!(available, 3);
            }
        }
        assert_eq!(ledger.balance_of(&account), 3);
        assert!(!entitlements.has(&account, 12));
        assert_eq!(ledger.transactions_of(&account).len(), 1);
    }

    #[test]
    fn test_free_chapter_no_ledger_row() {
        let (coordinator, ledger, entitlements) = coordinator();
        let account = Uuid::new_v4();

        let outcome = coordinator.unlock(account, 1, 0).unwrap();
        assert!(outcome.newly_unlocked);
        assert!(entitlements.has(&account, 1));
        assert!(ledger.transactions_of(&account).is_empty());
    }

    #[test]
    fn test_concurrent_unlocks_one_net_debit() {
        let (coordinator, ledger, entitlements) = coordinator();
        let coordinator = Arc::new(coordinator);
        let account = Uuid::new_v4();
        // Balance exactly equal to cost: a double debit would need 10
        ledger
            .record(account, 5, TxKind::AdminAdjustment, None)
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let coordinator = coordinator.clone();
            handles.push(std::thread::spawn(move || {
                coordinator.unlock(account, 12, 5)
            }));
        }
        for handle in handles {
            // Losers either resolve through the already-granted path or
            // observe the debit/refund window as insufficient credits;
            // both leave no trace of their own
            let _ = handle.join().unwrap();
        }

        // Exactly one entitlement, exactly one net debit
        assert!(entitlements.has(&account, 12));
        assert_eq!(entitlements.count(), 1);
        assert_eq!(ledger.balance_of(&account), 0);
        assert_eq!(
            ledger.balance_of(&account),
            ledger.recompute_balance(&account)
        );

        let rows = ledger.transactions_of(&account);
        let spends = rows.iter().filter(|t| t.kind == TxKind::Spend).count();
        let refunds = rows.iter().filter(|t| t.kind == TxKind::Refund).count();
        assert_eq!(spends, refunds + 1, "exactly one unrefunded debit");
        assert!(rows
            .iter()
            .all(|t| t.status == TxStatus::Confirmed));
    }
}
