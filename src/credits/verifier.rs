//! On-chain purchase verification and ledger crediting.
//!
//! # Responsibilities
//! - Look up the submitted transaction on the configured chain
//! - Enforce contract address and confirmation depth
//! - Decode the purchase event and match the payer to the caller
//! - Credit the ledger exactly once per transaction hash
//!
//! The whole operation is idempotent under retries: a duplicate submission
//! surfaces the ledger's `DuplicateExternalTx` outcome, which is converted
//! into a normal success carrying the previously credited amount.

use std::sync::Arc;

use alloy::primitives::{Address, TxHash};
use alloy::sol;
use thiserror::Error;
use uuid::Uuid;

use crate::blockchain::client::ChainClient;
use crate::credits::packages::PackageTable;
use crate::ledger::{LedgerError, LedgerStore, TxKind};
use crate::observability::metrics;

sol! {
    /// Emitted by the purchase contract when a reader buys credits.
    #[derive(Debug)]
    event CreditsPurchased(address indexed buyer, uint256 indexed purchaseId, uint8 packageId, uint256 amount);
}

/// Purchase verification failure modes.
///
/// Only `TxNotFound` is retryable; everything else is terminal for that
/// submission.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// Not mined yet, not deep enough, or the RPC was unreachable. The
    /// chain is eventually consistent: ask again shortly.
    #[error("Transaction not found or not yet confirmed; retry later")]
    TxNotFound,

    /// Submission names a different chain than the gate is watching.
    #[error("Wrong chain: expected {expected}, got {actual}")]
    WrongChain { expected: u64, actual: u64 },

    /// Transaction does not target the purchase contract.
    #[error("Transaction does not target the purchase contract")]
    WrongContract,

    /// The paying address is not the authenticated account's wallet.
    #[error("Paying address does not match the authenticated account")]
    AddressMismatch,

    /// Receipt carries no decodable purchase event.
    #[error("Malformed purchase event: {0}")]
    MalformedEvent(String),
}

/// A successful (possibly repeated) crediting.
#[derive(Debug, Clone)]
pub struct CreditResult {
    /// Credits this transaction is worth.
    pub credits_added: u64,
    /// Balance after crediting.
    pub new_balance: i64,
    /// True when the hash had been credited before; no balance change.
    pub already_credited: bool,
}

/// Reconciles claimed on-chain purchases into the ledger.
pub struct PurchaseVerifier {
    client: ChainClient,
    ledger: Arc<LedgerStore>,
    contract: Address,
    packages: PackageTable,
}

impl PurchaseVerifier {
    pub fn new(
        client: ChainClient,
        ledger: Arc<LedgerStore>,
        contract: Address,
        packages: PackageTable,
    ) -> Self {
        Self {
            client,
            ledger,
            contract,
            packages,
        }
    }

    /// Verify a purchase and credit the account's ledger.
    ///
    /// `wallet` is the authenticated session's address; the event's payer
    /// must match it. No account lock is held across the RPC calls - the
    /// ledger serializes only the final `record`.
    pub async fn verify(
        &self,
        tx_hash: TxHash,
        chain_id: u64,
        account_id: Uuid,
        wallet: Address,
    ) -> Result<CreditResult, VerifyError> {
        let expected_chain = self.client.config().chain_id;
        if chain_id != expected_chain {
            metrics::record_purchase("wrong_chain");
            return Err(VerifyError::WrongChain {
                expected: expected_chain,
                actual: chain_id,
            });
        }

        let receipt = match self.client.get_transaction_receipt(tx_hash).await {
            Ok(Some(receipt)) => receipt,
            Ok(None) => {
                metrics::record_purchase("not_found");
                return Err(VerifyError::TxNotFound);
            }
            Err(e) => {
                // RPC trouble is indistinguishable from "not mined yet" for
                // the caller: retryable either way
                tracing::warn!(tx_hash = %tx_hash, error = %e, "Receipt lookup failed");
                metrics::record_purchase("rpc_error");
                return Err(VerifyError::TxNotFound);
            }
        };

        if !receipt.status() {
            metrics::record_purchase("reverted");
            return Err(VerifyError::MalformedEvent(
                "transaction reverted, no purchase event".to_string(),
            ));
        }

        if receipt.to != Some(self.contract) {
            metrics::record_purchase("wrong_contract");
            return Err(VerifyError::WrongContract);
        }

        let tx_block = receipt.block_number.ok_or(VerifyError::TxNotFound)?;
        let current_block = self
            .client
            .get_block_number()
            .await
            .map_err(|_| VerifyError::TxNotFound)?;
        let confirmations = current_block.saturating_sub(tx_block) as u32;
        if confirmations < self.client.confirmation_blocks() {
            tracing::debug!(
                tx_hash = %tx_hash,
                confirmations = confirmations,
                required = self.client.confirmation_blocks(),
                "Purchase not yet deep enough"
            );
            metrics::record_purchase("confirming");
            return Err(VerifyError::TxNotFound);
        }

        let purchase = receipt
            .inner
            .logs()
            .iter()
            .filter(|log| log.address() == self.contract)
            .find_map(|log| log.log_decode::<CreditsPurchased>().ok())
            .map(|decoded| decoded.inner.data)
            .ok_or_else(|| {
                metrics::record_purchase("malformed");
                VerifyError::MalformedEvent("no purchase event in receipt".to_string())
            })?;

        if purchase.buyer != wallet {
            metrics::record_purchase("address_mismatch");
            return Err(VerifyError::AddressMismatch);
        }

        let credits = self.credits_for(&purchase)?;

        match self.ledger.record(
            account_id,
            credits as i64,
            TxKind::Purchase,
            Some(tx_hash.to_string()),
        ) {
            Ok(_) => {
                tracing::info!(
                    account_id = %account_id,
                    tx_hash = %tx_hash,
                    credits = credits,
                    purchase_id = %purchase.purchaseId,
                    "Purchase credited"
                );
                metrics::record_purchase("credited");
                metrics::record_credits_granted(credits);
                Ok(CreditResult {
                    credits_added: credits,
                    new_balance: self.ledger.balance_of(&account_id),
                    already_credited: false,
                })
            }
            Err(LedgerError::DuplicateExternalTx { amount }) => {
                // Resubmission of an already-credited proof: idempotent
                // success, balance untouched
                tracing::info!(
                    account_id = %account_id,
                    tx_hash = %tx_hash,
                    "Duplicate purchase submission"
                );
                metrics::record_purchase("duplicate");
                Ok(CreditResult {
                    credits_added: amount.unsigned_abs(),
                    new_balance: self.ledger.balance_of(&account_id),
                    already_credited: true,
                })
            }
            Err(e) => {
                // Positive credits cannot hit the debit or sign checks
                tracing::error!(
                    account_id = %account_id,
                    tx_hash = %tx_hash,
                    error = %e,
                    "Ledger rejected purchase credit"
                );
                metrics::record_purchase("error");
                Err(VerifyError::MalformedEvent(
                    "purchase amount rejected by ledger".to_string(),
                ))
            }
        }
    }

    /// Resolve the credit amount of a decoded purchase event.
    fn credits_for(&self, purchase: &CreditsPurchased) -> Result<u64, VerifyError> {
        let credits = if purchase.packageId == 0 {
            u64::try_from(purchase.amount).map_err(|_| {
                VerifyError::MalformedEvent("raw credit amount overflows".to_string())
            })?
        } else {
            self.packages
                .credits_for(purchase.packageId)
                .ok_or_else(|| {
                    VerifyError::MalformedEvent(format!(
                        "unknown package id {}",
                        purchase.packageId
                    ))
                })?
        };
        if credits == 0 {
            return Err(VerifyError::MalformedEvent(
                "zero-credit purchase".to_string(),
            ));
        }
        Ok(credits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::types::BlockchainConfig;
    use crate::config::schema::PackageConfig;
    use alloy::primitives::{Log, LogData, U256};
    use alloy::sol_types::SolEvent;

    fn test_packages() -> PackageTable {
        PackageTable::from_config(&[
            PackageConfig { id: 1, credits: 100 },
            PackageConfig { id: 3, credits: 625 },
        ])
    }

    async fn test_verifier() -> (PurchaseVerifier, Arc<LedgerStore>) {
        let config = BlockchainConfig {
            rpc_url: "http://localhost:8545".to_string(),
            failover_urls: Vec::new(),
            chain_id: 31337,
            rpc_timeout_secs: 1,
            confirmation_blocks: 1,
        };
        let client = ChainClient::new(config).await.unwrap();
        let ledger = Arc::new(LedgerStore::new(None));
        let verifier = PurchaseVerifier::new(
            client,
            ledger.clone(),
            Address::repeat_byte(0xaa),
            test_packages(),
        );
        (verifier, ledger)
    }

    #[tokio::test]
    async fn test_wrong_chain_rejected_before_rpc() {
        let (verifier, _) = test_verifier().await;
        let result = verifier
            .verify(
                TxHash::ZERO,
                1,
                Uuid::new_v4(),
                Address::repeat_byte(0xbb),
            )
            .await;
        match result {
            Err(VerifyError::WrongChain { expected, actual }) => {
                assert_eq!(expected, 31337);
                assert_eq!(actual, 1);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_credits_for_package_and_raw() {
        let (verifier, _) = test_verifier().await;

        let package_purchase = CreditsPurchased {
            buyer: Address::repeat_byte(0xbb),
            purchaseId: U256::from(1),
            packageId: 3,
            amount: U256::ZERO,
        };
        assert_eq!(verifier.credits_for(&package_purchase).unwrap(), 625);

        let raw_purchase = CreditsPurchased {
            buyer: Address::repeat_byte(0xbb),
            purchaseId: U256::from(2),
            packageId: 0,
            amount: U256::from(42u64),
        };
        assert_eq!(verifier.credits_for(&raw_purchase).unwrap(), 42);

        let unknown_package = CreditsPurchased {
            buyer: Address::repeat_byte(0xbb),
            purchaseId: U256::from(3),
            packageId: 9,
            amount: U256::ZERO,
        };
        assert!(matches!(
            verifier.credits_for(&unknown_package),
            Err(VerifyError::MalformedEvent(_))
        ));

        let zero_raw = CreditsPurchased {
            buyer: Address::repeat_byte(0xbb),
            purchaseId: U256::from(4),
            packageId: 0,
            amount: U256::ZERO,
        };
        assert!(matches!(
            verifier.credits_for(&zero_raw),
            Err(VerifyError::MalformedEvent(_))
        ));
    }

    #[test]
    fn test_purchase_event_roundtrip() {
        let event = CreditsPurchased {
            buyer: Address::repeat_byte(0xbb),
            purchaseId: U256::from(7),
            packageId: 3,
            amount: U256::from(625u64),
        };

        let data: LogData = event.encode_log_data();
        let rpc_log = alloy::rpc::types::Log {
            inner: Log {
                address: Address::repeat_byte(0xaa),
                data,
            },
            block_hash: None,
            block_number: None,
            block_timestamp: None,
            transaction_hash: None,
            transaction_index: None,
            log_index: None,
            removed: false,
        };

        let decoded = rpc_log.log_decode::<CreditsPurchased>().unwrap();
        let purchase = decoded.inner.data;
        assert_eq!(purchase.buyer, Address::repeat_byte(0xbb));
        assert_eq!(purchase.packageId, 3);
        assert_eq!(purchase.amount, U256::from(625u64));
    }
}
