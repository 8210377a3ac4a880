//! # Relayer Service
//!
//! Decides whether and how to submit trigger operations. Business
//! authorization (the relayer role) is enforced on the ledger; the service
//! only pre-checks condition state to fail fast before spending gas on a
//! submission the ledger would reject. The pre-check is an optimization:
//! the ledger re-validates everything at inclusion, and a pre-check that
//! passed can still lose to a concurrent submission.

use crate::error::RelayerError;
use crate::view::{ConditionView, TriggerOutcome};
use escrow_client::LedgerClient;
use escrow_ledger::{Address, ConditionId, EscrowCall, Hash, U256};
use std::sync::Arc;
use tracing::{debug, info};

/// Relayer orchestration over the shared ledger client.
pub struct RelayerService {
    client: Arc<LedgerClient>,
}

impl RelayerService {
    /// Wraps the process-wide client handle.
    #[must_use]
    pub fn new(client: Arc<LedgerClient>) -> Self {
        Self { client }
    }

    /// The relayer's signing identity.
    #[must_use]
    pub fn address(&self) -> Address {
        self.client.address()
    }

    /// Condition snapshot rendered for API consumers. `None` if unknown.
    pub async fn get_condition(
        &self,
        id: ConditionId,
    ) -> Result<Option<ConditionView>, RelayerError> {
        Ok(self.client.get_condition(id).await?.map(ConditionView::from))
    }

    /// Trigger eligibility.
    pub async fn can_trigger(&self, id: ConditionId) -> Result<bool, RelayerError> {
        Ok(self.client.can_trigger(id).await?)
    }

    /// Refund eligibility at current ledger time.
    pub async fn can_refund(&self, id: ConditionId) -> Result<bool, RelayerError> {
        Ok(self.client.can_refund(id).await?)
    }

    /// Number of conditions ever created.
    pub async fn condition_count(&self) -> Result<u64, RelayerError> {
        Ok(self.client.condition_count().await?)
    }

    /// Current balance of the relayer account.
    pub async fn relayer_balance(&self) -> Result<U256, RelayerError> {
        Ok(self.client.relayer_balance().await?)
    }

    /// Submits a trigger for the condition, releasing escrowed funds to
    /// the payee.
    ///
    /// Exactly one submission goes to the ledger per call. Callers must not
    /// blindly retry an ambiguous failure; a prior submission may already
    /// have been included.
    pub async fn trigger_condition(
        &self,
        id: ConditionId,
        proof_hash: Hash,
    ) -> Result<TriggerOutcome, RelayerError> {
        let condition = self
            .client
            .get_condition(id)
            .await?
            .ok_or(RelayerError::NotFound(id))?;
        if condition.executed {
            debug!(id, "pre-check: already executed");
            return Err(RelayerError::AlreadyExecuted(id));
        }
        if condition.refunded {
            debug!(id, "pre-check: already refunded");
            return Err(RelayerError::AlreadyRefunded(id));
        }

        let receipt = self
            .client
            .submit(EscrowCall::TriggerCondition { id, proof_hash })
            .await?;
        let outcome = TriggerOutcome::from_receipt(&receipt);
        info!(id, tx_hash = %outcome.tx_hash, status = outcome.status, "condition triggered");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use escrow_client::{ClientError, InProcessConnection, RejectionReason, Signer};
    use escrow_ledger::{
        keccak256, one_unit, GenesisAccount, GenesisConfig, Ledger, Transaction,
    };

    const DAY: u64 = 86_400;

    fn payer() -> Address {
        Address::new([0x0c; 20])
    }
    fn payee() -> Address {
        Address::new([0x0d; 20])
    }

    fn signer() -> Signer {
        Signer::from_secret([0x07; 32])
    }

    fn ledger() -> Arc<Ledger> {
        Arc::new(
            Ledger::new(&GenesisConfig {
                admin: Address::new([0x0a; 20]),
                relayer: signer().address(),
                accounts: vec![
                    GenesisAccount {
                        address: payer(),
                        balance: "100.0".into(),
                    },
                    GenesisAccount {
                        address: signer().address(),
                        balance: "10.0".into(),
                    },
                ],
                gas_price: 1_000_000_000,
            })
            .unwrap(),
        )
    }

    async fn service(ledger: &Arc<Ledger>) -> RelayerService {
        let connection = Arc::new(InProcessConnection::new(Arc::clone(ledger)));
        let client = LedgerClient::connect(connection, signer()).await.unwrap();
        RelayerService::new(Arc::new(client))
    }

    fn seed_condition(ledger: &Arc<Ledger>) -> ConditionId {
        let call = EscrowCall::CreateCondition {
            payee: payee(),
            deadline: ledger.now() + DAY,
            metadata_uri: "ipfs://QmTest123".into(),
        };
        ledger
            .submit(Transaction {
                from: payer(),
                nonce: ledger.pending_nonce(payer()),
                gas_limit: call.required_gas(),
                value: one_unit(),
                call,
            })
            .unwrap();
        ledger.condition_count() - 1
    }

    #[tokio::test]
    async fn test_trigger_reports_inclusion_metadata() {
        let ledger = ledger();
        let relayer = service(&ledger).await;
        let id = seed_condition(&ledger);

        let outcome = relayer
            .trigger_condition(id, keccak256(b"proof123"))
            .await
            .unwrap();
        assert_eq!(outcome.status, "success");
        assert_eq!(outcome.block_number, 2);
        assert!(outcome.gas_used > 0);
        assert_eq!(ledger.balance_of(payee()), one_unit());
    }

    #[tokio::test]
    async fn test_precheck_fails_fast_without_submission() {
        let ledger = ledger();
        let relayer = service(&ledger).await;
        let id = seed_condition(&ledger);

        relayer
            .trigger_condition(id, keccak256(b"proof"))
            .await
            .unwrap();
        let blocks_after_trigger = ledger.block_number();

        let err = relayer
            .trigger_condition(id, keccak256(b"proof"))
            .await
            .unwrap_err();
        assert_eq!(err, RelayerError::AlreadyExecuted(id));
        // No gas spent: nothing was submitted
        assert_eq!(ledger.block_number(), blocks_after_trigger);
    }

    #[tokio::test]
    async fn test_precheck_detects_refunded() {
        let ledger = ledger();
        let relayer = service(&ledger).await;
        let id = seed_condition(&ledger);

        ledger.advance_time(DAY + 1);
        let call = escrow_ledger::EscrowCall::RefundCondition { id };
        ledger
            .submit(Transaction {
                from: payer(),
                nonce: ledger.pending_nonce(payer()),
                gas_limit: call.required_gas(),
                value: U256::zero(),
                call,
            })
            .unwrap();

        let err = relayer
            .trigger_condition(id, keccak256(b"late"))
            .await
            .unwrap_err();
        assert_eq!(err, RelayerError::AlreadyRefunded(id));
    }

    #[tokio::test]
    async fn test_unknown_condition_is_not_found() {
        let ledger = ledger();
        let relayer = service(&ledger).await;
        assert_eq!(
            relayer
                .trigger_condition(999, keccak256(b"p"))
                .await
                .unwrap_err(),
            RelayerError::NotFound(999)
        );
        assert!(relayer.get_condition(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_losing_a_race_is_nonfatal() {
        let ledger = ledger();
        let relayer = service(&ledger).await;
        let id = seed_condition(&ledger);

        let (a, b) = tokio::join!(
            relayer.trigger_condition(id, keccak256(b"a")),
            relayer.trigger_condition(id, keccak256(b"b")),
        );

        // Exactly one wins; the loser gets a terminal-state error either
        // from the pre-check or from the ledger itself
        let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);
        let err = if a.is_err() { a.unwrap_err() } else { b.unwrap_err() };
        assert!(matches!(
            err,
            RelayerError::AlreadyExecuted(_)
                | RelayerError::Client(ClientError::Rejected(RejectionReason::AlreadyExecuted))
        ));
        assert_eq!(ledger.balance_of(payee()), one_unit());
    }

    #[tokio::test]
    async fn test_views_and_counts() {
        let ledger = ledger();
        let relayer = service(&ledger).await;
        let id = seed_condition(&ledger);

        let view = relayer.get_condition(id).await.unwrap().unwrap();
        assert_eq!(view.amount, "1.0");
        assert_eq!(view.payee, payee());
        assert!(relayer.can_trigger(id).await.unwrap());
        assert!(!relayer.can_refund(id).await.unwrap());
        assert_eq!(relayer.condition_count().await.unwrap(), 1);
        assert!(relayer.relayer_balance().await.unwrap() > U256::zero());
    }
}
