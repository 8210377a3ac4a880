//! # Ledger Client
//!
//! One authenticated client per process. `connect` verifies the connection
//! once at construction; a process that cannot reach the ledger must not
//! serve traffic, so that failure is surfaced to the caller instead of
//! retried silently.
//!
//! Submission parameterization:
//! - gas limit = estimate + 20% margin, absorbing state drift between
//!   estimation and inclusion
//! - nonce re-read (pending-inclusive) immediately before each submission
//!
//! The nonce re-read is a best-effort mitigation against collisions from
//! concurrent submissions, not a lock. The ledger's atomic transition is
//! the actual correctness boundary; losing a race surfaces as a normal
//! terminal-state rejection.

use crate::connection::LedgerConnection;
use crate::error::{ClientError, RejectionReason};
use crate::signer::Signer;
use escrow_ledger::{
    format_units, Address, Condition, ConditionId, EscrowCall, ExecutionOutcome, Receipt,
    Timestamp, Transaction, U256,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Gas safety margin applied over the raw estimate: +20%.
const GAS_MARGIN_NUM: u64 = 120;
const GAS_MARGIN_DEN: u64 = 100;

/// Authenticated handle to the ledger, shared across requests.
pub struct LedgerClient {
    connection: Arc<dyn LedgerConnection>,
    signer: Signer,
}

impl LedgerClient {
    /// Establishes the client, verifying connectivity with one balance
    /// read. An error here is fatal at process startup.
    pub async fn connect(
        connection: Arc<dyn LedgerConnection>,
        signer: Signer,
    ) -> Result<Self, ClientError> {
        let balance = connection.balance_of(signer.address()).await?;
        info!(
            relayer = %signer.address(),
            balance = %format_units(balance),
            "ledger connection established"
        );
        Ok(Self { connection, signer })
    }

    /// The signing identity submissions are sent as.
    #[must_use]
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    // -------------------------------------------------------------------------
    // Reads (no confirmation wait)
    // -------------------------------------------------------------------------

    /// Condition snapshot; `None` for an unknown id.
    pub async fn get_condition(&self, id: ConditionId) -> Result<Option<Condition>, ClientError> {
        self.connection.get_condition(id).await
    }

    /// Trigger eligibility.
    pub async fn can_trigger(&self, id: ConditionId) -> Result<bool, ClientError> {
        self.connection.can_trigger(id).await
    }

    /// Refund eligibility at current ledger time.
    pub async fn can_refund(&self, id: ConditionId) -> Result<bool, ClientError> {
        self.connection.can_refund(id).await
    }

    /// Number of conditions ever created.
    pub async fn condition_count(&self) -> Result<u64, ClientError> {
        self.connection.condition_count().await
    }

    /// Balance of the signing account.
    pub async fn relayer_balance(&self) -> Result<U256, ClientError> {
        self.connection.balance_of(self.signer.address()).await
    }

    /// Current ledger time.
    pub async fn current_time(&self) -> Result<Timestamp, ClientError> {
        self.connection.current_time().await
    }

    // -------------------------------------------------------------------------
    // Submission
    // -------------------------------------------------------------------------

    /// Submits a call with no attached value.
    pub async fn submit(&self, call: EscrowCall) -> Result<Receipt, ClientError> {
        self.submit_with_value(call, U256::zero()).await
    }

    /// Estimates, parameterizes, submits, and awaits inclusion.
    ///
    /// Exactly one submission is sent per invocation. A revert at either
    /// the estimation stage or inclusion time surfaces as
    /// [`ClientError::Rejected`] with the structured reason.
    pub async fn submit_with_value(
        &self,
        call: EscrowCall,
        value: U256,
    ) -> Result<Receipt, ClientError> {
        let from = self.signer.address();

        let estimate = self.connection.estimate_gas(from, value, &call).await?;
        let gas_limit = estimate * GAS_MARGIN_NUM / GAS_MARGIN_DEN;

        // Re-read immediately before submission so concurrent in-flight
        // submissions from this account are counted.
        let nonce = self.connection.pending_nonce(from).await?;

        debug!(%from, nonce, gas_limit, "submitting transaction");
        let receipt = self
            .connection
            .submit_transaction(Transaction {
                from,
                nonce,
                gas_limit,
                value,
                call,
            })
            .await?;

        match receipt.outcome {
            ExecutionOutcome::Success => {
                info!(
                    tx_hash = %receipt.tx_hash,
                    block_number = receipt.block_number,
                    gas_used = receipt.gas_used,
                    "submission confirmed"
                );
                Ok(receipt)
            }
            ExecutionOutcome::Reverted(reason) => Err(ClientError::Rejected(reason.into())),
            ExecutionOutcome::OutOfGas => Err(ClientError::Rejected(RejectionReason::Other(
                "out of gas".into(),
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::InProcessConnection;
    use async_trait::async_trait;
    use escrow_ledger::{keccak256, GenesisAccount, GenesisConfig, Ledger};

    const DAY: u64 = 86_400;

    fn payer() -> Address {
        Address::new([0x0c; 20])
    }
    fn payee() -> Address {
        Address::new([0x0d; 20])
    }

    fn relayer_signer() -> Signer {
        Signer::from_secret([0x07; 32])
    }

    fn ledger() -> Arc<Ledger> {
        Arc::new(
            Ledger::new(&GenesisConfig {
                admin: Address::new([0x0a; 20]),
                relayer: relayer_signer().address(),
                accounts: vec![
                    GenesisAccount {
                        address: payer(),
                        balance: "100.0".into(),
                    },
                    GenesisAccount {
                        address: relayer_signer().address(),
                        balance: "10.0".into(),
                    },
                ],
                gas_price: 1_000_000_000,
            })
            .unwrap(),
        )
    }

    async fn connected(ledger: &Arc<Ledger>) -> LedgerClient {
        let connection = Arc::new(InProcessConnection::new(Arc::clone(ledger)));
        LedgerClient::connect(connection, relayer_signer())
            .await
            .unwrap()
    }

    fn seed_condition(ledger: &Arc<Ledger>) -> ConditionId {
        let call = EscrowCall::CreateCondition {
            payee: payee(),
            deadline: ledger.now() + DAY,
            metadata_uri: "ipfs://QmTest123".into(),
        };
        let receipt = ledger
            .submit(Transaction {
                from: payer(),
                nonce: ledger.pending_nonce(payer()),
                gas_limit: call.required_gas(),
                value: escrow_ledger::one_unit(),
                call,
            })
            .unwrap();
        assert!(receipt.outcome.is_success());
        ledger.condition_count() - 1
    }

    struct DownConnection;

    #[async_trait]
    impl LedgerConnection for DownConnection {
        async fn get_condition(&self, _: ConditionId) -> Result<Option<Condition>, ClientError> {
            Err(ClientError::Connectivity("connection refused".into()))
        }
        async fn can_trigger(&self, _: ConditionId) -> Result<bool, ClientError> {
            Err(ClientError::Connectivity("connection refused".into()))
        }
        async fn can_refund(&self, _: ConditionId) -> Result<bool, ClientError> {
            Err(ClientError::Connectivity("connection refused".into()))
        }
        async fn condition_count(&self) -> Result<u64, ClientError> {
            Err(ClientError::Connectivity("connection refused".into()))
        }
        async fn balance_of(&self, _: Address) -> Result<U256, ClientError> {
            Err(ClientError::Connectivity("connection refused".into()))
        }
        async fn pending_nonce(&self, _: Address) -> Result<u64, ClientError> {
            Err(ClientError::Connectivity("connection refused".into()))
        }
        async fn estimate_gas(
            &self,
            _: Address,
            _: U256,
            _: &EscrowCall,
        ) -> Result<u64, ClientError> {
            Err(ClientError::Connectivity("connection refused".into()))
        }
        async fn submit_transaction(&self, _: Transaction) -> Result<Receipt, ClientError> {
            Err(ClientError::Connectivity("connection refused".into()))
        }
        async fn current_time(&self) -> Result<Timestamp, ClientError> {
            Err(ClientError::Connectivity("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn test_connect_fails_fast_when_unreachable() {
        let result = LedgerClient::connect(Arc::new(DownConnection), relayer_signer()).await;
        assert!(matches!(result, Err(ClientError::Connectivity(_))));
    }

    #[tokio::test]
    async fn test_trigger_submission_pays_payee() {
        let ledger = ledger();
        let client = connected(&ledger).await;
        let id = seed_condition(&ledger);

        let receipt = client
            .submit(EscrowCall::TriggerCondition {
                id,
                proof_hash: keccak256(b"proof123"),
            })
            .await
            .unwrap();

        assert!(receipt.outcome.is_success());
        assert_eq!(ledger.balance_of(payee()), escrow_ledger::one_unit());
        assert!(client.get_condition(id).await.unwrap().unwrap().executed);
    }

    #[tokio::test]
    async fn test_gas_margin_applied_over_estimate() {
        let ledger = ledger();
        let client = connected(&ledger).await;
        let id = seed_condition(&ledger);

        let call = EscrowCall::TriggerCondition {
            id,
            proof_hash: keccak256(b"p"),
        };
        let estimate = ledger
            .estimate_gas(client.address(), U256::zero(), &call)
            .unwrap();
        let receipt = client.submit(call).await.unwrap();

        // The margin buys headroom; actual consumption equals the estimate
        assert_eq!(receipt.gas_used, estimate);
    }

    #[tokio::test]
    async fn test_losing_the_race_is_a_typed_rejection() {
        let ledger = ledger();
        let client = connected(&ledger).await;
        let id = seed_condition(&ledger);

        let first = client
            .submit(EscrowCall::TriggerCondition {
                id,
                proof_hash: keccak256(b"a"),
            })
            .await;
        let second = client
            .submit(EscrowCall::TriggerCondition {
                id,
                proof_hash: keccak256(b"b"),
            })
            .await;

        assert!(first.is_ok());
        assert_eq!(
            second.unwrap_err(),
            ClientError::Rejected(RejectionReason::AlreadyExecuted)
        );
        // Exactly one amount credited, never two
        assert_eq!(ledger.balance_of(payee()), escrow_ledger::one_unit());
    }

    #[tokio::test]
    async fn test_concurrent_triggers_exactly_one_wins() {
        let ledger = ledger();
        let client = connected(&ledger).await;
        let id = seed_condition(&ledger);

        let (a, b) = tokio::join!(
            client.submit(EscrowCall::TriggerCondition {
                id,
                proof_hash: keccak256(b"a"),
            }),
            client.submit(EscrowCall::TriggerCondition {
                id,
                proof_hash: keccak256(b"b"),
            }),
        );

        let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);
        assert_eq!(ledger.balance_of(payee()), escrow_ledger::one_unit());
    }

    #[tokio::test]
    async fn test_nonce_tracks_pending_submissions() {
        let ledger = ledger();
        let client = connected(&ledger).await;
        let first = seed_condition(&ledger);
        let second = seed_condition(&ledger);

        client
            .submit(EscrowCall::TriggerCondition {
                id: first,
                proof_hash: keccak256(b"1"),
            })
            .await
            .unwrap();
        // The re-read picks up the advanced nonce; no collision
        client
            .submit(EscrowCall::TriggerCondition {
                id: second,
                proof_hash: keccak256(b"2"),
            })
            .await
            .unwrap();

        assert_eq!(ledger.pending_nonce(client.address()), 2);
    }

    #[tokio::test]
    async fn test_reads_do_not_mutate() {
        let ledger = ledger();
        let client = connected(&ledger).await;
        let id = seed_condition(&ledger);

        assert!(client.can_trigger(id).await.unwrap());
        assert!(!client.can_refund(id).await.unwrap());
        assert_eq!(client.condition_count().await.unwrap(), 1);
        assert!(client.get_condition(999).await.unwrap().is_none());
        assert!(!client.can_trigger(999).await.unwrap());
        assert_eq!(ledger.block_number(), 1); // only the seed submission
    }
}
