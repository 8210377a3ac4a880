//! # Connection Port
//!
//! The seam between the client adapter and whatever actually holds ledger
//! state. The adapter owns exactly one connection per process, constructed
//! at startup and injected everywhere by reference; nothing here is a lazy
//! global.
//!
//! [`InProcessConnection`] adapts the in-process [`Ledger`]. A remote
//! transport implements the same trait without touching any caller.

use crate::error::ClientError;
use async_trait::async_trait;
use escrow_ledger::{
    Address, Condition, ConditionId, ContractError, EscrowCall, Ledger, Receipt, Timestamp,
    Transaction, U256,
};
use std::sync::Arc;

/// Read and submission operations against the authoritative ledger.
///
/// Reads never block on confirmation. [`submit_transaction`] blocks until
/// the submission is included and returns its receipt; latency is unbounded
/// and bounded only by the underlying ledger.
///
/// [`submit_transaction`]: LedgerConnection::submit_transaction
#[async_trait]
pub trait LedgerConnection: Send + Sync {
    /// Fetches a condition snapshot. `None` if the id is unknown.
    async fn get_condition(&self, id: ConditionId) -> Result<Option<Condition>, ClientError>;

    /// Trigger eligibility. An unknown id is trivially not triggerable.
    async fn can_trigger(&self, id: ConditionId) -> Result<bool, ClientError>;

    /// Refund eligibility at current ledger time. Unknown id yields false.
    async fn can_refund(&self, id: ConditionId) -> Result<bool, ClientError>;

    /// Number of conditions ever created.
    async fn condition_count(&self) -> Result<u64, ClientError>;

    /// Current balance of an account.
    async fn balance_of(&self, account: Address) -> Result<U256, ClientError>;

    /// Next valid nonce for the account, counting in-flight submissions.
    async fn pending_nonce(&self, account: Address) -> Result<u64, ClientError>;

    /// Dry-runs a call and returns the gas it would consume. A call that
    /// would revert fails here with the rejection reason instead.
    async fn estimate_gas(
        &self,
        from: Address,
        value: U256,
        call: &EscrowCall,
    ) -> Result<u64, ClientError>;

    /// Submits and awaits inclusion. A ledger-level rejection (bad nonce,
    /// unfunded sender) surfaces as [`ClientError::Rejected`]; the caller
    /// inspects the receipt outcome for execution-level reverts.
    async fn submit_transaction(&self, tx: Transaction) -> Result<Receipt, ClientError>;

    /// Current ledger time in UNIX seconds.
    async fn current_time(&self) -> Result<Timestamp, ClientError>;
}

/// Connection backed by the in-process [`Ledger`].
pub struct InProcessConnection {
    ledger: Arc<Ledger>,
}

impl InProcessConnection {
    /// Wraps a shared ledger handle.
    #[must_use]
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }

    /// The underlying ledger handle (test fixtures use this to advance time).
    #[must_use]
    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }
}

#[async_trait]
impl LedgerConnection for InProcessConnection {
    async fn get_condition(&self, id: ConditionId) -> Result<Option<Condition>, ClientError> {
        match self.ledger.condition(id) {
            Ok(condition) => Ok(Some(condition)),
            Err(ContractError::NotFound) => Ok(None),
            Err(other) => Err(ClientError::Rejected(other.into())),
        }
    }

    async fn can_trigger(&self, id: ConditionId) -> Result<bool, ClientError> {
        match self.ledger.can_trigger(id) {
            Ok(eligible) => Ok(eligible),
            Err(ContractError::NotFound) => Ok(false),
            Err(other) => Err(ClientError::Rejected(other.into())),
        }
    }

    async fn can_refund(&self, id: ConditionId) -> Result<bool, ClientError> {
        match self.ledger.can_refund(id) {
            Ok(eligible) => Ok(eligible),
            Err(ContractError::NotFound) => Ok(false),
            Err(other) => Err(ClientError::Rejected(other.into())),
        }
    }

    async fn condition_count(&self) -> Result<u64, ClientError> {
        Ok(self.ledger.condition_count())
    }

    async fn balance_of(&self, account: Address) -> Result<U256, ClientError> {
        Ok(self.ledger.balance_of(account))
    }

    async fn pending_nonce(&self, account: Address) -> Result<u64, ClientError> {
        Ok(self.ledger.pending_nonce(account))
    }

    async fn estimate_gas(
        &self,
        from: Address,
        value: U256,
        call: &EscrowCall,
    ) -> Result<u64, ClientError> {
        self.ledger
            .estimate_gas(from, value, call)
            .map_err(|e| ClientError::Rejected(e.into()))
    }

    async fn submit_transaction(&self, tx: Transaction) -> Result<Receipt, ClientError> {
        self.ledger
            .submit(tx)
            .map_err(|e| ClientError::Rejected(e.into()))
    }

    async fn current_time(&self) -> Result<Timestamp, ClientError> {
        Ok(self.ledger.now())
    }
}
