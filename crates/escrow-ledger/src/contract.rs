//! # Escrow Contract
//!
//! The ledger-enforced state machine. States: `Created -> {Executed |
//! Refunded}`, both terminal. The contract holds no balances itself; it
//! returns the transfer each successful transition requires and the ledger
//! applies it atomically with the state change.
//!
//! Guard order matches the recorded revert behavior:
//! - trigger: relayer role, existence, executed, refunded
//! - refund: existence, executed, refunded, payer, deadline

use crate::condition::Condition;
use crate::error::ContractError;
use crate::events::ContractEvent;
use crate::types::{Address, ConditionId, Hash, Timestamp, U256};
use std::collections::HashSet;

/// Funds movement a successful transition requires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transfer {
    /// Recipient of the escrowed value.
    pub to: Address,
    /// Full escrowed amount of the condition.
    pub amount: U256,
}

/// The escrow state machine, executed only by the ledger.
#[derive(Clone, Debug)]
pub struct EscrowContract {
    admin: Address,
    relayers: HashSet<Address>,
    conditions: Vec<Condition>,
}

impl EscrowContract {
    /// Deploys the contract with an admin and one initial relayer.
    ///
    /// Rejects a zero initial relayer, mirroring the deployment guard.
    pub fn new(admin: Address, initial_relayer: Address) -> Result<Self, ContractError> {
        if initial_relayer.is_zero() {
            return Err(ContractError::InvalidRelayer);
        }
        let mut relayers = HashSet::new();
        relayers.insert(initial_relayer);
        Ok(Self {
            admin,
            relayers,
            conditions: Vec::new(),
        })
    }

    /// Records a new condition and escrows the attached value.
    ///
    /// Returns the assigned sequential id. The ledger moves `value` from the
    /// caller into escrow if and only if this succeeds.
    pub fn create_condition(
        &mut self,
        caller: Address,
        value: U256,
        payee: Address,
        deadline: Timestamp,
        metadata_uri: String,
        now: Timestamp,
    ) -> Result<(ConditionId, ContractEvent), ContractError> {
        if payee.is_zero() {
            return Err(ContractError::InvalidPayee);
        }
        if value.is_zero() {
            return Err(ContractError::InvalidAmount);
        }
        if deadline <= now {
            return Err(ContractError::InvalidDeadline);
        }

        let id = self.conditions.len() as ConditionId;
        self.conditions.push(Condition {
            id,
            payer: caller,
            payee,
            amount: value,
            deadline,
            metadata_uri: metadata_uri.clone(),
            executed: false,
            refunded: false,
            created_at: now,
        });

        Ok((
            id,
            ContractEvent::ConditionCreated {
                id,
                payer: caller,
                payee,
                amount: value,
                deadline,
                metadata_uri,
            },
        ))
    }

    /// Releases escrowed funds to the payee.
    ///
    /// Restricted to the relayer role. The proof hash is recorded in the
    /// event for audit; it is not verified against the condition. Not
    /// deadline-gated.
    pub fn trigger_condition(
        &mut self,
        caller: Address,
        id: ConditionId,
        proof_hash: Hash,
    ) -> Result<(Transfer, ContractEvent), ContractError> {
        if !self.relayers.contains(&caller) {
            return Err(ContractError::NotRelayer);
        }
        let condition = self
            .conditions
            .get_mut(id as usize)
            .ok_or(ContractError::NotFound)?;
        if condition.executed {
            return Err(ContractError::AlreadyExecuted);
        }
        if condition.refunded {
            return Err(ContractError::AlreadyRefunded);
        }

        condition.executed = true;
        Ok((
            Transfer {
                to: condition.payee,
                amount: condition.amount,
            },
            ContractEvent::ConditionTriggered {
                id,
                relayer: caller,
                proof_hash,
            },
        ))
    }

    /// Returns escrowed funds to the original payer after the deadline.
    pub fn refund_condition(
        &mut self,
        caller: Address,
        id: ConditionId,
        now: Timestamp,
    ) -> Result<(Transfer, ContractEvent), ContractError> {
        let condition = self
            .conditions
            .get_mut(id as usize)
            .ok_or(ContractError::NotFound)?;
        if condition.executed {
            return Err(ContractError::AlreadyExecuted);
        }
        if condition.refunded {
            return Err(ContractError::AlreadyRefunded);
        }
        if caller != condition.payer {
            return Err(ContractError::NotPayer);
        }
        if now <= condition.deadline {
            return Err(ContractError::DeadlineNotReached);
        }

        condition.refunded = true;
        Ok((
            Transfer {
                to: condition.payer,
                amount: condition.amount,
            },
            ContractEvent::ConditionRefunded {
                id,
                payer: condition.payer,
            },
        ))
    }

    /// Grants the relayer role. Admin only.
    pub fn add_relayer(
        &mut self,
        caller: Address,
        relayer: Address,
    ) -> Result<ContractEvent, ContractError> {
        if caller != self.admin {
            return Err(ContractError::NotAdmin);
        }
        if relayer.is_zero() {
            return Err(ContractError::InvalidRelayer);
        }
        self.relayers.insert(relayer);
        Ok(ContractEvent::RelayerAdded { relayer })
    }

    /// Revokes the relayer role. Admin only.
    pub fn remove_relayer(
        &mut self,
        caller: Address,
        relayer: Address,
    ) -> Result<ContractEvent, ContractError> {
        if caller != self.admin {
            return Err(ContractError::NotAdmin);
        }
        self.relayers.remove(&relayer);
        Ok(ContractEvent::RelayerRemoved { relayer })
    }

    /// Snapshot of a condition by id.
    pub fn condition(&self, id: ConditionId) -> Result<&Condition, ContractError> {
        self.conditions
            .get(id as usize)
            .ok_or(ContractError::NotFound)
    }

    /// Trigger eligibility, computed from the same guards as the mutation.
    pub fn can_trigger(&self, id: ConditionId) -> Result<bool, ContractError> {
        Ok(self.condition(id)?.can_trigger())
    }

    /// Refund eligibility, computed from the same guards as the mutation.
    pub fn can_refund(&self, id: ConditionId, now: Timestamp) -> Result<bool, ContractError> {
        Ok(self.condition(id)?.can_refund(now))
    }

    /// Number of conditions ever created. Never decreases.
    #[must_use]
    pub fn condition_count(&self) -> u64 {
        self.conditions.len() as u64
    }

    /// True if the identity currently holds the relayer role.
    #[must_use]
    pub fn is_relayer(&self, who: Address) -> bool {
        self.relayers.contains(&who)
    }

    /// The admin identity.
    #[must_use]
    pub fn admin(&self) -> Address {
        self.admin
    }
}
