//! # Condition Entity
//!
//! The central escrow record. Owned exclusively by the ledger once created;
//! everything outside the contract sees read-only snapshots.

use crate::types::{Address, ConditionId, Timestamp, U256};
use serde::{Deserialize, Serialize};

/// An escrow record binding payer, payee, amount, deadline, and an opaque
/// completion descriptor.
///
/// `executed` and `refunded` are mutually exclusive and permanent. All
/// transitions go through the contract guards; nothing else mutates a
/// condition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Sequential id assigned at creation, never reused.
    pub id: ConditionId,
    /// Identity that funded the condition. Only this identity may refund.
    pub payer: Address,
    /// Identity entitled to the funds on trigger.
    pub payee: Address,
    /// Escrowed value, equal to the value attached at creation.
    pub amount: U256,
    /// Absolute timestamp after which refund becomes eligible.
    pub deadline: Timestamp,
    /// Opaque pointer to the off-ledger completion descriptor.
    #[serde(rename = "metadataURI")]
    pub metadata_uri: String,
    /// Terminal flag: funds released to payee.
    pub executed: bool,
    /// Terminal flag: funds returned to payer.
    pub refunded: bool,
    /// Ledger time at creation.
    pub created_at: Timestamp,
}

/// Three-state view of a condition. Exactly one state holds at any time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionStatus {
    /// Neither terminal flag set; trigger and (after deadline) refund reachable.
    Active,
    /// Funds released to payee.
    Executed,
    /// Funds returned to payer.
    Refunded,
}

impl Condition {
    /// Derived three-state status.
    #[must_use]
    pub fn status(&self) -> ConditionStatus {
        if self.executed {
            ConditionStatus::Executed
        } else if self.refunded {
            ConditionStatus::Refunded
        } else {
            ConditionStatus::Active
        }
    }

    /// True while no terminal state has been reached.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        !self.executed && !self.refunded
    }

    /// Trigger eligibility. Deliberately not deadline-gated: a late but
    /// valid proof still releases funds as long as no refund landed first.
    #[must_use]
    pub fn can_trigger(&self) -> bool {
        self.is_pending()
    }

    /// Refund eligibility: still pending and the deadline has passed.
    #[must_use]
    pub fn can_refund(&self, now: Timestamp) -> bool {
        self.is_pending() && now > self.deadline
    }
}
