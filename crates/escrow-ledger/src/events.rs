//! # Event Schema
//!
//! Events emitted by the escrow contract and recorded in order by the
//! ledger. Recorded for audit; the contract never re-reads them.

use crate::types::{Address, ConditionId, Hash, Timestamp, U256};
use serde::{Deserialize, Serialize};

/// A contract event, emitted on each successful state transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ContractEvent {
    /// A new condition was funded and recorded.
    #[serde(rename_all = "camelCase")]
    ConditionCreated {
        id: ConditionId,
        payer: Address,
        payee: Address,
        amount: U256,
        deadline: Timestamp,
        #[serde(rename = "metadataURI")]
        metadata_uri: String,
    },

    /// An authorized relayer released the funds to the payee. The proof
    /// hash is recorded as-is; it is not verified against the condition.
    #[serde(rename_all = "camelCase")]
    ConditionTriggered {
        id: ConditionId,
        relayer: Address,
        proof_hash: Hash,
    },

    /// The payer reclaimed the funds after the deadline.
    #[serde(rename_all = "camelCase")]
    ConditionRefunded { id: ConditionId, payer: Address },

    /// Admin granted the relayer role.
    #[serde(rename_all = "camelCase")]
    RelayerAdded { relayer: Address },

    /// Admin revoked the relayer role.
    #[serde(rename_all = "camelCase")]
    RelayerRemoved { relayer: Address },
}

/// An event together with the block that included it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Block in which the emitting transaction was included.
    pub block_number: u64,
    /// The emitted event.
    pub event: ContractEvent,
}
