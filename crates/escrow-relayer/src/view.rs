//! API-facing views of ledger state.

use escrow_ledger::{
    format_units, Address, Condition, ConditionId, Hash, Receipt, Timestamp,
};
use serde::Serialize;

/// A condition snapshot with the amount rendered in decimal units,
/// ready for JSON responses.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionView {
    pub id: ConditionId,
    pub payer: Address,
    pub payee: Address,
    /// Escrowed amount as a decimal unit string (e.g. `"1.0"`).
    pub amount: String,
    pub deadline: Timestamp,
    #[serde(rename = "metadataURI")]
    pub metadata_uri: String,
    pub executed: bool,
    pub refunded: bool,
    pub created_at: Timestamp,
}

impl From<Condition> for ConditionView {
    fn from(c: Condition) -> Self {
        Self {
            id: c.id,
            payer: c.payer,
            payee: c.payee,
            amount: format_units(c.amount),
            deadline: c.deadline,
            metadata_uri: c.metadata_uri,
            executed: c.executed,
            refunded: c.refunded,
            created_at: c.created_at,
        }
    }
}

/// Inclusion metadata for a confirmed trigger, with the normalized status.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerOutcome {
    pub tx_hash: Hash,
    pub block_number: u64,
    pub gas_used: u64,
    /// `"success"` or `"failed"`, derived from the execution outcome.
    pub status: &'static str,
}

impl TriggerOutcome {
    /// Normalizes a receipt into the outcome callers report.
    #[must_use]
    pub fn from_receipt(receipt: &Receipt) -> Self {
        Self {
            tx_hash: receipt.tx_hash,
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
            status: if receipt.outcome.is_success() {
                "success"
            } else {
                "failed"
            },
        }
    }
}
