//! # Error Types
//!
//! Errors raised by the escrow contract guards and by ledger-level
//! transaction validation. Contract errors are structured variants so callers
//! classify outcomes by tag, never by message text.

use crate::types::{Address, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// CONTRACT ERRORS
// =============================================================================

/// A rejected escrow contract operation.
///
/// Messages mirror the revert reasons the ledger records for auditing, but
/// classification is done on the variant.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractError {
    /// Payee is the zero address.
    #[error("Invalid payee address")]
    InvalidPayee,

    /// No value attached to the creation call.
    #[error("Amount must be greater than 0")]
    InvalidAmount,

    /// Deadline at or before current ledger time.
    #[error("Deadline must be in the future")]
    InvalidDeadline,

    /// No condition with the given id.
    #[error("Condition does not exist")]
    NotFound,

    /// Condition reached the executed terminal state.
    #[error("Condition already executed")]
    AlreadyExecuted,

    /// Condition reached the refunded terminal state.
    #[error("Condition already refunded")]
    AlreadyRefunded,

    /// Refund requested at or before the deadline.
    #[error("Deadline not reached")]
    DeadlineNotReached,

    /// Caller does not hold the relayer role.
    #[error("Caller is not an authorized relayer")]
    NotRelayer,

    /// Refund caller is not the original payer.
    #[error("Only payer can refund")]
    NotPayer,

    /// Role management caller is not the admin.
    #[error("Caller is not the admin")]
    NotAdmin,

    /// Relayer address to add is the zero address.
    #[error("Invalid relayer address")]
    InvalidRelayer,
}

impl ContractError {
    /// Returns true if the condition is in a terminal state.
    #[must_use]
    pub fn is_terminal_state(&self) -> bool {
        matches!(self, Self::AlreadyExecuted | Self::AlreadyRefunded)
    }
}

// =============================================================================
// LEDGER ERRORS
// =============================================================================

/// Errors from ledger-level transaction validation, before contract
/// execution starts. A transaction failing here is never included.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Sequence number does not match the account's next nonce.
    #[error("nonce mismatch: expected {expected}, got {got}")]
    NonceMismatch {
        /// Next valid nonce for the account.
        expected: u64,
        /// Nonce carried by the transaction.
        got: u64,
    },

    /// Sender balance cannot cover attached value plus the maximum fee.
    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        /// Value plus gas_limit * gas_price.
        required: U256,
        /// Current sender balance.
        available: U256,
    },

    /// Sender account is the zero address.
    #[error("invalid sender: {0}")]
    InvalidSender(Address),
}
