//! # Client Error Types
//!
//! Submission failures carry a structured [`RejectionReason`] so callers
//! classify by variant. Substring matching on ledger text is deliberately
//! impossible from here up.

use escrow_ledger::{ContractError, LedgerError};
use std::fmt;
use thiserror::Error;

/// Why the ledger rejected (or reverted) a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    /// Condition already reached the executed terminal state.
    AlreadyExecuted,
    /// Condition already reached the refunded terminal state.
    AlreadyRefunded,
    /// The signing account cannot cover value plus fee.
    InsufficientFunds,
    /// Any other rejection; the ledger's reason is kept for logs only.
    Other(String),
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyExecuted => write!(f, "condition already executed"),
            Self::AlreadyRefunded => write!(f, "condition already refunded"),
            Self::InsufficientFunds => write!(f, "insufficient funds"),
            Self::Other(reason) => write!(f, "{reason}"),
        }
    }
}

impl From<ContractError> for RejectionReason {
    fn from(err: ContractError) -> Self {
        match err {
            ContractError::AlreadyExecuted => Self::AlreadyExecuted,
            ContractError::AlreadyRefunded => Self::AlreadyRefunded,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<LedgerError> for RejectionReason {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientFunds { .. } => Self::InsufficientFunds,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Errors from the ledger client adapter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The ledger endpoint cannot be reached. Fatal at startup; degraded
    /// health at runtime.
    #[error("ledger unreachable: {0}")]
    Connectivity(String),

    /// The ledger rejected or reverted the submission.
    #[error("submission rejected: {0}")]
    Rejected(RejectionReason),

    /// Malformed signing key material.
    #[error("invalid key material: {0}")]
    InvalidKey(String),
}
