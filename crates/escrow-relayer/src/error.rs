//! Relayer error taxonomy.

use escrow_client::ClientError;
use escrow_ledger::ConditionId;
use thiserror::Error;

/// Errors from relayer orchestration.
///
/// The terminal-state variants come from the local pre-check; the same
/// conditions re-validated by the ledger arrive as
/// [`ClientError::Rejected`] instead. Both are expected, non-fatal
/// outcomes under concurrency.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RelayerError {
    /// No condition with the given id.
    #[error("condition {0} does not exist")]
    NotFound(ConditionId),

    /// Pre-check found the condition already executed.
    #[error("condition {0} already executed")]
    AlreadyExecuted(ConditionId),

    /// Pre-check found the condition already refunded.
    #[error("condition {0} already refunded")]
    AlreadyRefunded(ConditionId),

    /// Failure from the ledger client adapter.
    #[error(transparent)]
    Client(#[from] ClientError),
}
