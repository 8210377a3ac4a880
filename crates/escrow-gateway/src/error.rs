//! # Gateway Error Types
//!
//! Request-level errors mapped to HTTP responses. Ledger failures are
//! sanitized through a fixed whitelist keyed on the structured rejection
//! variant; raw ledger text never reaches a response body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use escrow_client::{ClientError, RejectionReason};
use escrow_relayer::RelayerError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// An error resolved at the gateway boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Bad or missing input.
    #[error("{0}")]
    Validation(String),

    /// Shared secret mismatch.
    #[error("Invalid API key")]
    Unauthorized,

    /// Unknown condition id.
    #[error("{0}")]
    NotFound(String),

    /// Condition already in a terminal state (or deadline not reached).
    #[error("{0}")]
    StateConflict(String),

    /// The ledger rejected or failed the operation; message already
    /// sanitized.
    #[error("{0}")]
    Ledger(String),

    /// Anything unexpected. Details stay in the logs.
    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::StateConflict(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Ledger(_) | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Sanitized message for a structured rejection. The whitelist is closed:
/// anything unrecognized gets the generic message.
#[must_use]
pub fn sanitize_rejection(reason: &RejectionReason) -> &'static str {
    match reason {
        RejectionReason::AlreadyExecuted => "Condition already executed",
        RejectionReason::AlreadyRefunded => "Condition already refunded",
        RejectionReason::InsufficientFunds => "Relayer has insufficient funds",
        RejectionReason::Other(_) => "Failed to trigger condition",
    }
}

/// Maps a trigger failure to its HTTP shape.
///
/// Pre-check outcomes keep their specific 4xx classification; ledger-level
/// failures become sanitized 500s. Losing a race to a concurrent
/// submission lands here as a normal outcome, never a crash.
#[must_use]
pub fn map_trigger_error(err: RelayerError) -> ApiError {
    match err {
        RelayerError::NotFound(_) => ApiError::NotFound("Condition not found".into()),
        RelayerError::AlreadyExecuted(_) => {
            ApiError::StateConflict("Condition already executed".into())
        }
        RelayerError::AlreadyRefunded(_) => {
            ApiError::StateConflict("Condition already refunded".into())
        }
        RelayerError::Client(ClientError::Rejected(reason)) => {
            error!(%reason, "trigger submission rejected");
            ApiError::Ledger(sanitize_rejection(&reason).into())
        }
        RelayerError::Client(err) => {
            error!(%err, "trigger submission failed");
            ApiError::Ledger("Failed to trigger condition".into())
        }
    }
}
