//! Relayer core.
//!
//! Orchestrates state-changing operations against the escrow ledger:
//! fetches current condition state, fails fast on terminal states, sends
//! exactly one submission per trigger call, and normalizes the execution
//! outcome for the gateway.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod error;
pub mod service;
pub mod view;

pub use error::RelayerError;
pub use service::RelayerService;
pub use view::{ConditionView, TriggerOutcome};
