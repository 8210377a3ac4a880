//! Escrow state machine and in-process authoritative ledger.
//!
//! This crate is the ground truth of the system. It holds:
//!
//! - The [`Condition`] entity and the [`EscrowContract`] state machine
//!   (`Created -> {Executed | Refunded}`, both terminal, guards enforced
//!   on every transition).
//! - The [`Ledger`]: an atomically ordered execution environment with
//!   accounts, nonces, gas metering, blocks, and an event log. All
//!   mutations are serialized through one interior lock; concurrent
//!   submissions racing on the same condition are decided here, and the
//!   loser reverts with the terminal-state guard error.
//!
//! Everything above this crate (client adapter, relayer, gateway) treats
//! condition state as read-only snapshots and submits transitions through
//! [`Ledger::submit`].

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod condition;
pub mod contract;
pub mod error;
pub mod events;
pub mod ledger;
pub mod types;

pub use condition::{Condition, ConditionStatus};
pub use contract::{EscrowContract, Transfer};
pub use error::{ContractError, LedgerError};
pub use events::{ContractEvent, EventRecord};
pub use ledger::{
    costs, EscrowCall, ExecutionOutcome, GenesisAccount, GenesisConfig, GenesisError, Ledger,
    Receipt, Transaction,
};
pub use types::{
    format_units, keccak256, one_unit, parse_units, Address, ConditionId, Hash, Timestamp, U256,
};
