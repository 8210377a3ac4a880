//! Ledger client adapter.
//!
//! Holds exactly one authenticated connection per process (account key
//! material plus a [`LedgerConnection`]) and exposes read calls and safe
//! transaction submission: gas estimation with a fixed +20% margin,
//! pending-inclusive nonce re-read before each submission, and inclusion
//! waiting with typed rejection reasons.
//!
//! The connection is constructed once at startup and injected; there is no
//! ambient lazy initialization. Connectivity failure at construction is
//! fatal by design.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod client;
pub mod connection;
pub mod error;
pub mod signer;

pub use client::LedgerClient;
pub use connection::{InProcessConnection, LedgerConnection};
pub use error::{ClientError, RejectionReason};
pub use signer::Signer;
