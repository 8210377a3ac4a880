//! Gateway API - HTTP surface over the relayer core.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                    GATEWAY API                        │
//! ├──────────────────────────────────────────────────────┤
//! │  GET  /health                                         │
//! │  POST /api/conditions            (metadata write)     │
//! │  GET  /api/conditions            (enumeration)        │
//! │  GET  /api/conditions/:id        (merged status)      │
//! │  POST /api/conditions/:id/trigger (gated mutation)    │
//! │                                                       │
//! │  CatchPanic → Trace → CORS → [RateLimit on /api]      │
//! └──────────────────────┬───────────────────────────────┘
//!                        │
//!                  Relayer Core
//!                        │
//!               Ledger Client Adapter
//! ```
//!
//! Authentication and input validation resolve at this boundary and never
//! reach the relayer core. Ledger failures are sanitized through a closed
//! whitelist keyed on structured rejection variants.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod metadata;
pub mod rate_limit;
pub mod routes;

pub use config::{ConfigError, GatewayConfig, RateLimitConfig};
pub use error::ApiError;
pub use metadata::{InMemoryMetadataStore, MetadataRecord, MetadataStore};
pub use rate_limit::{cleanup_task, RateLimitLayer, RateLimitState};
pub use routes::{router, AppState};
