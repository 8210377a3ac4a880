//! # Escrow Relayer Node
//!
//! Wires the stack together and serves it:
//!
//! 1. Load configuration from the environment
//! 2. Read the deployment descriptor and build the ledger
//! 3. Connect the ledger client (fatal if the ledger is unreachable -
//!    the process must not serve traffic without a working connection)
//! 4. Construct the relayer service and gateway, then serve until ctrl-c
//!
//! The client and contract handles are built exactly once here and passed
//! down by reference; no lazy ambient initialization anywhere below.

mod config;

use anyhow::{Context, Result};
use escrow_client::{InProcessConnection, LedgerClient, Signer};
use escrow_gateway::{
    cleanup_task, router, AppState, GatewayConfig, InMemoryMetadataStore, RateLimitConfig,
};
use escrow_ledger::{Address, GenesisAccount, GenesisConfig, Ledger};
use escrow_relayer::RelayerService;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::NodeConfig;

/// On-disk deployment artifact: contract roles and initial account state.
///
/// When `relayer` is omitted, the role is granted to the configured
/// signing identity.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeploymentDescriptor {
    admin: Address,
    relayer: Option<Address>,
    #[serde(default)]
    accounts: Vec<GenesisAccount>,
    /// Faucet balance granted to the signing identity when the descriptor
    /// does not pre-fund it, so the relayer can pay for gas on a fresh
    /// local network.
    relayer_balance: Option<String>,
    gas_price: Option<u64>,
}

fn load_descriptor(path: &Path) -> Result<DeploymentDescriptor> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Deployment artifact not found: {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("invalid deployment artifact: {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config = NodeConfig::from_env()?;

    let signer = Signer::from_hex(&config.relayer_key)?;
    info!(relayer = %signer.address(), "relayer identity initialized");

    let descriptor = load_descriptor(&config.deployment_path)?;
    let mut accounts = descriptor.accounts;
    if !accounts.iter().any(|a| a.address == signer.address()) {
        accounts.push(GenesisAccount {
            address: signer.address(),
            balance: descriptor.relayer_balance.unwrap_or_else(|| "10.0".into()),
        });
    }
    let genesis = GenesisConfig {
        admin: descriptor.admin,
        relayer: descriptor.relayer.unwrap_or_else(|| signer.address()),
        accounts,
        gas_price: descriptor.gas_price.unwrap_or(1_000_000_000),
    };
    let ledger = Arc::new(Ledger::new(&genesis)?);
    info!(path = %config.deployment_path.display(), "contract loaded");

    // Fatal if the ledger is unreachable; no silent retry
    let connection = Arc::new(InProcessConnection::new(Arc::clone(&ledger)));
    let client = Arc::new(LedgerClient::connect(connection, signer).await?);
    let relayer = Arc::new(RelayerService::new(client));

    let gateway_config = GatewayConfig {
        network: config.network.clone(),
        api_key: config.api_key.clone(),
        rate_limit: RateLimitConfig {
            window: config.rate_limit_window,
            max_requests: config.rate_limit_max_requests,
        },
    };
    gateway_config.validate()?;

    let state = AppState {
        relayer,
        metadata: Arc::new(InMemoryMetadataStore::new()),
        config: Arc::new(gateway_config),
    };
    let (app, limiter) = router(state);
    tokio::spawn(cleanup_task(limiter, Duration::from_secs(300)));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, network = %config.network, "relayer gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("received shutdown signal");
}
