//! Environment-style node configuration.
//!
//! Missing signing key material or a missing deployment descriptor is a
//! fatal startup error; everything else has a development default.

use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Everything the node needs to start.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Network name, reported by the health endpoint (`NETWORK`).
    pub network: String,
    /// Hex-encoded relayer signing key (`RELAYER_PRIVATE_KEY`, required).
    pub relayer_key: String,
    /// Deployment descriptor path (`DEPLOYMENT_PATH`, defaults to
    /// `deployments/<network>.json`).
    pub deployment_path: PathBuf,
    /// Shared API secret (`API_KEY`).
    pub api_key: String,
    /// Rate limit window (`RATE_LIMIT_WINDOW_MS`).
    pub rate_limit_window: Duration,
    /// Requests per window per client (`RATE_LIMIT_MAX_REQUESTS`).
    pub rate_limit_max_requests: u32,
    /// Listening port (`PORT`).
    pub port: u16,
}

impl NodeConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        let network = env::var("NETWORK").unwrap_or_else(|_| "localhost".into());

        let relayer_key = match env::var("RELAYER_PRIVATE_KEY") {
            Ok(key) if !key.is_empty() => key,
            _ => bail!("RELAYER_PRIVATE_KEY not set in environment"),
        };

        let deployment_path = env::var("DEPLOYMENT_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(format!("deployments/{network}.json")));

        let api_key = env::var("API_KEY").unwrap_or_else(|_| "demo_api_key_12345".into());

        let window_ms: u64 = parse_env("RATE_LIMIT_WINDOW_MS", 60_000)?;
        let max_requests: u32 = parse_env("RATE_LIMIT_MAX_REQUESTS", 10)?;
        let port: u16 = parse_env("PORT", 3_001)?;

        Ok(Self {
            network,
            relayer_key,
            deployment_path,
            api_key,
            rate_limit_window: Duration::from_millis(window_ms),
            rate_limit_max_requests: max_requests,
            port,
        })
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("invalid {name}: {raw:?}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test to avoid racing on process-global environment state.
    #[test]
    fn test_from_env() {
        env::remove_var("RELAYER_PRIVATE_KEY");
        assert!(NodeConfig::from_env().is_err());

        env::set_var("RELAYER_PRIVATE_KEY", "0x".to_owned() + &"07".repeat(32));
        env::set_var("NETWORK", "testnet");
        env::remove_var("DEPLOYMENT_PATH");
        env::remove_var("RATE_LIMIT_WINDOW_MS");
        env::remove_var("RATE_LIMIT_MAX_REQUESTS");
        env::remove_var("PORT");

        let config = NodeConfig::from_env().unwrap();
        assert_eq!(config.network, "testnet");
        assert_eq!(
            config.deployment_path,
            PathBuf::from("deployments/testnet.json")
        );
        assert_eq!(config.api_key, "demo_api_key_12345");
        assert_eq!(config.rate_limit_window, Duration::from_secs(60));
        assert_eq!(config.rate_limit_max_requests, 10);
        assert_eq!(config.port, 3_001);

        env::set_var("PORT", "not-a-port");
        assert!(NodeConfig::from_env().is_err());
        env::remove_var("PORT");
        env::remove_var("NETWORK");
        env::remove_var("RELAYER_PRIVATE_KEY");
    }
}
