//! Gateway configuration with validation.

use std::time::Duration;
use thiserror::Error;

/// Main gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Network name reported by the health endpoint.
    pub network: String,
    /// Shared secret gating the trigger route.
    pub api_key: String,
    /// Rate limiting applied to all `/api` routes.
    pub rate_limit: RateLimitConfig,
}

/// Fixed-window rate limit configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Window length.
    pub window: Duration,
    /// Requests allowed per client per window.
    pub max_requests: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60),
            max_requests: 10,
        }
    }
}

/// Configuration validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Empty shared secret would accept every caller.
    #[error("api_key cannot be empty")]
    EmptyApiKey,

    /// A zero rate limit rejects or admits everything.
    #[error("invalid rate limit: {0}")]
    InvalidRateLimit(String),
}

impl GatewayConfig {
    /// Validate configuration before serving.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.is_empty() {
            return Err(ConfigError::EmptyApiKey);
        }
        if self.rate_limit.max_requests == 0 {
            return Err(ConfigError::InvalidRateLimit(
                "max_requests cannot be 0".into(),
            ));
        }
        if self.rate_limit.window.is_zero() {
            return Err(ConfigError::InvalidRateLimit("window cannot be 0".into()));
        }
        Ok(())
    }
}
