//! Provider configuration with validation.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default provider identity marker shared by sibling instances.
pub const DEFAULT_MARKER: &str = "ethereum";

/// Constructor-time provider configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Selected account (`0x` + 40 hex digits) or empty when logged out
    pub address: String,
    /// Chain id reported by `eth_chainId` / `net_version`
    pub chain_id: u64,
    /// Upstream JSON-RPC endpoint for methods not handled locally or by the host
    pub rpc_url: String,
    /// Log every request and host delivery at info level
    pub debug: bool,
    /// Identity marker; providers with the same marker are siblings
    pub marker: String,
    /// Optional per-request deadline in milliseconds (none = wait forever)
    pub request_timeout_ms: Option<u64>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            chain_id: 1,
            rpc_url: "http://localhost:8545".to_string(),
            debug: false,
            marker: DEFAULT_MARKER.to_string(),
            request_timeout_ms: None,
        }
    }
}

impl ProviderConfig {
    pub fn new(address: impl Into<String>, chain_id: u64, rpc_url: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            chain_id,
            rpc_url: rpc_url.into(),
            ..Self::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_address(&self.address) {
            return Err(ConfigError::InvalidAddress(self.address.clone()));
        }

        if self.chain_id == 0 {
            return Err(ConfigError::InvalidChainId);
        }

        if self.rpc_url.trim().is_empty() {
            return Err(ConfigError::MissingRpcUrl);
        }

        if self.marker.is_empty() {
            return Err(ConfigError::EmptyMarker);
        }

        if self.request_timeout_ms == Some(0) {
            return Err(ConfigError::InvalidTimeout(
                "request timeout cannot be 0".into(),
            ));
        }

        Ok(())
    }

    /// Get the request deadline, if configured
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

/// Partial configuration update (address, chain, endpoint)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<String>,
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid address: {0:?}")]
    InvalidAddress(String),

    #[error("chain id cannot be 0")]
    InvalidChainId,

    #[error("rpc url cannot be empty")]
    MissingRpcUrl,

    #[error("provider marker cannot be empty")]
    EmptyMarker,

    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
}

/// Empty, or `0x` followed by exactly 40 hex digits (any case).
pub fn is_valid_address(address: &str) -> bool {
    if address.is_empty() {
        return true;
    }
    match address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
    {
        Some(hex) => hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}
