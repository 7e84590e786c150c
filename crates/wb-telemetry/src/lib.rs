//! # Web3 Bridge Telemetry
//!
//! Tracing setup and structured logging helpers for the provider bridge.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use wb_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let _guard = init_telemetry(TelemetryConfig::from_env())?;
//! // Provider logs are now written to stdout
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `web3-bridge` | Service name in logs |
//! | `WB_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `WB_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `WB_JSON_LOGS` | `false` (`true` in containers) | JSON formatted logs |

#![warn(clippy::all)]
#![deny(unsafe_code)]

mod config;
mod logging;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use tracing_setup::env_filter;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TelemetryError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("A global subscriber is already installed: {0}")]
    AlreadyInitialized(String),
}

/// Install the global tracing subscriber.
///
/// Returns a guard that should be held for the lifetime of the application.
/// Fails with [`TelemetryError::AlreadyInitialized`] when called twice in
/// one process.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    tracing_setup::init_tracing(&config)?;
    Ok(TelemetryGuard {
        service_name: config.service_name,
    })
}

/// Guard that keeps telemetry active.
#[derive(Debug)]
pub struct TelemetryGuard {
    service_name: String,
}

impl TelemetryGuard {
    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.service_name, "Shutting down telemetry...");
    }
}
