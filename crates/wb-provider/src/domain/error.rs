//! Provider error types with EIP-1193 and JSON-RPC 2.0 error codes.
//!
//! Every failure that reaches a page caller travels as a [`ProviderError`]
//! through the same completion channel as a successful result.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Provider error codes
pub mod codes {
    // EIP-1193 provider errors
    pub const USER_REJECTED: i64 = 4001;
    pub const UNAUTHORIZED: i64 = 4100;
    pub const UNSUPPORTED_METHOD: i64 = 4200;
    pub const DISCONNECTED: i64 = 4900;

    // JSON-RPC 2.0 standard errors (-32700 to -32600)
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    // Server errors (-32000 to -32099)
    pub const SERVER_ERROR: i64 = -32000;
    pub const TIMEOUT: i64 = -32006;
}

/// Structured provider error delivered to the page caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderError {
    /// Error code
    pub code: i64,
    /// Error message
    pub message: String,
    /// Optional additional data
    pub data: Option<Value>,
}

impl ProviderError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(code: i64, message: impl Into<String>, data: Value) -> Self {
        Self {
            code,
            message: message.into(),
            data: Some(data),
        }
    }

    /// Method intentionally not offered by this provider (filters, subscriptions).
    pub fn unsupported_method(method: &str) -> Self {
        Self::new(
            codes::UNSUPPORTED_METHOD,
            format!("Web3 Bridge does not support {}", method),
        )
    }

    /// Legacy synchronous `send` called for a method that needs a round trip.
    pub fn unsupported_sync(method: &str) -> Self {
        Self::new(
            codes::UNSUPPORTED_METHOD,
            format!(
                "Web3 Bridge does not support calling {} synchronously without a callback. \
                 Please provide a callback parameter to call {} asynchronously.",
                method, method
            ),
        )
    }

    /// Host-bound call issued before an address is established.
    pub fn not_ready() -> Self {
        Self::new(codes::UNAUTHORIZED, "provider is not ready")
    }

    pub fn user_rejected(details: impl Into<String>) -> Self {
        Self::new(codes::USER_REJECTED, details.into())
    }

    pub fn invalid_params(details: impl Into<String>) -> Self {
        Self::new(
            codes::INVALID_PARAMS,
            format!("Invalid params: {}", details.into()),
        )
    }

    pub fn internal(details: impl Into<String>) -> Self {
        Self::new(
            codes::INTERNAL_ERROR,
            format!("Internal error: {}", details.into()),
        )
    }

    pub fn timeout(method: &str, after_ms: u64) -> Self {
        Self::with_data(
            codes::TIMEOUT,
            format!("Request timeout: {}", method),
            serde_json::json!({ "timeout_ms": after_ms }),
        )
    }

    /// Interpret an error value delivered by the wallet host.
    ///
    /// The host sends either a `{code, message}` object or a bare message
    /// string. Anything else is kept as `data` on a generic server error.
    pub fn from_host(raw: Value) -> Self {
        match raw {
            Value::String(message) => Self::new(codes::SERVER_ERROR, message),
            Value::Object(_) => match serde_json::from_value::<ProviderError>(raw.clone()) {
                Ok(err) => err,
                Err(_) => {
                    let message = raw
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("host error")
                        .to_string();
                    Self::with_data(codes::SERVER_ERROR, message, raw)
                }
            },
            other => Self::with_data(codes::SERVER_ERROR, "host error", other),
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ProviderError {}

impl Serialize for ProviderError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let len = if self.data.is_some() { 3 } else { 2 };
        let mut state = serializer.serialize_struct("ProviderError", len)?;
        state.serialize_field("code", &self.code)?;
        state.serialize_field("message", &self.message)?;
        if let Some(ref data) = self.data {
            state.serialize_field("data", data)?;
        }
        state.end()
    }
}

impl<'de> Deserialize<'de> for ProviderError {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct ErrorHelper {
            code: i64,
            message: String,
            data: Option<Value>,
        }

        let helper = ErrorHelper::deserialize(deserializer)?;
        Ok(ProviderError {
            code: helper.code,
            message: helper.message,
            data: helper.data,
        })
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_syntax() || e.is_eof() {
            ProviderError::new(codes::PARSE_ERROR, format!("Parse error: {}", e))
        } else {
            ProviderError::invalid_params(e.to_string())
        }
    }
}

impl From<hex::FromHexError> for ProviderError {
    fn from(e: hex::FromHexError) -> Self {
        ProviderError::invalid_params(format!("invalid hex: {}", e))
    }
}

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Bridge-level errors (infrastructure, not delivered as JSON-RPC errors)
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] crate::domain::config::ConfigError),

    /// Malformed message on the host channel
    #[error("invalid host message: {0}")]
    InvalidHostMessage(String),

    /// Serialization failure
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
