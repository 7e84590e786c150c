//! Outbound ports for the provider bridge.
//!
//! The bridge never performs signing or network I/O itself. The wallet host,
//! the upstream JSON-RPC node and the typed-data hasher are all injected.

use crate::domain::error::{codes, ProviderError};
use crate::domain::methods::TypedDataVersion;
use crate::domain::typed_data::{eip712_hash, TypedData, TypedDataError, Word};
use crate::domain::types::{JsonRpcResponse, RpcRequest};
use async_trait::async_trait;
use serde_json::Value;

/// Platform message sink towards the wallet host.
///
/// Receives the serialized `{id, name, object}` message. Delivery is
/// fire-and-forget; the reply comes back through the provider's inbound
/// methods.
pub trait HostSink: Send + Sync {
    fn post(&self, message: String) -> Result<(), HostSinkError>;
}

/// Host sink errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostSinkError {
    #[error("host channel closed")]
    ChannelClosed,
}

impl From<HostSinkError> for ProviderError {
    fn from(e: HostSinkError) -> Self {
        ProviderError::new(codes::DISCONNECTED, format!("Host unreachable: {}", e))
    }
}

/// Upstream JSON-RPC node for every method the bridge does not answer itself.
#[async_trait]
pub trait UpstreamTransport: Send + Sync {
    /// Send one request and return the node's response envelope.
    async fn call(
        &self,
        endpoint: &str,
        request: &RpcRequest,
    ) -> Result<JsonRpcResponse, TransportError>;
}

/// Upstream transport errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    #[error("http error: {0}")]
    Http(String),

    #[error("invalid response: {0}")]
    Decode(String),

    /// The node answered with a JSON-RPC error object
    #[error("rpc error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<Value>,
    },
}

impl From<TransportError> for ProviderError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Rpc {
                code,
                message,
                data,
            } => ProviderError {
                code,
                message,
                data,
            },
            TransportError::Http(msg) => {
                ProviderError::new(codes::DISCONNECTED, format!("Upstream unreachable: {}", msg))
            }
            TransportError::Decode(msg) => ProviderError::internal(msg),
        }
    }
}

/// Turn an error envelope into [`TransportError::Rpc`].
pub fn ensure_success(mut response: JsonRpcResponse) -> Result<JsonRpcResponse, TransportError> {
    match response.error.take() {
        Some(error) => Err(TransportError::Rpc {
            code: error.code,
            message: error.message,
            data: error.data,
        }),
        None => Ok(response),
    }
}

/// EIP-712 digest computation for the typed-data signing methods.
pub trait TypedDataHasher: Send + Sync {
    fn hash(&self, data: &TypedData, version: TypedDataVersion) -> Result<Word, TypedDataError>;
}

/// Default hasher backed by [`eip712_hash`]
#[derive(Debug, Clone, Copy, Default)]
pub struct Eip712Hasher;

impl TypedDataHasher for Eip712Hasher {
    fn hash(&self, data: &TypedData, version: TypedDataVersion) -> Result<Word, TypedDataError> {
        eip712_hash(data, version)
    }
}

impl From<TypedDataError> for ProviderError {
    fn from(e: TypedDataError) -> Self {
        ProviderError::invalid_params(e.to_string())
    }
}
