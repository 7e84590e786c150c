//! Wire types shared by the page-facing and host-facing sides of the bridge.

use crate::domain::error::{ProviderError, ProviderResult};
use crate::domain::methods::HostHandler;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// JSON-RPC protocol version tag
pub const JSONRPC_VERSION: &str = "2.0";

fn default_version() -> String {
    JSONRPC_VERSION.to_string()
}

/// A JSON-RPC shaped call issued by page code.
///
/// `id` may be any scalar (or absent); it is rewritten to an internal
/// integer before dispatch and restored on the way back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    #[serde(default = "default_version")]
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
}

impl RpcRequest {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: default_version(),
            method: method.into(),
            params,
            id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<Value>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Positional parameter. A non-array `params` is treated as a single
    /// positional argument at index 0.
    pub fn param(&self, index: usize) -> Option<&Value> {
        match &self.params {
            Value::Array(items) => items.get(index),
            Value::Null => None,
            other if index == 0 => Some(other),
            _ => None,
        }
    }

    /// Positional parameter that must be present and non-null.
    pub fn required_param(&self, index: usize) -> ProviderResult<&Value> {
        self.param(index)
            .filter(|v| !v.is_null())
            .ok_or_else(|| {
                ProviderError::invalid_params(format!(
                    "{} expects a parameter at index {}",
                    self.method, index
                ))
            })
    }

    /// Internal id, once the request has been through the identifier mapper.
    pub fn internal_id(&self) -> Option<u64> {
        self.id.as_ref().and_then(Value::as_u64)
    }
}

/// Single request or batch, as accepted by the legacy `sendAsync` surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RpcPayload {
    Batch(Vec<RpcRequest>),
    Single(RpcRequest),
}

impl From<RpcRequest> for RpcPayload {
    fn from(request: RpcRequest) -> Self {
        RpcPayload::Single(request)
    }
}

impl From<Vec<RpcRequest>> for RpcPayload {
    fn from(requests: Vec<RpcRequest>) -> Self {
        RpcPayload::Batch(requests)
    }
}

/// Outcome of `sendAsync`: one result per request, by position.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcOutcome {
    Single(ProviderResult<Value>),
    Batch(Vec<ProviderResult<Value>>),
}

/// JSON-RPC response envelope
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default = "default_version")]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub error: Option<ProviderError>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: default_version(),
            id,
            result,
            error: None,
        }
    }

    pub fn failure(id: Value, error: ProviderError) -> Self {
        Self {
            jsonrpc: default_version(),
            id,
            result: Value::Null,
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Envelope as a plain JSON value.
    pub fn into_value(self) -> Value {
        serde_json::to_value(&self).unwrap_or(Value::Null)
    }
}

impl Serialize for JsonRpcResponse {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("JsonRpcResponse", 3)?;
        state.serialize_field("jsonrpc", &self.jsonrpc)?;
        state.serialize_field("id", &self.id)?;
        match &self.error {
            Some(error) => state.serialize_field("error", error)?,
            None => state.serialize_field("result", &self.result)?,
        }
        state.end()
    }
}

/// Outbound message to the wallet host: `{id, name, object}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostMessage {
    pub id: u64,
    pub name: HostHandler,
    pub object: Value,
}

/// Event pushed to page subscribers (`accountsChanged`, `chainChanged`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderEvent {
    pub event: String,
    pub payload: Value,
}

/// `wallet_watchAsset` request params (EIP-747).
#[derive(Debug, Clone, Deserialize)]
pub struct WatchAssetParams {
    #[serde(rename = "type")]
    pub asset_type: String,
    pub options: WatchAssetOptions,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WatchAssetOptions {
    pub address: String,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub decimals: Option<Value>,
    #[serde(default)]
    pub image: Option<String>,
}

/// Normalized `watchAsset` payload sent to the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WatchAsset {
    #[serde(rename = "type")]
    pub asset_type: String,
    pub contract: String,
    pub symbol: Option<String>,
    pub decimals: Value,
}

impl From<WatchAssetParams> for WatchAsset {
    fn from(params: WatchAssetParams) -> Self {
        let decimals = match params.options.decimals {
            None | Some(Value::Null) => Value::from(0),
            Some(decimals) => decimals,
        };
        Self {
            asset_type: params.asset_type,
            contract: params.options.address,
            symbol: params.options.symbol,
            decimals,
        }
    }
}
