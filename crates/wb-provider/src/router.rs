//! Method router.
//!
//! Classifies one request and decides where it goes. Local methods are
//! answered here from a snapshot of provider state; host methods get their
//! outbound payload built here. Nothing in this module performs I/O.

use crate::domain::error::{ProviderError, ProviderResult};
use crate::domain::message::{classify_sign_payload, to_hex};
use crate::domain::methods::{HostHandler, RpcMethod, TypedDataVersion};
use crate::domain::typed_data::TypedData;
use crate::domain::types::{RpcRequest, WatchAsset, WatchAssetParams};
use crate::ports::outbound::TypedDataHasher;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

/// Provider state the router reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderState {
    /// Lowercased selected address, empty when logged out
    pub address: String,
    pub chain_id: u64,
}

impl ProviderState {
    pub fn new(address: &str, chain_id: u64) -> Self {
        Self {
            address: address.to_lowercase(),
            chain_id,
        }
    }

    /// Ready once an address is known
    pub fn is_ready(&self) -> bool {
        !self.address.is_empty()
    }

    /// `0x`-prefixed hex chain id
    pub fn chain_id_hex(&self) -> String {
        format!("0x{:x}", self.chain_id)
    }
}

/// Where a request goes.
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    /// Answered immediately with this value
    Local(Value),
    /// Posted to the wallet host
    Host { handler: HostHandler, object: Value },
    /// Forwarded verbatim to the upstream node
    Upstream,
    /// Refused without creating a pending call
    Unsupported,
}

impl Route {
    fn host(handler: HostHandler, object: Value) -> Self {
        Route::Host { handler, object }
    }
}

/// Route a request. Errors are parameter errors for host-bound methods.
pub fn route(
    request: &RpcRequest,
    state: &ProviderState,
    hasher: &dyn TypedDataHasher,
) -> ProviderResult<Route> {
    let method = RpcMethod::parse(&request.method);

    let route = match &method {
        // ═══════════════════════════════════════════════════════════════════
        // LOCAL
        // ═══════════════════════════════════════════════════════════════════
        RpcMethod::Accounts => {
            if state.is_ready() {
                Route::Local(json!([state.address]))
            } else {
                Route::Local(json!([]))
            }
        }
        RpcMethod::Coinbase => Route::Local(json!(state.address)),
        RpcMethod::NetVersion => Route::Local(json!(state.chain_id.to_string())),
        RpcMethod::ChainId => Route::Local(json!(state.chain_id_hex())),

        // ═══════════════════════════════════════════════════════════════════
        // HOST
        // ═══════════════════════════════════════════════════════════════════
        RpcMethod::Sign => {
            let (handler, data) = classify_sign_payload(request.required_param(1)?)?;
            Route::host(handler, json!({ "data": data }))
        }
        RpcMethod::PersonalSign => Route::host(
            HostHandler::SignPersonalMessage,
            json!({ "data": request.required_param(0)? }),
        ),
        RpcMethod::PersonalEcRecover => Route::host(
            HostHandler::EcRecover,
            json!({
                "signature": request.required_param(1)?,
                "message": request.required_param(0)?,
            }),
        ),
        RpcMethod::SignTypedData | RpcMethod::SignTypedDataV3 | RpcMethod::SignTypedDataV4 => {
            let version = method.typed_data_version().unwrap_or(TypedDataVersion::V4);
            typed_data_route(request, version, hasher)?
        }
        RpcMethod::SendTransaction => {
            Route::host(HostHandler::SignTransaction, request.required_param(0)?.clone())
        }
        RpcMethod::RequestAccounts => Route::host(HostHandler::RequestAccounts, json!({})),
        RpcMethod::WatchAsset => {
            let params: WatchAssetParams = parse_param(request, 0)?;
            Route::host(
                HostHandler::WatchAsset,
                serde_json::to_value(WatchAsset::from(params))?,
            )
        }
        RpcMethod::AddEthereumChain => {
            Route::host(HostHandler::AddEthereumChain, request.required_param(0)?.clone())
        }

        // ═══════════════════════════════════════════════════════════════════
        // REFUSED
        // ═══════════════════════════════════════════════════════════════════
        RpcMethod::NewFilter
        | RpcMethod::NewBlockFilter
        | RpcMethod::NewPendingTransactionFilter
        | RpcMethod::UninstallFilter
        | RpcMethod::Subscribe => Route::Unsupported,

        RpcMethod::Other(_) => Route::Upstream,
    };

    Ok(route)
}

/// Hash typed data and build the `signTypedMessage` payload.
///
/// The parameter may be a JSON string or an object; `raw` always carries
/// the JSON text the host should display.
fn typed_data_route(
    request: &RpcRequest,
    version: TypedDataVersion,
    hasher: &dyn TypedDataHasher,
) -> ProviderResult<Route> {
    let param = request.required_param(1)?;
    let data = TypedData::from_param(param)?;
    let hash = hasher.hash(&data, version)?;

    let raw = match param {
        Value::String(raw) => raw.clone(),
        other => serde_json::to_string(other)?,
    };

    Ok(Route::host(
        HostHandler::SignTypedMessage,
        json!({ "data": to_hex(hash), "raw": raw }),
    ))
}

fn parse_param<T: DeserializeOwned>(request: &RpcRequest, index: usize) -> ProviderResult<T> {
    let param = request.required_param(index)?;
    serde_json::from_value(param.clone()).map_err(|e| {
        ProviderError::invalid_params(format!("invalid parameter at index {}: {}", index, e))
    })
}
