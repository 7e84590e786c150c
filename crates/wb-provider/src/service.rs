//! Provider facade.
//!
//! Wires the id mapper, pending-call registry, router, host channel and
//! provider directory together behind the page-facing request surface.

use crate::adapters::directory::{ContextId, ProviderDirectory};
use crate::adapters::host::{HostChannel, HostReply};
use crate::adapters::http::HttpTransport;
use crate::adapters::pending::{Completion, PendingCallRegistry, PendingStatsSnapshot};
use crate::domain::config::{is_valid_address, ConfigError, ConfigUpdate, ProviderConfig};
use crate::domain::error::{BridgeError, ProviderError, ProviderResult};
use crate::domain::id_mapping::IdMapper;
use crate::domain::methods::RpcMethod;
use crate::domain::types::{JsonRpcResponse, ProviderEvent, RpcOutcome, RpcPayload, RpcRequest};
use crate::ports::inbound::SiblingContext;
use crate::ports::outbound::{
    ensure_success, Eip712Hasher, HostSink, TypedDataHasher, UpstreamTransport,
};
use crate::router::{self, ProviderState, Route};
use futures::future::join_all;
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use wb_telemetry::{log_event, log_rpc_event};

/// Capacity of the event broadcast channel
const EVENT_CAPACITY: usize = 64;

/// `subsystem` field on provider log lines
const SUBSYSTEM: &str = "provider";

/// Builder for [`Provider`].
pub struct ProviderBuilder {
    config: ProviderConfig,
    sink: Arc<dyn HostSink>,
    transport: Option<Arc<dyn UpstreamTransport>>,
    hasher: Option<Arc<dyn TypedDataHasher>>,
    directory: Option<Arc<ProviderDirectory>>,
}

impl ProviderBuilder {
    /// Upstream transport (defaults to [`HttpTransport`])
    pub fn transport(mut self, transport: Arc<dyn UpstreamTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Typed-data hasher (defaults to [`Eip712Hasher`])
    pub fn hasher(mut self, hasher: Arc<dyn TypedDataHasher>) -> Self {
        self.hasher = Some(hasher);
        self
    }

    /// Join an existing directory so sibling providers can reconcile
    /// responses with this one. Defaults to a private directory.
    pub fn directory(mut self, directory: Arc<ProviderDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn build(self) -> Result<Provider, BridgeError> {
        self.config.validate()?;

        let directory = self
            .directory
            .unwrap_or_else(|| Arc::new(ProviderDirectory::new()));
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(HttpTransport::new()));
        let hasher = self.hasher.unwrap_or_else(|| Arc::new(Eip712Hasher));
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let config = self.config;
        let sink = self.sink;

        let core = Arc::new_cyclic(|weak: &Weak<ProviderCore>| {
            let sibling: Weak<dyn SiblingContext> = weak.clone();
            let context = directory.attach(&config.marker, sibling);

            ProviderCore {
                context,
                marker: config.marker.clone(),
                state: RwLock::new(ProviderState::new(&config.address, config.chain_id)),
                rpc_url: RwLock::new(config.rpc_url.clone()),
                debug: config.debug,
                request_timeout: config.request_timeout(),
                ids: IdMapper::new(directory.sequence()),
                pending: PendingCallRegistry::new(),
                host: HostChannel::new(sink),
                transport,
                hasher,
                directory: Arc::clone(&directory),
                events,
            }
        });

        info!(
            context = core.context,
            marker = %core.marker,
            chain_id = config.chain_id,
            ready = core.state.read().is_ready(),
            "Provider attached"
        );

        Ok(Provider { core })
    }
}

/// Page-facing Ethereum provider.
///
/// Cheap to clone; clones share one instance. The instance detaches from
/// its directory when the last clone is dropped.
#[derive(Clone)]
pub struct Provider {
    core: Arc<ProviderCore>,
}

impl Provider {
    pub fn builder(config: ProviderConfig, sink: Arc<dyn HostSink>) -> ProviderBuilder {
        ProviderBuilder {
            config,
            sink,
            transport: None,
            hasher: None,
            directory: None,
        }
    }

    /// Provider with a private directory and the HTTP transport.
    pub fn new(config: ProviderConfig, sink: Arc<dyn HostSink>) -> Result<Self, BridgeError> {
        Self::builder(config, sink).build()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // REQUEST SURFACE
    // ═══════════════════════════════════════════════════════════════════════

    /// EIP-1193 `request`: resolves to the bare result.
    pub async fn request(&self, request: RpcRequest) -> ProviderResult<Value> {
        self.core.dispatch(request, false).await
    }

    /// Legacy `sendAsync`: resolves to `{jsonrpc, id, result}` envelopes.
    ///
    /// Batch members are dispatched concurrently; outcomes keep request order.
    pub async fn send_async(&self, payload: RpcPayload) -> RpcOutcome {
        match payload {
            RpcPayload::Single(request) => {
                RpcOutcome::Single(self.core.dispatch(request, true).await)
            }
            RpcPayload::Batch(requests) => {
                let calls = requests
                    .into_iter()
                    .map(|request| self.core.dispatch(request, true));
                RpcOutcome::Batch(join_all(calls).await)
            }
        }
    }

    /// Legacy synchronous `send`. Only the locally answered methods work.
    pub fn send(&self, request: RpcRequest) -> ProviderResult<JsonRpcResponse> {
        if !RpcMethod::parse(&request.method).is_local() {
            return Err(ProviderError::unsupported_sync(&request.method));
        }

        let state = self.core.state.read().clone();
        match router::route(&request, &state, self.core.hasher.as_ref())? {
            Route::Local(result) => Ok(JsonRpcResponse::success(
                request.id.unwrap_or(Value::Null),
                result,
            )),
            _ => Err(ProviderError::unsupported_sync(&request.method)),
        }
    }

    /// Ask the host for accounts (`eth_requestAccounts`).
    pub async fn enable(&self) -> ProviderResult<Value> {
        self.request(RpcRequest::new("eth_requestAccounts", json!([])))
            .await
    }

    // ═══════════════════════════════════════════════════════════════════════
    // HOST INBOUND
    // ═══════════════════════════════════════════════════════════════════════

    /// Host delivered a result for internal id `id`.
    pub fn deliver_result(&self, id: u64, result: Value) {
        if self.core.debug {
            log_event!(info, SUBSYSTEM, "<== host result", id = id, result = %result);
        }
        self.core.resolve(id, result);
    }

    /// Host delivered an error for internal id `id`.
    pub fn deliver_error(&self, id: u64, error: Value) {
        if self.core.debug {
            log_event!(info, SUBSYSTEM, "<== host error", id = id, error = %error);
        }
        self.core.reject(id, ProviderError::from_host(error));
    }

    /// Parse a raw `{id, result}` / `{id, error}` reply and deliver it.
    pub fn handle_host_message(&self, raw: &str) -> Result<(), BridgeError> {
        match HostReply::parse(raw)? {
            HostReply::Result { id, result } => self.deliver_result(id, result),
            HostReply::Error { id, error } => self.deliver_error(id, error),
        }
        Ok(())
    }

    /// Out-of-band event from the host.
    ///
    /// A string message is parsed as JSON when possible and passed through
    /// raw otherwise.
    pub fn remote_emit(&self, event: &str, message: Value) {
        let payload = match message {
            Value::String(raw) => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
            other => other,
        };
        self.core.emit(event, payload);
    }

    /// Emit `connect` with the hex chain id.
    pub fn emit_connect(&self) {
        let chain_id = self.core.state.read().chain_id_hex();
        self.core.emit("connect", json!({ "chainId": chain_id }));
    }

    // ═══════════════════════════════════════════════════════════════════════
    // CONFIGURATION
    // ═══════════════════════════════════════════════════════════════════════

    /// Set the selected address here and in every sibling context.
    pub fn set_address(&self, address: &str) -> Result<(), ConfigError> {
        if !is_valid_address(address) {
            return Err(ConfigError::InvalidAddress(address.to_string()));
        }
        let address = address.to_lowercase();
        self.core.apply_address(&address);
        let updated = self
            .core
            .directory
            .propagate_address(self.core.context, &self.core.marker, &address);
        debug!(context = self.core.context, siblings = updated, "Propagated address");
        Ok(())
    }

    /// Switch chains; emits `chainChanged` when the id changes.
    pub fn set_chain_id(&self, chain_id: u64) -> Result<(), ConfigError> {
        if chain_id == 0 {
            return Err(ConfigError::InvalidChainId);
        }
        let changed = {
            let mut state = self.core.state.write();
            let changed = state.chain_id != chain_id;
            state.chain_id = chain_id;
            changed
        };
        if changed {
            self.core
                .emit("chainChanged", json!(format!("0x{:x}", chain_id)));
        }
        Ok(())
    }

    /// Apply a partial configuration update.
    ///
    /// Everything is validated before anything is applied.
    pub fn set_config(&self, update: ConfigUpdate) -> Result<(), ConfigError> {
        if let Some(address) = &update.address {
            if !is_valid_address(address) {
                return Err(ConfigError::InvalidAddress(address.clone()));
            }
        }
        if update.chain_id == Some(0) {
            return Err(ConfigError::InvalidChainId);
        }
        if matches!(&update.rpc_url, Some(url) if url.trim().is_empty()) {
            return Err(ConfigError::MissingRpcUrl);
        }

        if let Some(rpc_url) = update.rpc_url {
            *self.core.rpc_url.write() = rpc_url;
        }
        if let Some(chain_id) = update.chain_id {
            self.set_chain_id(chain_id)?;
        }
        if let Some(address) = update.address {
            self.set_address(&address)?;
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // ACCESSORS
    // ═══════════════════════════════════════════════════════════════════════

    pub fn address(&self) -> String {
        self.core.state.read().address.clone()
    }

    pub fn chain_id(&self) -> u64 {
        self.core.state.read().chain_id
    }

    pub fn rpc_url(&self) -> String {
        self.core.rpc_url.read().clone()
    }

    pub fn is_ready(&self) -> bool {
        self.core.state.read().is_ready()
    }

    /// The bridge is always connected to its host.
    pub fn is_connected(&self) -> bool {
        true
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.core.events.subscribe()
    }

    pub fn pending_count(&self) -> usize {
        self.core.pending.pending_count()
    }

    pub fn stats(&self) -> PendingStatsSnapshot {
        self.core.pending.stats().snapshot()
    }

    pub fn context_id(&self) -> ContextId {
        self.core.context
    }

    pub fn marker(&self) -> &str {
        &self.core.marker
    }
}

struct ProviderCore {
    context: ContextId,
    marker: String,
    state: RwLock<ProviderState>,
    rpc_url: RwLock<String>,
    debug: bool,
    request_timeout: Option<Duration>,
    ids: IdMapper,
    pending: PendingCallRegistry,
    host: HostChannel,
    transport: Arc<dyn UpstreamTransport>,
    hasher: Arc<dyn TypedDataHasher>,
    directory: Arc<ProviderDirectory>,
    events: broadcast::Sender<ProviderEvent>,
}

impl ProviderCore {
    async fn dispatch(&self, mut request: RpcRequest, wrap: bool) -> ProviderResult<Value> {
        let id = self.ids.try_intify_id(&mut request);

        if self.debug {
            log_rpc_event!(
                info,
                SUBSYSTEM,
                "==> request",
                id,
                request.method,
                params = %request.params
            );
        }

        let state = self.state.read().clone();
        let route = match router::route(&request, &state, self.hasher.as_ref()) {
            Ok(Route::Unsupported) => {
                self.ids.try_pop_id(id);
                return Err(ProviderError::unsupported_method(&request.method));
            }
            Ok(route) => route,
            Err(e) => {
                self.ids.try_pop_id(id);
                return Err(e);
            }
        };

        let rx = self.pending.register(id, &request.method, wrap);

        let upstream = match route {
            Route::Local(result) => {
                self.resolve(id, result);
                false
            }
            Route::Host { handler, object } => {
                if let Err(e) = self.host.send(handler, id, object, state.is_ready()) {
                    self.reject(id, e);
                }
                false
            }
            Route::Upstream => true,
            Route::Unsupported => false,
        };

        let completion = async {
            if upstream {
                self.forward_upstream(id, &request).await;
            }
            Self::settled(rx).await
        };

        match self.request_timeout {
            None => completion.await,
            Some(limit) => match tokio::time::timeout(limit, completion).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    self.pending.expire(id);
                    self.ids.try_pop_id(id);
                    Err(ProviderError::timeout(
                        &request.method,
                        limit.as_millis() as u64,
                    ))
                }
            },
        }
    }

    async fn settled(rx: Completion) -> ProviderResult<Value> {
        rx.await
            .unwrap_or_else(|_| Err(ProviderError::internal("response channel closed")))
    }

    async fn forward_upstream(&self, id: u64, request: &RpcRequest) {
        let endpoint = self.rpc_url.read().clone();
        match self
            .transport
            .call(&endpoint, request)
            .await
            .and_then(ensure_success)
        {
            Ok(response) => self.resolve(id, response.into_value()),
            Err(e) => {
                warn!(id = id, method = %request.method, error = %e, "Upstream call failed");
                self.reject(id, e.into());
            }
        }
    }

    /// Local registry first, then siblings; unclaimed results are dropped.
    fn resolve(&self, id: u64, result: Value) {
        if self.settle_result(id, result.clone()) {
            return;
        }
        if self
            .directory
            .delegate_resolve(self.context, &self.marker, id, &result)
        {
            self.pending.stats().record_delegated();
            return;
        }
        self.pending.stats().record_dropped();
        warn!(id = id, context = self.context, "Dropping result for unknown request id");
    }

    /// Same policy as [`ProviderCore::resolve`].
    fn reject(&self, id: u64, error: ProviderError) {
        if self.settle_error(id, error.clone()) {
            return;
        }
        if self
            .directory
            .delegate_reject(self.context, &self.marker, id, &error)
        {
            self.pending.stats().record_delegated();
            return;
        }
        self.pending.stats().record_dropped();
        warn!(
            id = id,
            context = self.context,
            error = %error,
            "Dropping error for unknown request id"
        );
    }

    fn settle_result(&self, id: u64, result: Value) -> bool {
        self.pending.resolve(id, || self.ids.restore(id), result)
    }

    fn settle_error(&self, id: u64, error: ProviderError) -> bool {
        let settled = self.pending.reject(id, error);
        if settled {
            self.ids.try_pop_id(id);
        }
        settled
    }

    fn emit(&self, event: &str, payload: Value) {
        debug!(event = event, "Emitting provider event");
        // no subscribers is fine
        let _ = self.events.send(ProviderEvent {
            event: event.to_string(),
            payload,
        });
    }
}

impl SiblingContext for ProviderCore {
    fn resolve_local(&self, id: u64, result: &Value) -> bool {
        self.pending.contains(id) && self.settle_result(id, result.clone())
    }

    fn reject_local(&self, id: u64, error: &ProviderError) -> bool {
        self.pending.contains(id) && self.settle_error(id, error.clone())
    }

    fn apply_address(&self, address: &str) {
        let changed = {
            let mut state = self.state.write();
            let changed = state.address != address;
            state.address = address.to_string();
            changed
        };
        if changed {
            let accounts = if address.is_empty() {
                json!([])
            } else {
                json!([address])
            };
            self.emit("accountsChanged", accounts);
        }
    }
}

impl Drop for ProviderCore {
    fn drop(&mut self) {
        self.directory.detach(self.context);
    }
}
