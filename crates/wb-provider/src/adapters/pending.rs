//! Pending-call registry.
//!
//! Maps internal request ids to the oneshot channel the caller is awaiting,
//! together with the caller's wrap-result preference.

use crate::domain::error::{ProviderError, ProviderResult};
use crate::domain::types::JsonRpcResponse;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Completion channel handed to the caller
pub type Completion = oneshot::Receiver<ProviderResult<Value>>;

/// A call waiting for its host or upstream response
struct PendingCall {
    /// Channel to deliver the outcome
    sender: oneshot::Sender<ProviderResult<Value>>,
    /// Deliver a `{jsonrpc, id, result}` envelope instead of the bare value
    wrap: bool,
    /// Method name (for logging)
    method: String,
    /// When the call was registered
    created_at: Instant,
}

/// Statistics for the pending-call registry
#[derive(Debug, Default)]
pub struct PendingStats {
    /// Total calls registered
    pub total_registered: AtomicU64,
    /// Total calls resolved with a result
    pub total_resolved: AtomicU64,
    /// Total calls rejected with an error
    pub total_rejected: AtomicU64,
    /// Total responses handed to a sibling provider
    pub total_delegated: AtomicU64,
    /// Total responses no provider claimed
    pub total_dropped: AtomicU64,
    /// Total calls abandoned by their deadline
    pub total_timeouts: AtomicU64,
}

impl PendingStats {
    pub fn record_delegated(&self) {
        self.total_delegated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.total_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PendingStatsSnapshot {
        PendingStatsSnapshot {
            registered: self.total_registered.load(Ordering::Relaxed),
            resolved: self.total_resolved.load(Ordering::Relaxed),
            rejected: self.total_rejected.load(Ordering::Relaxed),
            delegated: self.total_delegated.load(Ordering::Relaxed),
            dropped: self.total_dropped.load(Ordering::Relaxed),
            timeouts: self.total_timeouts.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`PendingStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingStatsSnapshot {
    pub registered: u64,
    pub resolved: u64,
    pub rejected: u64,
    pub delegated: u64,
    pub dropped: u64,
    pub timeouts: u64,
}

/// Pending-call registry.
///
/// Flow:
/// 1. The provider rewrites the request id and calls `register()`
/// 2. The request goes to the host, the upstream node, or is answered locally
/// 3. The inbound path calls `resolve()` / `reject()` with the internal id
/// 4. The caller's receiver yields the shaped outcome
///
/// Each call is removed exactly once; later lookups are no-ops.
pub struct PendingCallRegistry {
    pending: DashMap<u64, PendingCall>,
    stats: Arc<PendingStats>,
}

impl PendingCallRegistry {
    pub fn new() -> Self {
        Self {
            pending: DashMap::new(),
            stats: Arc::new(PendingStats::default()),
        }
    }

    /// Register a call and get the receiver for its outcome.
    ///
    /// Overwrites any call already registered under `id`.
    pub fn register(&self, id: u64, method: &str, wrap: bool) -> Completion {
        let (tx, rx) = oneshot::channel();

        let call = PendingCall {
            sender: tx,
            wrap,
            method: method.to_string(),
            created_at: Instant::now(),
        };

        if self.pending.insert(id, call).is_some() {
            warn!(id = id, method = method, "Replaced pending call with reused id");
        }
        self.stats.total_registered.fetch_add(1, Ordering::Relaxed);

        debug!(id = id, method = method, wrap = wrap, "Registered pending call");

        rx
    }

    /// Resolve a call with a host or upstream result.
    ///
    /// `original_id` is only evaluated once the call has been claimed, so the
    /// id mapping is popped exactly once. Returns true once the call is
    /// claimed, even if its caller has stopped waiting, so the response is
    /// never offered elsewhere.
    pub fn resolve<F>(&self, id: u64, original_id: F, result: Value) -> bool
    where
        F: FnOnce() -> Value,
    {
        let Some((_, call)) = self.pending.remove(&id) else {
            return false;
        };

        let shaped = shape_result(result);
        let value = if call.wrap {
            wrap_result(original_id(), shaped)
        } else {
            // still pop the mapping so it does not outlive the call
            original_id();
            shaped
        };

        if Self::deliver(id, call, Ok(value)) {
            self.stats.total_resolved.fetch_add(1, Ordering::Relaxed);
        }
        true
    }

    /// Reject a call. Returns false if no call is registered under `id`.
    ///
    /// Same claim semantics as [`PendingCallRegistry::resolve`].
    pub fn reject(&self, id: u64, error: ProviderError) -> bool {
        let Some((_, call)) = self.pending.remove(&id) else {
            return false;
        };

        if Self::deliver(id, call, Err(error)) {
            self.stats.total_rejected.fetch_add(1, Ordering::Relaxed);
        }
        true
    }

    /// Drop a call whose caller stopped waiting for it.
    pub fn expire(&self, id: u64) -> bool {
        if let Some((_, call)) = self.pending.remove(&id) {
            self.stats.total_timeouts.fetch_add(1, Ordering::Relaxed);
            warn!(
                id = id,
                method = call.method,
                elapsed_ms = call.created_at.elapsed().as_millis(),
                "Pending call expired"
            );
            true
        } else {
            false
        }
    }

    fn deliver(id: u64, call: PendingCall, outcome: ProviderResult<Value>) -> bool {
        let ok = outcome.is_ok();
        match call.sender.send(outcome) {
            Ok(()) => {
                debug!(
                    id = id,
                    method = call.method,
                    ok = ok,
                    response_time_ms = call.created_at.elapsed().as_millis(),
                    "Completed pending call"
                );
                true
            }
            Err(_) => {
                // caller dropped its future
                debug!(id = id, method = call.method, "Pending call receiver dropped");
                false
            }
        }
    }

    /// Check if an id is pending
    pub fn contains(&self, id: u64) -> bool {
        self.pending.contains_key(&id)
    }

    /// Get number of currently pending calls
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Get statistics
    pub fn stats(&self) -> &PendingStats {
        &self.stats
    }
}

impl Default for PendingCallRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize a raw result before delivery.
///
/// - a `{jsonrpc, result}` envelope is unwrapped to its `result`
/// - a string holding valid JSON is parsed
/// - anything else is used verbatim
pub fn shape_result(result: Value) -> Value {
    match result {
        Value::Object(mut map) if map.contains_key("jsonrpc") && map.contains_key("result") => {
            map.remove("result").unwrap_or(Value::Null)
        }
        Value::String(raw) => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
        other => other,
    }
}

/// `{jsonrpc: "2.0", id, result}` envelope
pub fn wrap_result(id: Value, result: Value) -> Value {
    JsonRpcResponse::success(id, result).into_value()
}
