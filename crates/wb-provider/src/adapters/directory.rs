//! Directory of provider instances across execution contexts.
//!
//! Providers attach themselves under their identity marker. A response that
//! no local registry claims is offered to every sibling with the same
//! marker, and address changes are pushed to the same set.

use crate::domain::error::ProviderError;
use crate::domain::id_mapping::IdSequence;
use crate::ports::inbound::SiblingContext;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

/// Opaque handle of an attached provider
pub type ContextId = u64;

struct DirectoryEntry {
    context: ContextId,
    marker: String,
    provider: Weak<dyn SiblingContext>,
}

/// Shared directory handle, passed to every provider at construction.
pub struct ProviderDirectory {
    entries: RwLock<Vec<DirectoryEntry>>,
    next_context: AtomicU64,
    sequence: Arc<IdSequence>,
}

impl ProviderDirectory {
    pub fn new() -> Self {
        Self::with_sequence(Arc::new(IdSequence::new()))
    }

    /// Directory whose providers draw ids from `sequence`.
    pub fn with_sequence(sequence: Arc<IdSequence>) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            next_context: AtomicU64::new(1),
            sequence,
        }
    }

    /// Id source shared by all attached providers.
    pub fn sequence(&self) -> Arc<IdSequence> {
        Arc::clone(&self.sequence)
    }

    pub fn attach(&self, marker: &str, provider: Weak<dyn SiblingContext>) -> ContextId {
        let context = self.next_context.fetch_add(1, Ordering::Relaxed);
        self.entries.write().push(DirectoryEntry {
            context,
            marker: marker.to_string(),
            provider,
        });
        debug!(context = context, marker = marker, "Attached provider context");
        context
    }

    pub fn detach(&self, context: ContextId) {
        self.entries.write().retain(|e| e.context != context);
        debug!(context = context, "Detached provider context");
    }

    /// Live providers sharing `marker`, excluding `from`.
    pub fn siblings(&self, from: ContextId, marker: &str) -> Vec<Arc<dyn SiblingContext>> {
        self.entries
            .read()
            .iter()
            .filter(|e| e.context != from && e.marker == marker)
            .filter_map(|e| e.provider.upgrade())
            .collect()
    }

    /// Offer a result to siblings. Returns true if one owned the id.
    pub fn delegate_resolve(&self, from: ContextId, marker: &str, id: u64, result: &Value) -> bool {
        let claimed = self
            .siblings(from, marker)
            .iter()
            .any(|sibling| sibling.resolve_local(id, result));
        if claimed {
            debug!(id = id, from = from, "Result delegated to sibling context");
        }
        claimed
    }

    /// Offer an error to siblings. Returns true if one owned the id.
    pub fn delegate_reject(
        &self,
        from: ContextId,
        marker: &str,
        id: u64,
        error: &ProviderError,
    ) -> bool {
        let claimed = self
            .siblings(from, marker)
            .iter()
            .any(|sibling| sibling.reject_local(id, error));
        if claimed {
            debug!(id = id, from = from, "Error delegated to sibling context");
        }
        claimed
    }

    /// Push an address to every sibling. Returns how many were updated.
    pub fn propagate_address(&self, from: ContextId, marker: &str, address: &str) -> usize {
        let siblings = self.siblings(from, marker);
        for sibling in &siblings {
            sibling.apply_address(address);
        }
        siblings.len()
    }

    /// Number of attached contexts, live or not yet detached.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for ProviderDirectory {
    fn default() -> Self {
        Self::new()
    }
}
