//! Identifier mapping between caller ids and internal request ids.
//!
//! Callers may use strings, nulls, or no id at all, and concurrently open
//! requests may collide. Host and upstream traffic only ever sees internal
//! integer ids; the caller's id is restored when the response arrives.

use crate::domain::types::RpcRequest;
use dashmap::{DashMap, DashSet};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Largest integer a page script can represent exactly (2^53 - 1).
pub const MAX_SAFE_ID: u64 = (1 << 53) - 1;

/// Strictly increasing internal id source.
///
/// Seeded from wall-clock milliseconds so ids from separate page loads do
/// not restart at the same value. Shared by every provider attached to the
/// same directory, together with the set of ids currently in flight: an id
/// is never handed out while a call holding it is outstanding.
#[derive(Debug)]
pub struct IdSequence {
    next: AtomicU64,
    in_flight: DashSet<u64>,
}

impl IdSequence {
    pub fn new() -> Self {
        let seed = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(1);
        Self::starting_at(seed)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first.clamp(1, MAX_SAFE_ID)),
            in_flight: DashSet::new(),
        }
    }

    /// Allocate and reserve the next free id, skipping ids still in flight.
    pub fn next_id(&self) -> u64 {
        loop {
            let id = self.next.fetch_add(1, Ordering::Relaxed);
            if self.in_flight.insert(id) {
                return id;
            }
            debug!(id = id, "Skipped internal id still in flight");
        }
    }

    /// Reserve a caller-chosen id. False if it is already in flight.
    pub fn claim(&self, id: u64) -> bool {
        self.in_flight.insert(id)
    }

    /// Return an id to the pool once its call has completed.
    pub fn release(&self, id: u64) {
        self.in_flight.remove(&id);
    }

    /// Number of ids currently reserved.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Peek the value the next allocation will start from.
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}

impl Default for IdSequence {
    fn default() -> Self {
        Self::new()
    }
}

/// Rewrites caller ids to internal ids and restores them exactly once.
#[derive(Debug)]
pub struct IdMapper {
    sequence: Arc<IdSequence>,
    originals: DashMap<u64, Value>,
}

impl IdMapper {
    pub fn new(sequence: Arc<IdSequence>) -> Self {
        Self {
            sequence,
            originals: DashMap::new(),
        }
    }

    /// Ensure `payload.id` is a plain non-negative integer that no other
    /// outstanding call holds.
    ///
    /// A free integer id is kept as-is and reserved. Anything else (string,
    /// null, float, negative, absent, or an integer already in flight) is
    /// replaced by a fresh internal id and the original is recorded for
    /// [`IdMapper::try_pop_id`]. Returns the id now on the payload.
    pub fn try_intify_id(&self, payload: &mut RpcRequest) -> u64 {
        if let Some(id) = payload.internal_id() {
            if self.sequence.claim(id) {
                return id;
            }
            warn!(id = id, method = %payload.method, "Caller id already in flight, remapping");
        }

        let internal = self.sequence.next_id();
        let original = payload.id.take().unwrap_or(Value::Null);
        debug!(id = internal, original = %original, "Remapped request id");
        self.originals.insert(internal, original);
        payload.id = Some(Value::from(internal));
        internal
    }

    /// Release `id` and return the caller id recorded for it, if any.
    pub fn try_pop_id(&self, id: u64) -> Option<Value> {
        self.sequence.release(id);
        self.originals.remove(&id).map(|(_, original)| original)
    }

    /// Caller id for `id`: the recorded original, or `id` itself.
    pub fn restore(&self, id: u64) -> Value {
        self.try_pop_id(id).unwrap_or_else(|| Value::from(id))
    }

    /// Number of remapped ids still awaiting a response.
    pub fn len(&self) -> usize {
        self.originals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.originals.is_empty()
    }
}
