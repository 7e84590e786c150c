//! Inbound port: what one provider instance exposes to its siblings.
//!
//! Sibling providers live in other execution contexts (frames) and share
//! the host message channel. A sibling may only settle calls it owns or
//! receive an address update; it never touches another instance's
//! counters or maps directly.

use crate::domain::error::ProviderError;
use serde_json::Value;

pub trait SiblingContext: Send + Sync {
    /// Resolve `id` if this instance registered it. Never re-delegates.
    fn resolve_local(&self, id: u64, result: &Value) -> bool;

    /// Reject `id` if this instance registered it. Never re-delegates.
    fn reject_local(&self, id: u64, error: &ProviderError) -> bool;

    /// Apply a lowercased address (and the readiness it implies).
    fn apply_address(&self, address: &str);
}
