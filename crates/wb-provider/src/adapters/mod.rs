//! Adapters for the provider bridge.
//!
//! Async bookkeeping and the concrete channel, directory and transport
//! implementations.

pub mod directory;
pub mod host;
pub mod http;
pub mod pending;

pub use directory::{ContextId, ProviderDirectory};
pub use host::{ChannelSink, HostChannel, HostReply};
pub use http::HttpTransport;
pub use pending::{
    shape_result, wrap_result, PendingCallRegistry, PendingStats, PendingStatsSnapshot,
};
