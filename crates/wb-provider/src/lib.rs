//! Web3 Bridge Provider - in-page Ethereum JSON-RPC provider backed by a wallet host.
//!
//! Page scripts talk EIP-1193 to a [`Provider`]. Signing and account
//! methods are posted to a native wallet host over a string message
//! channel, chain reads go to an upstream JSON-RPC node, and a handful of
//! methods are answered from provider state.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                         PROVIDER (per context)                        │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │   request / send_async / send                                        │
//! │            │                                                          │
//! │   ┌────────┴────────┐      ┌─────────────────────────┐               │
//! │   │    IdMapper     │──────│ IdSequence (shared by   │               │
//! │   │ caller id → u64 │      │ the whole directory)    │               │
//! │   └────────┬────────┘      └─────────────────────────┘               │
//! │            │                                                          │
//! │   ┌────────┴────────┐                                                 │
//! │   │     Router      │  Local │ Host │ Upstream │ Unsupported          │
//! │   └──┬─────┬─────┬──┘                                                 │
//! │      │     │     └──────────────► UpstreamTransport (HTTP)            │
//! │      │     └────────────────────► HostChannel ──► HostSink            │
//! │      ▼                                                                │
//! │   ┌─────────────────────┐   deliver_result / deliver_error           │
//! │   │ PendingCallRegistry │◄──────────────────────────── host replies  │
//! │   └──────────┬──────────┘                                             │
//! └──────────────┼────────────────────────────────────────────────────────┘
//!                │ unclaimed id
//!                ▼
//!       ProviderDirectory ──► sibling providers (same marker)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use wb_provider::{ChannelSink, Provider, ProviderConfig, RpcRequest};
//!
//! let (sink, mut host_rx) = ChannelSink::new();
//! let provider = Provider::new(ProviderConfig::new("", 1, "https://rpc"), Arc::new(sink))?;
//! let chain = provider.request(RpcRequest::new("eth_chainId", json!([]))).await?;
//! ```
//!
//! # Error codes
//!
//! - **4100**: host-bound call before an address is set
//! - **4200**: filters and subscriptions, and legacy sync `send` misuse
//! - **-32006**: optional per-request deadline expired

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod router;
pub mod service;

// Re-exports for public API
pub use adapters::{ChannelSink, HostReply, HttpTransport, ProviderDirectory};
pub use domain::config::{ConfigError, ConfigUpdate, ProviderConfig};
pub use domain::error::{codes, BridgeError, ProviderError, ProviderResult};
pub use domain::methods::{HostHandler, MethodKind, RpcMethod, TypedDataVersion};
pub use domain::types::*;
pub use ports::{HostSink, HostSinkError, TransportError, TypedDataHasher, UpstreamTransport};
pub use service::{Provider, ProviderBuilder};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
