//! Ports for the provider bridge.

pub mod inbound;
pub mod outbound;

pub use inbound::SiblingContext;
pub use outbound::{
    ensure_success, Eip712Hasher, HostSink, HostSinkError, TransportError, TypedDataHasher,
    UpstreamTransport,
};
