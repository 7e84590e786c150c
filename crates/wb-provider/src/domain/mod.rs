//! Domain types for the provider bridge.
//!
//! Configuration, wire types, method classification, id mapping and the
//! pure encoders (message bytes, EIP-712). Async bookkeeping lives in the
//! adapters layer.

pub mod config;
pub mod error;
pub mod id_mapping;
pub mod message;
pub mod methods;
pub mod typed_data;
pub mod types;

// Re-exports for convenience
pub use config::{ConfigError, ConfigUpdate, ProviderConfig, DEFAULT_MARKER};
pub use error::{codes, BridgeError, ProviderError, ProviderResult};
pub use id_mapping::{IdMapper, IdSequence, MAX_SAFE_ID};
pub use methods::{HostHandler, MethodKind, RpcMethod, TypedDataVersion};
pub use typed_data::{TypedData, TypedDataError};
pub use types::*;
