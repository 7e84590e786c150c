//! Host channel: outbound `{id, name, object}` messages and inbound replies.

use crate::domain::error::{BridgeError, ProviderError, ProviderResult};
use crate::domain::methods::HostHandler;
use crate::domain::types::HostMessage;
use crate::ports::outbound::{HostSink, HostSinkError};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Send side of the host message channel.
pub struct HostChannel {
    sink: Arc<dyn HostSink>,
}

impl HostChannel {
    pub fn new(sink: Arc<dyn HostSink>) -> Self {
        Self { sink }
    }

    /// Post a message to the host.
    ///
    /// Fails with the not-ready error unless `ready` is set or the handler
    /// is `requestAccounts`. Completion arrives later through the inbound path.
    pub fn send(
        &self,
        handler: HostHandler,
        id: u64,
        object: Value,
        ready: bool,
    ) -> ProviderResult<()> {
        if !ready && !handler.allowed_before_ready() {
            debug!(id = id, handler = %handler, "Host call before ready");
            return Err(ProviderError::not_ready());
        }

        let message = serde_json::to_string(&HostMessage {
            id,
            name: handler,
            object,
        })?;
        self.sink.post(message)?;

        debug!(id = id, handler = %handler, "Posted host message");
        Ok(())
    }
}

/// [`HostSink`] backed by an unbounded tokio channel.
///
/// The receiving half stands in for the native host's message handler.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl HostSink for ChannelSink {
    fn post(&self, message: String) -> Result<(), HostSinkError> {
        self.tx.send(message).map_err(|_| HostSinkError::ChannelClosed)
    }
}

/// Reply from the host: `{id, result}` or `{id, error}`.
#[derive(Debug, Clone, PartialEq)]
pub enum HostReply {
    Result { id: u64, result: Value },
    Error { id: u64, error: Value },
}

impl HostReply {
    /// Parse a raw host reply. `id` may be a number or a numeric string.
    pub fn parse(raw: &str) -> Result<Self, BridgeError> {
        let value: Value = serde_json::from_str(raw)?;
        let object = value
            .as_object()
            .ok_or_else(|| BridgeError::InvalidHostMessage("expected an object".into()))?;

        let id = match object.get("id") {
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.parse().ok(),
            _ => None,
        }
        .ok_or_else(|| BridgeError::InvalidHostMessage("missing or non-integer id".into()))?;

        match (object.get("error"), object.get("result")) {
            (Some(error), _) if !error.is_null() => Ok(HostReply::Error {
                id,
                error: error.clone(),
            }),
            (_, Some(result)) => Ok(HostReply::Result {
                id,
                result: result.clone(),
            }),
            _ => Err(BridgeError::InvalidHostMessage(format!(
                "reply {} has neither result nor error",
                id
            ))),
        }
    }

    pub fn id(&self) -> u64 {
        match self {
            HostReply::Result { id, .. } | HostReply::Error { id, .. } => *id,
        }
    }
}
