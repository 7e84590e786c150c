//! HTTP upstream transport.

use crate::domain::types::{JsonRpcResponse, RpcRequest};
use crate::ports::outbound::{ensure_success, TransportError, UpstreamTransport};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error};

/// JSON-RPC over HTTP POST
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Use a preconfigured client (timeouts, proxies, TLS).
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UpstreamTransport for HttpTransport {
    async fn call(
        &self,
        endpoint: &str,
        request: &RpcRequest,
    ) -> Result<JsonRpcResponse, TransportError> {
        debug!(endpoint = endpoint, method = %request.method, "Forwarding request upstream");

        let response = self
            .client
            .post(endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Upstream node error");
            return Err(TransportError::Http(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let envelope: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))?;

        ensure_success(envelope)
    }
}
