//! HTTP transport for remote control calls.
//!
//! [`RpcTransport`] is the seam between request building and the network.
//! [`HttpTransport`] is the production implementation on top of `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::error::Result;
use crate::protocol::RpcRequest;

/// Status and body of an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: String,
}

impl TransportResponse {
    /// Creates a new response.
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns `true` for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Posts a JSON-RPC request and returns the raw HTTP response.
///
/// Implementations report failures to obtain any response at all as
/// [`crate::LimeSurveyError::Transport`]; non-2xx responses are returned as
/// values and classified by the client.
#[async_trait]
pub trait RpcTransport: Send + Sync + std::fmt::Debug {
    /// Sends `request` as `application/json` to `url` with the given timeout.
    async fn post_json(
        &self,
        url: &str,
        request: &RpcRequest,
        timeout: Duration,
    ) -> Result<TransportResponse>;
}

/// `reqwest` backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport with a fresh connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`crate::LimeSurveyError::Transport`] if the TLS backend
    /// cannot be initialised.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client })
    }

    /// Creates a transport sharing an existing `reqwest` client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    #[instrument(skip(self, request), fields(method = %request.method))]
    async fn post_json(
        &self,
        url: &str,
        request: &RpcRequest,
        timeout: Duration,
    ) -> Result<TransportResponse> {
        let response = self
            .client
            .post(url)
            .timeout(timeout)
            .json(request)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(status, bytes = body.len(), "LimeSurvey responded");

        Ok(TransportResponse { status, body })
    }
}
