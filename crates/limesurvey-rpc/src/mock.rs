//! Scripted in-memory transport for tests.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::Result;
use crate::protocol::RpcRequest;
use crate::transport::{RpcTransport, TransportResponse};

type Responder = Box<dyn Fn(&RpcRequest) -> TransportResponse + Send + Sync>;

/// A request seen by [`MockTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// Endpoint the request was posted to.
    pub url: String,
    /// The request envelope.
    pub request: RpcRequest,
    /// Timeout the client asked for.
    pub timeout: Duration,
}

/// Transport that answers through a closure and records every request.
pub struct MockTransport {
    responder: Responder,
    calls: Mutex<Vec<RecordedCall>>,
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("calls", &self.calls().len())
            .finish_non_exhaustive()
    }
}

impl MockTransport {
    /// Creates a transport answering every request with `responder`.
    pub fn new(responder: impl Fn(&RpcRequest) -> TransportResponse + Send + Sync + 'static) -> Self {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Builds a 200 response wrapping `result` in a JSON-RPC envelope.
    #[must_use]
    pub fn result(result: Value) -> TransportResponse {
        TransportResponse::new(200, json!({ "id": 1, "result": result, "error": null }).to_string())
    }

    /// Builds a 200 response reporting `status` inline.
    #[must_use]
    pub fn status(status: &str) -> TransportResponse {
        Self::result(json!({ "status": status }))
    }

    /// Returns every recorded call in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the recorded requests for `method`.
    #[must_use]
    pub fn requests_for(&self, method: &str) -> Vec<RpcRequest> {
        self.calls()
            .into_iter()
            .filter(|call| call.request.method == method)
            .map(|call| call.request)
            .collect()
    }

    /// Returns how many times `method` was called.
    #[must_use]
    pub fn count(&self, method: &str) -> usize {
        self.requests_for(method).len()
    }
}

#[async_trait]
impl RpcTransport for MockTransport {
    async fn post_json(
        &self,
        url: &str,
        request: &RpcRequest,
        timeout: Duration,
    ) -> Result<TransportResponse> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                url: url.to_string(),
                request: request.clone(),
                timeout,
            });
        Ok((self.responder)(request))
    }
}
