//! LimeSurvey remote control client.
//!
//! This module provides [`LimeSurveyClient`], which performs one JSON-RPC
//! call per invocation and turns transport and protocol failures into
//! [`LimeSurveyError`] values. The client holds no session state: callers
//! pass the current session key with every authenticated call.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::error::{LimeSurveyError, Result};
use crate::protocol::{RpcMethod, RpcRequest, RpcResponse, STATUS_KEY, STATUS_OK};
use crate::settings::ClientSettings;
use crate::transport::{HttpTransport, RpcTransport};

/// How a call authenticates against the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Auth<'a> {
    /// Session bootstrap (`get_session_key`): no session key is sent.
    Bootstrap,
    /// Authenticated call: the key is sent as the first parameter.
    ///
    /// `None` is sent as JSON `null`, which the remote rejects as an invalid
    /// session key.
    Session(Option<&'a str>),
}

/// Client for the LimeSurvey remote control endpoint.
///
/// # Example
///
/// ```no_run
/// use limesurvey_rpc::{Auth, ClientSettings, LimeSurveyClient, RpcMethod};
/// use serde_json::json;
///
/// # async fn example() -> limesurvey_rpc::Result<()> {
/// let settings = ClientSettings::new("https://survey.example.com/index.php/admin/remotecontrol");
/// let client = LimeSurveyClient::new(settings)?;
///
/// let key = client
///     .call_procedure(
///         RpcMethod::GetSessionKey,
///         vec![json!("api-user"), json!("api-password")],
///         Auth::Bootstrap,
///     )
///     .await?;
/// println!("session key: {key}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct LimeSurveyClient {
    settings: ClientSettings,
    transport: Arc<dyn RpcTransport>,
}

impl LimeSurveyClient {
    /// Creates a client using the `reqwest` transport.
    ///
    /// # Errors
    ///
    /// Returns [`LimeSurveyError::Transport`] if the HTTP client cannot be built.
    pub fn new(settings: ClientSettings) -> Result<Self> {
        let transport = HttpTransport::new()?;
        Ok(Self::with_transport(settings, Arc::new(transport)))
    }

    /// Creates a client using a custom transport.
    #[must_use]
    pub fn with_transport(settings: ClientSettings, transport: Arc<dyn RpcTransport>) -> Self {
        Self {
            settings,
            transport,
        }
    }

    /// Returns the connection settings.
    #[must_use]
    pub const fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Calls a remote procedure.
    ///
    /// For [`Auth::Session`] the session key is prepended to `params`. A
    /// non-mapping result is returned unchanged, as is a mapping whose
    /// `status` is absent or `"OK"`. Any other `status` string fails the call.
    ///
    /// # Errors
    ///
    /// - [`LimeSurveyError::ServiceMisconfigured`] if no endpoint is
    ///   configured; nothing is sent in that case.
    /// - [`LimeSurveyError::Transport`] if no response was received.
    /// - [`LimeSurveyError::Api`] for non-2xx responses (body as message)
    ///   and unmapped statuses.
    /// - The mapped variant for a known `status` string.
    #[instrument(skip(self, params, auth), fields(method = %method))]
    pub async fn call_procedure(
        &self,
        method: RpcMethod,
        params: Vec<Value>,
        auth: Auth<'_>,
    ) -> Result<Value> {
        let endpoint = self.settings.endpoint()?;
        let request = build_request(method, params, auth, Uuid::new_v4().simple().to_string());

        debug!(id = %request.id, params = request.params.len(), "Calling LimeSurvey");

        let response = self
            .transport
            .post_json(&endpoint, &request, self.settings.timeout)
            .await?;

        if !response.is_success() {
            warn!(status = response.status, "LimeSurvey returned an HTTP error");
            return Err(LimeSurveyError::http(response.status, response.body));
        }

        let envelope: RpcResponse =
            serde_json::from_str(&response.body).map_err(LimeSurveyError::malformed)?;
        interpret_response(envelope)
    }
}

/// Builds the request envelope for a call.
#[must_use]
pub fn build_request(method: RpcMethod, params: Vec<Value>, auth: Auth<'_>, id: String) -> RpcRequest {
    let params = match auth {
        Auth::Bootstrap => params,
        Auth::Session(key) => {
            let mut full = Vec::with_capacity(params.len() + 1);
            full.push(key.map_or(Value::Null, |key| Value::String(key.to_owned())));
            full.extend(params);
            full
        }
    };

    RpcRequest {
        method: method.as_str().to_string(),
        params,
        id,
    }
}

/// Classifies a decoded response.
fn interpret_response(response: RpcResponse) -> Result<Value> {
    if response.result.is_null() && !response.error.is_null() {
        let message = response
            .error
            .as_str()
            .map_or_else(|| response.error.to_string(), str::to_owned);
        return Err(LimeSurveyError::Api {
            message,
            http_status: None,
        });
    }

    let failure = match &response.result {
        Value::Object(map) => map
            .get(STATUS_KEY)
            .and_then(Value::as_str)
            .filter(|status| *status != STATUS_OK)
            .map(LimeSurveyError::from_status),
        _ => None,
    };

    if let Some(err) = failure {
        debug!(error = %err, "LimeSurvey reported a failing status");
        return Err(err);
    }
    Ok(response.result)
}
