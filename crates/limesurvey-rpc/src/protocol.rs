//! Wire types for the LimeSurvey remote control protocol.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Path of the remote control endpoint relative to the LimeSurvey base URL.
pub const REMOTE_CONTROL_PATH: &str = "index.php/admin/remotecontrol";

/// Participant attribute used to correlate learners across systems.
pub const LEARNER_ATTRIBUTE: &str = "attribute_1";

/// Key of the inline status reported inside a mapping result.
pub const STATUS_KEY: &str = "status";

/// Inline status value that marks a mapping result as successful.
pub const STATUS_OK: &str = "OK";

/// Remote procedures used by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcMethod {
    /// `get_session_key(username, password)`.
    GetSessionKey,
    /// `get_summary(session_key, survey_id)`.
    GetSummary,
    /// `list_participants(session_key, survey_id, start, limit, unused_only, attributes, conditions)`.
    ListParticipants,
    /// `get_participant_properties(session_key, survey_id, properties)`.
    GetParticipantProperties,
    /// `add_participants(session_key, survey_id, participants)`.
    AddParticipants,
}

impl RpcMethod {
    /// Returns the remote procedure name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::GetSessionKey => "get_session_key",
            Self::GetSummary => "get_summary",
            Self::ListParticipants => "list_participants",
            Self::GetParticipantProperties => "get_participant_properties",
            Self::AddParticipants => "add_participants",
        }
    }
}

impl std::fmt::Display for RpcMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A JSON-RPC request envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Remote procedure name.
    pub method: String,
    /// Positional parameters, session key first for authenticated calls.
    pub params: Vec<Value>,
    /// Opaque request id, unique per call.
    pub id: String,
}

impl RpcRequest {
    /// Returns the parameter at `index`, if present.
    #[must_use]
    pub fn param(&self, index: usize) -> Option<&Value> {
        self.params.get(index)
    }
}

/// A JSON-RPC response envelope.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RpcResponse {
    /// Call result; its shape depends on the method.
    #[serde(default)]
    pub result: Value,
    /// Protocol-level error, `null` on success.
    #[serde(default)]
    pub error: Value,
}

/// A participant record as accepted by `add_participants`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRecord {
    /// Participant e-mail address.
    pub email: String,
    /// Last name.
    pub lastname: String,
    /// First name.
    pub firstname: String,
    /// Opaque learner id used for correlation.
    pub attribute_1: String,
}
