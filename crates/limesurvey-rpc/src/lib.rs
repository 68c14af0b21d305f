//! LimeSurvey Remote Control Client
//!
//! Typed access to the LimeSurvey JSON-RPC ("remote control") API.
//!
//! This crate builds request envelopes, posts them through an
//! [`RpcTransport`], and classifies failures into [`LimeSurveyError`].

pub mod client;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod protocol;
pub mod settings;
pub mod transport;

pub use client::{build_request, Auth, LimeSurveyClient};
pub use error::{
    ErrorKind, LimeSurveyError, Result, STATUS_INVALID_CREDENTIALS, STATUS_INVALID_SESSION_KEY,
    STATUS_NO_PARTICIPANT_FOUND,
};
pub use protocol::{
    ParticipantRecord, RpcMethod, RpcRequest, RpcResponse, LEARNER_ATTRIBUTE,
    REMOTE_CONTROL_PATH,
};
pub use settings::{resolve, ClientSettings, DEFAULT_TIMEOUT_SECS};
pub use transport::{HttpTransport, RpcTransport, TransportResponse};
