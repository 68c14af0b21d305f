//! Error types for LimeSurvey remote control calls.
//!
//! Every failure of the integration, whether it comes from missing
//! configuration, the HTTP layer, or a `status` string reported by the
//! remote API, is a [`LimeSurveyError`]. Hosts that only need to decide what
//! to show a learner should match on [`LimeSurveyError::kind`].

use chrono::{DateTime, Utc};

/// A specialized `Result` type for LimeSurvey operations.
pub type Result<T> = std::result::Result<T, LimeSurveyError>;

/// Status string reported when the session key is unknown or expired.
pub const STATUS_INVALID_SESSION_KEY: &str = "Invalid session key";

/// Status string reported when a participant query matched nobody.
pub const STATUS_NO_PARTICIPANT_FOUND: &str = "No survey participants found.";

/// Status string reported when `get_session_key` is called with bad credentials.
pub const STATUS_INVALID_CREDENTIALS: &str = "Invalid user name or password";

/// Errors that can occur while talking to LimeSurvey.
#[derive(Debug, thiserror::Error)]
pub enum LimeSurveyError {
    // ========================================================================
    // Configuration
    // ========================================================================
    /// A required setting has neither an instance value nor a process default.
    #[error("LimeSurvey service is misconfigured: '{setting}' is not set\n\nSuggestion: Set '{setting}' in limesurvey.json, the environment, or the block settings")]
    ServiceMisconfigured {
        /// Name of the missing setting.
        setting: String,
    },

    // ========================================================================
    // Mapped remote statuses
    // ========================================================================
    /// The remote API rejected the session key.
    #[error("LimeSurvey rejected the session key: {message}")]
    InvalidSessionKey {
        /// Status string reported by the remote API.
        message: String,
    },

    /// A participant query matched no participant.
    #[error("No LimeSurvey participant found: {message}")]
    NoParticipantFound {
        /// Status string reported by the remote API.
        message: String,
    },

    /// `get_session_key` was refused for the configured API user.
    #[error("LimeSurvey refused the API credentials: {message}\n\nSuggestion: Check apiUser and apiPassword")]
    InvalidCredentials {
        /// Status string reported by the remote API.
        message: String,
    },

    // ========================================================================
    // Local rate limiting
    // ========================================================================
    /// A re-login was attempted inside the cooldown window.
    #[error("Too many LimeSurvey login attempts (last attempt at {last_attempt})\n\nSuggestion: Retry in {retry_after_secs}s")]
    ExceededLoginAttempts {
        /// When the previous login attempt was made.
        last_attempt: DateTime<Utc>,
        /// Seconds until the cooldown window closes.
        retry_after_secs: i64,
    },

    // ========================================================================
    // Generic API failures
    // ========================================================================
    /// Any other remote failure: an unmapped status or a non-2xx response.
    #[error("LimeSurvey API error: {message}")]
    Api {
        /// The status string, or the raw response body for HTTP failures.
        message: String,
        /// HTTP status code when the failure came from the HTTP layer.
        http_status: Option<u16>,
    },

    /// The request never produced an HTTP response (connect failure, timeout).
    #[error("LimeSurvey request failed: {message}\n\nSuggestion: Check that internalApi is reachable from this host")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },

    /// A 2xx response whose body is not a JSON-RPC response.
    #[error("Malformed LimeSurvey response: {message}")]
    MalformedResponse {
        /// Description of the decoding failure.
        message: String,
    },
}

/// Coarse classification of [`LimeSurveyError`].
///
/// `Transport` and `MalformedResponse` errors classify as [`ErrorKind::Api`],
/// the base kind of the taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Required configuration is absent.
    ServiceMisconfigured,
    /// The session key was rejected.
    InvalidSessionKey,
    /// No participant matched the query.
    NoParticipantFound,
    /// The API credentials were rejected.
    InvalidCredentials,
    /// The re-login cooldown has not elapsed.
    ExceededLoginAttempts,
    /// Any other API failure.
    Api,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ServiceMisconfigured => write!(f, "service_misconfigured"),
            Self::InvalidSessionKey => write!(f, "invalid_session_key"),
            Self::NoParticipantFound => write!(f, "no_participant_found"),
            Self::InvalidCredentials => write!(f, "invalid_credentials"),
            Self::ExceededLoginAttempts => write!(f, "exceeded_login_attempts"),
            Self::Api => write!(f, "api"),
        }
    }
}

impl ErrorKind {
    /// Returns the display-only text shown to a learner for this kind.
    #[must_use]
    pub const fn learner_message(&self) -> &'static str {
        match self {
            Self::ServiceMisconfigured => {
                "The survey service is not configured yet. Please contact your course team."
            }
            Self::ExceededLoginAttempts => {
                "The survey service is temporarily unavailable. Please try again in a few minutes."
            }
            Self::InvalidSessionKey
            | Self::NoParticipantFound
            | Self::InvalidCredentials
            | Self::Api => "The survey could not be loaded. Please try again later.",
        }
    }

    /// Returns an operator-facing suggestion for this kind.
    #[must_use]
    pub const fn suggestion(&self) -> &'static str {
        match self {
            Self::ServiceMisconfigured => "Configure the LimeSurvey URL, endpoint and API credentials",
            Self::InvalidSessionKey => "A new session key will be requested on the next view",
            Self::NoParticipantFound => "The learner will be registered on the next view",
            Self::InvalidCredentials => "Check the API user and password",
            Self::ExceededLoginAttempts => "Wait for the login cooldown to elapse",
            Self::Api => "Check the LimeSurvey server logs",
        }
    }
}

impl LimeSurveyError {
    /// Creates the error matching a remote `status` string.
    ///
    /// The three known statuses map to their own variant; every other status
    /// falls back to the generic [`LimeSurveyError::Api`].
    #[must_use]
    pub fn from_status(status: &str) -> Self {
        let message = status.to_string();
        match status {
            STATUS_INVALID_SESSION_KEY => Self::InvalidSessionKey { message },
            STATUS_NO_PARTICIPANT_FOUND => Self::NoParticipantFound { message },
            STATUS_INVALID_CREDENTIALS => Self::InvalidCredentials { message },
            _ => Self::Api {
                message,
                http_status: None,
            },
        }
    }

    /// Creates a new `ServiceMisconfigured` error.
    #[must_use]
    pub fn service_misconfigured(setting: impl Into<String>) -> Self {
        Self::ServiceMisconfigured {
            setting: setting.into(),
        }
    }

    /// Creates a new `ExceededLoginAttempts` error.
    #[must_use]
    pub const fn exceeded_login_attempts(last_attempt: DateTime<Utc>, retry_after_secs: i64) -> Self {
        Self::ExceededLoginAttempts {
            last_attempt,
            retry_after_secs,
        }
    }

    /// Creates an `Api` error for a non-2xx HTTP response.
    #[must_use]
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self::Api {
            message: body.into(),
            http_status: Some(status),
        }
    }

    /// Creates a new `Transport` error.
    #[must_use]
    pub fn transport(message: impl std::fmt::Display) -> Self {
        Self::Transport {
            message: message.to_string(),
        }
    }

    /// Creates a new `MalformedResponse` error.
    #[must_use]
    pub fn malformed(message: impl std::fmt::Display) -> Self {
        Self::MalformedResponse {
            message: message.to_string(),
        }
    }

    /// Returns the kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ServiceMisconfigured { .. } => ErrorKind::ServiceMisconfigured,
            Self::InvalidSessionKey { .. } => ErrorKind::InvalidSessionKey,
            Self::NoParticipantFound { .. } => ErrorKind::NoParticipantFound,
            Self::InvalidCredentials { .. } => ErrorKind::InvalidCredentials,
            Self::ExceededLoginAttempts { .. } => ErrorKind::ExceededLoginAttempts,
            Self::Api { .. } | Self::Transport { .. } | Self::MalformedResponse { .. } => {
                ErrorKind::Api
            }
        }
    }
}

impl From<reqwest::Error> for LimeSurveyError {
    fn from(err: reqwest::Error) -> Self {
        Self::transport(err)
    }
}
