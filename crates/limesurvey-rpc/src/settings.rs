//! Resolution of settings that can be overridden per block instance.

use std::time::Duration;

use crate::error::{LimeSurveyError, Result};

/// Default timeout for a single remote call, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Setting name reported when no RPC endpoint is configured.
pub const SETTING_INTERNAL_API: &str = "internal_api";

/// Resolves a setting from an instance override and a process default.
///
/// Empty or whitespace-only values count as unset.
///
/// # Errors
///
/// Returns [`LimeSurveyError::ServiceMisconfigured`] naming `setting` when
/// neither value is set.
pub fn resolve(instance: Option<&str>, default: Option<&str>, setting: &str) -> Result<String> {
    instance
        .filter(|value| !value.trim().is_empty())
        .or_else(|| default.filter(|value| !value.trim().is_empty()))
        .map(str::to_owned)
        .ok_or_else(|| LimeSurveyError::service_misconfigured(setting))
}

/// Connection settings for [`crate::LimeSurveyClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    /// RPC endpoint set on the block instance.
    pub endpoint_override: Option<String>,
    /// Process-wide RPC endpoint.
    pub default_endpoint: Option<String>,
    /// Timeout applied to every call.
    pub timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            endpoint_override: None,
            default_endpoint: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ClientSettings {
    /// Creates settings with a process-wide endpoint and the default timeout.
    #[must_use]
    pub fn new(default_endpoint: impl Into<String>) -> Self {
        Self {
            default_endpoint: Some(default_endpoint.into()),
            ..Self::default()
        }
    }

    /// Sets the per-instance endpoint override.
    #[must_use]
    pub fn with_endpoint_override(mut self, endpoint: Option<String>) -> Self {
        self.endpoint_override = endpoint;
        self
    }

    /// Sets the per-call timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the effective endpoint URL.
    ///
    /// # Errors
    ///
    /// Returns [`LimeSurveyError::ServiceMisconfigured`] when no endpoint is set.
    pub fn endpoint(&self) -> Result<String> {
        resolve(
            self.endpoint_override.as_deref(),
            self.default_endpoint.as_deref(),
            SETTING_INTERNAL_API,
        )
    }
}
