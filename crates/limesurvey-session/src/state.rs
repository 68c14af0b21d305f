//! Session state shared by every learner of one survey block.
//!
//! The host persists [`SessionState`] between requests. It holds the cached
//! session key and the time of the last login attempt, which drives the
//! re-login cooldown.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

// ============================================================================
// SessionKeyStatus
// ============================================================================

/// What the manager currently believes about the cached session key.
///
/// - `Unset` -> `Valid` after a successful login
/// - `Valid` -> `Invalid` when the remote rejects the key
/// - `Invalid` -> `Valid` after a successful re-login
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKeyStatus {
    /// No key has been obtained yet.
    #[default]
    Unset,
    /// A key is cached and has not been rejected.
    Valid,
    /// The remote rejected the cached key.
    Invalid,
}

impl std::fmt::Display for SessionKeyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unset => write!(f, "unset"),
            Self::Valid => write!(f, "valid"),
            Self::Invalid => write!(f, "invalid"),
        }
    }
}

// ============================================================================
// SessionState
// ============================================================================

/// Cached session key and login bookkeeping for one survey block.
///
/// A cached key is assumed valid until the remote API rejects it; there is
/// no local expiry.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    /// The cached session key.
    #[serde(default)]
    pub session_key: Option<String>,

    /// When the last `get_session_key` call was started.
    #[serde(default)]
    pub last_login_attempt: Option<DateTime<Utc>>,

    /// Set when the remote rejected `session_key`; not persisted.
    #[serde(skip)]
    rejected: bool,
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("session_key", &self.session_key.as_ref().map(|_| "<redacted>"))
            .field("last_login_attempt", &self.last_login_attempt)
            .field("status", &self.status())
            .finish()
    }
}

impl SessionState {
    /// Creates an empty state.
    ///
    /// # Examples
    ///
    /// ```
    /// use limesurvey_session::{SessionKeyStatus, SessionState};
    ///
    /// let state = SessionState::new();
    /// assert_eq!(state.status(), SessionKeyStatus::Unset);
    /// assert!(state.last_login_attempt.is_none());
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a state holding an already known key.
    #[must_use]
    pub fn with_session_key(session_key: impl Into<String>) -> Self {
        Self {
            session_key: Some(session_key.into()),
            ..Self::default()
        }
    }

    /// Returns the current belief about the cached key.
    #[must_use]
    pub fn status(&self) -> SessionKeyStatus {
        match (&self.session_key, self.rejected) {
            (None, _) => SessionKeyStatus::Unset,
            (Some(_), false) => SessionKeyStatus::Valid,
            (Some(_), true) => SessionKeyStatus::Invalid,
        }
    }

    /// Records that the remote rejected the cached key.
    pub fn mark_rejected(&mut self) {
        self.rejected = true;
    }

    /// Stores a freshly issued key.
    pub fn set_session_key(&mut self, session_key: impl Into<String>) {
        self.session_key = Some(session_key.into());
        self.rejected = false;
    }

    /// Drops the cached key.
    pub fn clear_session_key(&mut self) {
        self.session_key = None;
        self.rejected = false;
    }

    /// Records the start of a login attempt.
    pub fn record_login_attempt(&mut self, at: DateTime<Utc>) {
        self.last_login_attempt = Some(at);
    }

    /// Returns how long a login must still wait at `now`, if at all.
    ///
    /// An attempt recorded in the future counts as inside the window.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{Duration, Utc};
    /// use limesurvey_session::SessionState;
    ///
    /// let now = Utc::now();
    /// let mut state = SessionState::new();
    /// assert!(state.login_cooldown_remaining(now, Duration::minutes(5)).is_none());
    ///
    /// state.record_login_attempt(now - Duration::minutes(1));
    /// assert_eq!(
    ///     state.login_cooldown_remaining(now, Duration::minutes(5)),
    ///     Some(Duration::minutes(4))
    /// );
    /// ```
    #[must_use]
    pub fn login_cooldown_remaining(
        &self,
        now: DateTime<Utc>,
        cooldown: chrono::Duration,
    ) -> Option<chrono::Duration> {
        let last = self.last_login_attempt?;
        let elapsed = now - last;
        (elapsed < cooldown).then(|| cooldown - elapsed)
    }

    /// Loads state from `path`.
    ///
    /// Returns `Ok(None)` if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::StateFileCorrupted` if the file is not valid
    /// state JSON, or `ConfigError::Io` if it cannot be read.
    pub async fn load(path: &Path) -> Result<Option<Self>> {
        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| ConfigError::state_corrupted(path, e.to_string()))
    }

    /// Saves state to `path`, creating parent directories.
    ///
    /// The file is written to a temporary sibling first and renamed into
    /// place.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file cannot be written.
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(self)?;
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, json).await?;
        tokio::fs::rename(&tmp_path, path).await?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
