//! Configuration for the LimeSurvey integration.
//!
//! [`Config`] holds the process-wide defaults, loaded from `limesurvey.json`
//! and the environment. [`SurveySettings`] holds what a single embedded
//! survey block configures, including optional overrides of the defaults.
//! Values are resolved with [`limesurvey_rpc::resolve`] at the point of use.

use std::path::Path;
use std::time::Duration;

use limesurvey_rpc::{ClientSettings, REMOTE_CONTROL_PATH};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// The default config file name.
const CONFIG_FILE_NAME: &str = "limesurvey.json";

/// Environment variable overriding [`Config::limesurvey_url`].
pub const ENV_URL: &str = "LIMESURVEY_URL";

/// Environment variable overriding [`Config::internal_api`].
pub const ENV_INTERNAL_API: &str = "LIMESURVEY_INTERNAL_API";

/// Environment variable overriding [`Config::api_user`].
pub const ENV_API_USER: &str = "LIMESURVEY_API_USER";

/// Environment variable overriding [`Config::api_password`].
pub const ENV_API_PASSWORD: &str = "LIMESURVEY_API_PASSWORD";

/// Environment variable overriding [`Config::api_timeout`].
pub const ENV_API_TIMEOUT: &str = "LIMESURVEY_API_TIMEOUT";

/// Default timeout for a remote call in seconds.
const fn default_api_timeout() -> u64 {
    limesurvey_rpc::DEFAULT_TIMEOUT_SECS
}

/// Default cooldown between two login attempts in minutes.
const fn default_login_cooldown() -> u32 {
    5
}

/// Process-wide LimeSurvey settings.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Public base URL of the LimeSurvey installation.
    #[serde(default)]
    pub limesurvey_url: Option<String>,

    /// URL of the remote control endpoint.
    #[serde(default)]
    pub internal_api: Option<String>,

    /// API user for `get_session_key`.
    #[serde(default)]
    pub api_user: Option<String>,

    /// API password for `get_session_key`.
    #[serde(default)]
    pub api_password: Option<String>,

    /// Timeout for a single remote call in seconds.
    #[serde(default = "default_api_timeout")]
    pub api_timeout: u64,

    /// Minimum time between two login attempts in minutes.
    #[serde(default = "default_login_cooldown")]
    pub login_cooldown_minutes: u32,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("limesurvey_url", &self.limesurvey_url)
            .field("internal_api", &self.internal_api)
            .field("api_user", &self.api_user)
            .field("api_password", &self.api_password.as_ref().map(|_| "<redacted>"))
            .field("api_timeout", &self.api_timeout)
            .field("login_cooldown_minutes", &self.login_cooldown_minutes)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            limesurvey_url: None,
            internal_api: None,
            api_user: None,
            api_password: None,
            api_timeout: default_api_timeout(),
            login_cooldown_minutes: default_login_cooldown(),
        }
    }
}

impl Config {
    /// Loads configuration from the current working directory and environment.
    ///
    /// Looks for `limesurvey.json` in the current directory, then applies
    /// the `LIMESURVEY_*` environment variables on top.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but contains invalid JSON, or if
    /// the resulting configuration is invalid.
    pub fn load() -> Result<Self> {
        let current_dir = std::env::current_dir().map_err(|e| {
            ConfigError::config_parse(
                "<current directory>",
                format!("cannot determine current directory: {e}"),
            )
        })?;
        Self::load_from_dir(&current_dir)
    }

    /// Loads configuration from a specific directory and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but contains invalid JSON.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        Self::load_from_file(&dir.join(CONFIG_FILE_NAME))
    }

    /// Loads configuration from a specific file path and the environment.
    ///
    /// If the file does not exist, defaults are used. The `LIMESURVEY_*`
    /// environment variables are applied before the endpoint is derived, so
    /// an overridden base URL also moves the endpoint.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ConfigParseError` if the file exists but contains
    /// invalid JSON.
    ///
    /// Returns `ConfigError::ConfigValidationError` if the configuration values
    /// are invalid.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        Self::load_with(path, |name| std::env::var(name).ok())
    }

    /// Reads `path`, applies overrides from `lookup`, then derives and validates.
    fn load_with(path: &Path, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::read(path)?;
        config.apply_overrides_from(lookup)?;
        config.finalize()
    }

    fn read(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(ConfigError::config_parse(
                    path,
                    format!("failed to read file: {e}"),
                ));
            }
        };

        serde_json::from_str(&contents).map_err(|e| ConfigError::config_parse(path, e.to_string()))
    }

    /// Derives missing values and validates.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ConfigValidationError` if validation fails.
    pub fn finalize(mut self) -> Result<Self> {
        if !is_set(self.internal_api.as_deref()) {
            self.internal_api = self
                .limesurvey_url
                .as_deref()
                .filter(|url| !url.trim().is_empty())
                .map(remote_control_url);
        }
        self.validate()?;
        Ok(self)
    }

    /// Applies the `LIMESURVEY_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ConfigValidationError` if `LIMESURVEY_API_TIMEOUT`
    /// is not a number.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|name| std::env::var(name).ok())
    }

    /// Applies overrides from `lookup`, which maps a variable name to its value.
    ///
    /// Unset and empty values leave the current setting untouched.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ConfigValidationError` if the timeout override is
    /// not a number.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(url) = get(ENV_URL) {
            self.limesurvey_url = Some(url);
        }
        if let Some(endpoint) = get(ENV_INTERNAL_API) {
            self.internal_api = Some(endpoint);
        }
        if let Some(user) = get(ENV_API_USER) {
            self.api_user = Some(user);
        }
        if let Some(password) = get(ENV_API_PASSWORD) {
            self.api_password = Some(password);
        }
        if let Some(timeout) = get(ENV_API_TIMEOUT) {
            self.api_timeout = timeout.trim().parse().map_err(|_| {
                ConfigError::config_validation(
                    format!("{ENV_API_TIMEOUT} must be a whole number of seconds, got '{timeout}'"),
                    format!("Set {ENV_API_TIMEOUT} to a value such as 5"),
                )
            })?;
        }
        Ok(())
    }

    /// Validates the configuration values.
    ///
    /// Checks that:
    /// - `api_timeout` is greater than 0
    /// - `login_cooldown_minutes` is greater than 0
    /// - configured URLs use `http://` or `https://`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ConfigValidationError` if any validation check fails.
    pub fn validate(&self) -> Result<()> {
        if self.api_timeout == 0 {
            return Err(ConfigError::config_validation(
                "apiTimeout must be greater than 0",
                "Set apiTimeout to at least 1 second in your limesurvey.json",
            ));
        }

        if self.login_cooldown_minutes == 0 {
            return Err(ConfigError::config_validation(
                "loginCooldownMinutes must be greater than 0",
                "Set loginCooldownMinutes to at least 1 in your limesurvey.json",
            ));
        }

        for (name, value) in [
            ("limesurveyUrl", &self.limesurvey_url),
            ("internalApi", &self.internal_api),
        ] {
            if let Some(url) = value.as_deref().filter(|url| !url.trim().is_empty()) {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(ConfigError::config_validation(
                        format!("{name} must be an http(s) URL, got '{url}'"),
                        format!("Use a full URL such as https://survey.example.com for {name}"),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Returns the per-call timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout)
    }

    /// Returns the minimum time between two login attempts.
    #[must_use]
    pub fn login_cooldown(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.login_cooldown_minutes))
    }

    /// Builds client settings for a survey block.
    #[must_use]
    pub fn client_settings(&self, survey: &SurveySettings) -> ClientSettings {
        ClientSettings {
            endpoint_override: survey.internal_api.clone(),
            default_endpoint: self.internal_api.clone(),
            timeout: self.timeout(),
        }
    }
}

/// Empty and whitespace-only values count as unset.
fn is_set(value: Option<&str>) -> bool {
    value.is_some_and(|value| !value.trim().is_empty())
}

/// Returns the remote control URL under a LimeSurvey base URL.
#[must_use]
pub fn remote_control_url(base_url: &str) -> String {
    format!("{}/{REMOTE_CONTROL_PATH}", base_url.trim_end_matches('/'))
}

/// Settings of one embedded survey block.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveySettings {
    /// LimeSurvey survey id.
    pub survey_id: u64,

    /// Anonymous surveys need no participant registration or access code.
    #[serde(default)]
    pub anonymous_survey: bool,

    /// Overrides [`Config::limesurvey_url`].
    #[serde(default)]
    pub limesurvey_url: Option<String>,

    /// Overrides [`Config::internal_api`].
    #[serde(default)]
    pub internal_api: Option<String>,

    /// Overrides [`Config::api_user`].
    #[serde(default)]
    pub api_user: Option<String>,

    /// Overrides [`Config::api_password`].
    #[serde(default)]
    pub api_password: Option<String>,
}

impl std::fmt::Debug for SurveySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurveySettings")
            .field("survey_id", &self.survey_id)
            .field("anonymous_survey", &self.anonymous_survey)
            .field("limesurvey_url", &self.limesurvey_url)
            .field("internal_api", &self.internal_api)
            .field("api_user", &self.api_user)
            .field("api_password", &self.api_password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl SurveySettings {
    /// Creates settings for `survey_id` without any overrides.
    #[must_use]
    pub const fn new(survey_id: u64) -> Self {
        Self {
            survey_id,
            anonymous_survey: false,
            limesurvey_url: None,
            internal_api: None,
            api_user: None,
            api_password: None,
        }
    }

    /// Marks the survey as anonymous.
    #[must_use]
    pub const fn anonymous(mut self, anonymous: bool) -> Self {
        self.anonymous_survey = anonymous;
        self
    }

    /// Overrides the API credentials for this block.
    #[must_use]
    pub fn with_credentials(mut self, user: Option<String>, password: Option<String>) -> Self {
        self.api_user = user;
        self.api_password = password;
        self
    }

    /// Overrides the base URL and endpoint for this block.
    #[must_use]
    pub fn with_urls(mut self, limesurvey_url: Option<String>, internal_api: Option<String>) -> Self {
        self.limesurvey_url = limesurvey_url;
        self.internal_api = internal_api;
        self
    }
}
