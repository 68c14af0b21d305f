//! Survey session manager.
//!
//! [`SurveySessionManager`] keeps a valid session key for one survey block,
//! registers learners as survey participants, and fetches their access
//! codes. Every remote call goes through [`LimeSurveyClient`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use limesurvey_rpc::{
    resolve, Auth, LimeSurveyClient, LimeSurveyError, ParticipantRecord, Result, RpcMethod,
    RpcTransport, LEARNER_ATTRIBUTE,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use crate::config::{Config, SurveySettings};
use crate::learner::LearnerContext;
use crate::state::{SessionKeyStatus, SessionState};

/// Setting name reported when no base URL is configured.
pub const SETTING_LIMESURVEY_URL: &str = "limesurvey_url";

/// Setting name reported when no API user is configured.
pub const SETTING_API_USER: &str = "api_user";

/// Setting name reported when no API password is configured.
pub const SETTING_API_PASSWORD: &str = "api_password";

/// Whether a learner is registered as a survey participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantStatus {
    /// At least one participant carries the learner's id.
    Present,
    /// No participant carries the learner's id.
    Absent,
}

/// Outcome of [`SurveySessionManager::ensure_participant`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioning {
    /// The learner was already a participant; nothing was sent.
    AlreadyRegistered,
    /// The learner was added with `add_participants`.
    Added,
}

/// What a learner needs to open the survey.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentSurvey {
    /// Public survey URL.
    pub survey_url: String,
    /// Personal access token; `None` for anonymous surveys.
    pub access_code: Option<String>,
}

/// Returns the public URL of a survey.
///
/// # Examples
///
/// ```
/// use limesurvey_session::survey_url;
///
/// assert_eq!(survey_url("https://survey.example.com/", 42), "https://survey.example.com/index.php/42");
/// ```
#[must_use]
pub fn survey_url(base_url: &str, survey_id: u64) -> String {
    format!("{}/index.php/{survey_id}", base_url.trim_end_matches('/'))
}

/// Converts a positive duration to seconds, rounding any fraction up.
fn whole_seconds_rounded_up(duration: chrono::Duration) -> i64 {
    (duration.num_milliseconds() + 999) / 1000
}

/// Session key caching and participant provisioning for one survey block.
///
/// The manager owns the block's [`SessionState`]; hosts persist it with
/// [`SessionState::save`] after each request and hand it back on the next.
///
/// Concurrent requests for the same block may each observe a rejected key
/// and each log in again. The cooldown check and the update of
/// `last_login_attempt` are not atomic across requests. Both logins yield a
/// valid key, so the race is accepted; a host that wants to serialise
/// logins wraps the manager in a mutex.
#[derive(Debug)]
pub struct SurveySessionManager {
    client: LimeSurveyClient,
    defaults: Config,
    survey: SurveySettings,
    state: SessionState,
}

impl SurveySessionManager {
    /// Creates a manager using the HTTP transport.
    ///
    /// # Errors
    ///
    /// Returns [`LimeSurveyError::Transport`] if the HTTP client cannot be built.
    pub fn new(defaults: Config, survey: SurveySettings, state: SessionState) -> Result<Self> {
        let client = LimeSurveyClient::new(defaults.client_settings(&survey))?;
        Ok(Self {
            client,
            defaults,
            survey,
            state,
        })
    }

    /// Creates a manager using a custom transport.
    #[must_use]
    pub fn with_transport(
        defaults: Config,
        survey: SurveySettings,
        state: SessionState,
        transport: Arc<dyn RpcTransport>,
    ) -> Self {
        let client = LimeSurveyClient::with_transport(defaults.client_settings(&survey), transport);
        Self {
            client,
            defaults,
            survey,
            state,
        }
    }

    /// Returns the session state.
    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    /// Consumes the manager and returns the session state for persisting.
    #[must_use]
    pub fn into_state(self) -> SessionState {
        self.state
    }

    /// Returns the survey block settings.
    #[must_use]
    pub const fn survey(&self) -> &SurveySettings {
        &self.survey
    }

    fn auth(&self) -> Auth<'_> {
        Auth::Session(self.state.session_key.as_deref())
    }

    /// Makes sure a usable session key is cached.
    ///
    /// Unless the key is already known to be rejected, it is checked with
    /// `get_summary`. A rejected key triggers one rate-limited login.
    ///
    /// # Errors
    ///
    /// - [`LimeSurveyError::ExceededLoginAttempts`] if the previous login
    ///   attempt is inside the cooldown window; nothing is sent.
    /// - [`LimeSurveyError::ServiceMisconfigured`] if the endpoint or the
    ///   credentials are not configured.
    /// - [`LimeSurveyError::InvalidCredentials`] if the login is refused.
    /// - Any `get_summary` failure other than a rejected key, unchanged.
    #[instrument(skip(self), fields(survey_id = self.survey.survey_id))]
    pub async fn ensure_session_key(&mut self) -> Result<()> {
        if self.state.status() != SessionKeyStatus::Invalid {
            match self.survey_summary().await {
                Ok(_) => {
                    debug!(status = %self.state.status(), "Session key accepted");
                    return Ok(());
                }
                Err(LimeSurveyError::InvalidSessionKey { .. }) => {
                    warn!("Session key rejected, logging in again");
                    self.state.mark_rejected();
                }
                Err(e) => return Err(e),
            }
        }

        self.login(Utc::now()).await
    }

    async fn login(&mut self, now: DateTime<Utc>) -> Result<()> {
        let cooldown = self.defaults.login_cooldown();
        if let Some(last_attempt) = self.state.last_login_attempt {
            if let Some(remaining) = self.state.login_cooldown_remaining(now, cooldown) {
                warn!(%last_attempt, "Login attempted inside the cooldown window");
                return Err(LimeSurveyError::exceeded_login_attempts(
                    last_attempt,
                    whole_seconds_rounded_up(remaining),
                ));
            }
        }

        let user = resolve(
            self.survey.api_user.as_deref(),
            self.defaults.api_user.as_deref(),
            SETTING_API_USER,
        )?;
        let password = resolve(
            self.survey.api_password.as_deref(),
            self.defaults.api_password.as_deref(),
            SETTING_API_PASSWORD,
        )?;

        self.state.record_login_attempt(now);
        let result = self
            .client
            .call_procedure(
                RpcMethod::GetSessionKey,
                vec![json!(user), json!(password)],
                Auth::Bootstrap,
            )
            .await?;

        if let Value::String(key) = result {
            self.state.set_session_key(key);
            info!("Obtained a new LimeSurvey session key");
        } else {
            warn!(result = %result, "get_session_key returned no key");
            self.state.clear_session_key();
        }
        Ok(())
    }

    /// Fetches the survey summary with the cached session key.
    ///
    /// # Errors
    ///
    /// Returns any error of the `get_summary` call.
    pub async fn survey_summary(&self) -> Result<Value> {
        self.client
            .call_procedure(
                RpcMethod::GetSummary,
                vec![json!(self.survey.survey_id)],
                self.auth(),
            )
            .await
    }

    /// Checks whether a participant carries `anonymous_id`.
    ///
    /// A non-empty list means [`ParticipantStatus::Present`]; any other
    /// result, and a `NoParticipantFound` status, mean
    /// [`ParticipantStatus::Absent`].
    ///
    /// # Errors
    ///
    /// Returns every other error of the `list_participants` call.
    #[instrument(skip(self), fields(survey_id = self.survey.survey_id))]
    pub async fn check_participant(&self, anonymous_id: &str) -> Result<ParticipantStatus> {
        let result = self
            .client
            .call_procedure(
                RpcMethod::ListParticipants,
                vec![
                    json!(self.survey.survey_id),
                    json!(0),
                    json!(1),
                    json!(false),
                    json!([LEARNER_ATTRIBUTE]),
                    json!({ LEARNER_ATTRIBUTE: anonymous_id }),
                ],
                self.auth(),
            )
            .await;

        match result {
            Ok(Value::Array(participants)) if !participants.is_empty() => {
                Ok(ParticipantStatus::Present)
            }
            Ok(_) | Err(LimeSurveyError::NoParticipantFound { .. }) => Ok(ParticipantStatus::Absent),
            Err(e) => Err(e),
        }
    }

    /// Registers the learner as a participant unless already registered.
    ///
    /// # Errors
    ///
    /// Returns errors of `list_participants` other than `NoParticipantFound`,
    /// and any error of `add_participants`.
    #[instrument(skip(self, learner), fields(survey_id = self.survey.survey_id, anonymous_id = %learner.anonymous_id))]
    pub async fn ensure_participant(&self, learner: &LearnerContext) -> Result<Provisioning> {
        if self.check_participant(&learner.anonymous_id).await? == ParticipantStatus::Present {
            debug!("Learner is already a participant");
            return Ok(Provisioning::AlreadyRegistered);
        }

        let (firstname, lastname) = learner.split_full_name();
        let participant = ParticipantRecord {
            email: learner.email.clone(),
            lastname,
            firstname,
            attribute_1: learner.anonymous_id.clone(),
        };

        self.client
            .call_procedure(
                RpcMethod::AddParticipants,
                vec![json!(self.survey.survey_id), json!([participant])],
                self.auth(),
            )
            .await?;

        info!("Added learner as survey participant");
        Ok(Provisioning::Added)
    }

    /// Returns the learner's access token, or `""` if the result has none.
    ///
    /// # Errors
    ///
    /// Returns any error of the `get_participant_properties` call.
    #[instrument(skip(self), fields(survey_id = self.survey.survey_id))]
    pub async fn compute_access_code(&self, anonymous_id: &str) -> Result<String> {
        let result = self
            .client
            .call_procedure(
                RpcMethod::GetParticipantProperties,
                vec![
                    json!(self.survey.survey_id),
                    json!({ LEARNER_ATTRIBUTE: anonymous_id }),
                ],
                self.auth(),
            )
            .await?;

        Ok(result
            .get("token")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }

    /// Prepares the survey for a learner's view.
    ///
    /// Resolves the public survey URL first. Anonymous surveys stop there;
    /// otherwise the session key, the participant registration and the
    /// access code follow in that order. The first failure is returned.
    ///
    /// # Errors
    ///
    /// Returns [`LimeSurveyError::ServiceMisconfigured`] if no base URL is
    /// configured, or the first error of the remaining steps.
    #[instrument(skip(self, learner), fields(survey_id = self.survey.survey_id, anonymous_id = %learner.anonymous_id))]
    pub async fn setup_student_view(&mut self, learner: &LearnerContext) -> Result<StudentSurvey> {
        let base_url = resolve(
            self.survey.limesurvey_url.as_deref(),
            self.defaults.limesurvey_url.as_deref(),
            SETTING_LIMESURVEY_URL,
        )?;
        let survey_url = survey_url(&base_url, self.survey.survey_id);

        if self.survey.anonymous_survey {
            debug!("Anonymous survey, skipping participant registration");
            return Ok(StudentSurvey {
                survey_url,
                access_code: None,
            });
        }

        self.ensure_session_key().await?;
        self.ensure_participant(learner).await?;
        let access_code = self.compute_access_code(&learner.anonymous_id).await?;

        Ok(StudentSurvey {
            survey_url,
            access_code: Some(access_code),
        })
    }
}
