//! LimeSurvey Session Management
//!
//! Keeps a LimeSurvey session key for an embedded survey block, registers
//! learners as survey participants, and hands them the survey URL and their
//! personal access code.
//!
//! The host supplies a [`Config`] with process-wide defaults, the block's
//! [`SurveySettings`], and the persisted [`SessionState`]. Each view render
//! goes through [`present_student_view`] or
//! [`SurveySessionManager::setup_student_view`].

pub mod config;
pub mod error;
pub mod learner;
pub mod manager;
pub mod state;
pub mod view;

pub use config::{remote_control_url, Config, SurveySettings};
pub use error::{ConfigError, Result};
pub use learner::{split_full_name, LearnerContext};
pub use manager::{
    survey_url, ParticipantStatus, Provisioning, StudentSurvey, SurveySessionManager,
    SETTING_API_PASSWORD, SETTING_API_USER, SETTING_LIMESURVEY_URL,
};
pub use state::{SessionKeyStatus, SessionState};
pub use view::{present_student_view, StudentViewContext};
