//! Student view presentation.
//!
//! The host renders a survey block from a [`StudentViewContext`]. A broken
//! integration must never break the surrounding page, so
//! [`present_student_view`] always returns a context and turns failures into
//! a display-only message.

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::learner::LearnerContext;
use crate::manager::SurveySessionManager;

/// Everything the host template needs to render a survey block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentViewContext {
    /// Whether the survey link should be shown.
    pub show_survey: bool,
    /// Public survey URL.
    pub survey_url: Option<String>,
    /// The learner's access token.
    pub access_code: Option<String>,
    /// Display-only error text.
    pub error_message: Option<String>,
}

/// Builds the view context for `learner`.
///
/// Without a learner (previews, logged-out visitors) the survey is hidden and
/// nothing is sent. Errors are logged; staff see the full error text, other
/// learners a generic message for its kind.
pub async fn present_student_view(
    manager: &mut SurveySessionManager,
    learner: Option<&LearnerContext>,
) -> StudentViewContext {
    let Some(learner) = learner else {
        debug!("No learner in context, hiding survey");
        return StudentViewContext::default();
    };

    match manager.setup_student_view(learner).await {
        Ok(survey) => StudentViewContext {
            show_survey: true,
            survey_url: Some(survey.survey_url),
            access_code: survey.access_code,
            error_message: None,
        },
        Err(e) => {
            error!(
                survey_id = manager.survey().survey_id,
                kind = %e.kind(),
                error = %e,
                "Failed to set up survey view"
            );
            let message = if learner.is_staff {
                e.to_string()
            } else {
                e.kind().learner_message().to_string()
            };
            StudentViewContext {
                show_survey: true,
                survey_url: None,
                access_code: None,
                error_message: Some(message),
            }
        }
    }
}
