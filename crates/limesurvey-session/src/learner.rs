//! The current learner, as supplied by the host.

use serde::{Deserialize, Serialize};

/// Identity of the learner viewing a survey block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnerContext {
    /// Opaque per-learner, per-course id used to correlate participants.
    pub anonymous_id: String,
    /// Learner e-mail address.
    pub email: String,
    /// Full display name.
    pub full_name: String,
    /// Whether the learner has staff access to the course.
    #[serde(default)]
    pub is_staff: bool,
}

impl LearnerContext {
    /// Creates a non-staff learner.
    #[must_use]
    pub fn new(
        anonymous_id: impl Into<String>,
        email: impl Into<String>,
        full_name: impl Into<String>,
    ) -> Self {
        Self {
            anonymous_id: anonymous_id.into(),
            email: email.into(),
            full_name: full_name.into(),
            is_staff: false,
        }
    }

    /// Sets the staff flag.
    #[must_use]
    pub const fn staff(mut self, is_staff: bool) -> Self {
        self.is_staff = is_staff;
        self
    }

    /// Splits the full name into `(first, last)`.
    ///
    /// See [`split_full_name`].
    #[must_use]
    pub fn split_full_name(&self) -> (String, String) {
        split_full_name(&self.full_name)
    }
}

/// Splits a full name on its first run of whitespace.
///
/// The first token is the first name and the remainder, if any, is the last
/// name. An empty name yields two empty strings.
///
/// # Examples
///
/// ```
/// use limesurvey_session::split_full_name;
///
/// assert_eq!(split_full_name("Ada Lovelace"), ("Ada".to_string(), "Lovelace".to_string()));
/// assert_eq!(split_full_name("Lovelace"), ("Lovelace".to_string(), String::new()));
/// assert_eq!(split_full_name(""), (String::new(), String::new()));
/// ```
#[must_use]
pub fn split_full_name(full_name: &str) -> (String, String) {
    let trimmed = full_name.trim();
    match trimmed.split_once(char::is_whitespace) {
        Some((first, rest)) => (first.to_string(), rest.trim_start().to_string()),
        None => (trimmed.to_string(), String::new()),
    }
}
