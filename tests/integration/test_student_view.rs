//! End-to-end tests for rendering the student view against a fake
//! LimeSurvey remote control server.

mod common;

use std::path::PathBuf;

use common::spawn_fake_limesurvey;
use limesurvey_rpc::ErrorKind;
use limesurvey_session::{
    present_student_view, Config, LearnerContext, SessionState, SurveySessionManager,
    SurveySettings,
};

fn learner(id: &str) -> LearnerContext {
    LearnerContext::new(id, format!("{id}@example.com"), "Ada Lovelace")
}

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

/// Tests that a first render logs in, registers the learner and returns the token.
#[tokio::test]
async fn test_first_view_registers_learner() {
    let server = spawn_fake_limesurvey().await;
    let mut manager =
        SurveySessionManager::new(server.config(), SurveySettings::new(42), SessionState::new())
            .expect("Failed to build manager");

    let context = present_student_view(&mut manager, Some(&learner("anon-1"))).await;

    assert!(context.show_survey);
    assert_eq!(context.error_message, None);
    assert_eq!(
        context.survey_url,
        Some(format!("{}/index.php/42", server.base_url))
    );
    assert_eq!(context.access_code.as_deref(), Some("TOKEN-anon-1"));
    assert_eq!(
        server.methods(),
        [
            "get_summary",
            "get_session_key",
            "list_participants",
            "add_participants",
            "get_participant_properties",
        ]
    );

    server.with_fake(|fake| {
        assert_eq!(fake.participants.len(), 1);
        assert_eq!(fake.participants[0]["firstname"], "Ada");
        assert_eq!(fake.participants[0]["lastname"], "Lovelace");
        assert_eq!(fake.participants[0]["email"], "anon-1@example.com");
    });
}

/// Tests that a second render reuses the session key and the registration.
#[tokio::test]
async fn test_second_view_is_idempotent() {
    let server = spawn_fake_limesurvey().await;
    let mut manager =
        SurveySessionManager::new(server.config(), SurveySettings::new(42), SessionState::new())
            .expect("Failed to build manager");
    let first = present_student_view(&mut manager, Some(&learner("anon-1"))).await;

    let state = manager.into_state();
    let mut manager = SurveySessionManager::new(server.config(), SurveySettings::new(42), state)
        .expect("Failed to build manager");
    let second = present_student_view(&mut manager, Some(&learner("anon-1"))).await;

    assert_eq!(first, second);
    assert_eq!(server.count("get_session_key"), 1);
    assert_eq!(server.count("add_participants"), 1);
    assert_eq!(server.count("get_participant_properties"), 2);
}

/// Tests that learners sharing a block each get their own token.
#[tokio::test]
async fn test_learners_get_their_own_tokens() {
    let server = spawn_fake_limesurvey().await;
    let mut manager =
        SurveySessionManager::new(server.config(), SurveySettings::new(42), SessionState::new())
            .expect("Failed to build manager");

    let ada = present_student_view(&mut manager, Some(&learner("anon-ada"))).await;
    let bob = present_student_view(&mut manager, Some(&learner("anon-bob"))).await;

    assert_eq!(ada.access_code.as_deref(), Some("TOKEN-anon-ada"));
    assert_eq!(bob.access_code.as_deref(), Some("TOKEN-anon-bob"));
    assert_eq!(server.count("get_session_key"), 1);
    assert_eq!(server.count("add_participants"), 2);
}

/// Tests that anonymous surveys never reach the remote endpoint.
#[tokio::test]
async fn test_anonymous_survey_sends_nothing() {
    let server = spawn_fake_limesurvey().await;
    let mut manager = SurveySessionManager::new(
        server.config(),
        SurveySettings::new(42).anonymous(true),
        SessionState::new(),
    )
    .expect("Failed to build manager");

    let context = present_student_view(&mut manager, Some(&learner("anon-1"))).await;

    assert!(context.show_survey);
    assert_eq!(context.access_code, None);
    assert!(context.survey_url.is_some());
    assert!(server.methods().is_empty());
}

/// Tests that an HTTP failure becomes a message instead of breaking the view.
#[tokio::test]
async fn test_http_failure_is_shown_as_message() {
    let server = spawn_fake_limesurvey().await;
    server.with_fake(|fake| fake.failure = Some((503, "maintenance".to_string())));
    let mut manager = SurveySessionManager::new(
        server.config(),
        SurveySettings::new(42),
        SessionState::with_session_key("key-1"),
    )
    .expect("Failed to build manager");

    let learner_view = present_student_view(&mut manager, Some(&learner("anon-1"))).await;
    assert!(learner_view.show_survey);
    assert_eq!(
        learner_view.error_message.as_deref(),
        Some(ErrorKind::Api.learner_message())
    );

    let staff = learner("anon-staff").staff(true);
    let staff_view = present_student_view(&mut manager, Some(&staff)).await;
    let message = staff_view.error_message.expect("staff should see an error");
    assert!(message.contains("maintenance"), "got: {message}");
    assert_eq!(server.count("get_session_key"), 0);
}

/// Tests that the sample config loads and derives the endpoint.
#[test]
fn test_config_fixture_derives_endpoint() {
    let config = Config::load_from_dir(&fixture_path()).expect("Failed to load config");

    assert_eq!(config.api_user.as_deref(), Some("edx"));
    assert_eq!(config.api_timeout, 3);
    assert_eq!(
        config.internal_api.as_deref(),
        Some("https://survey.example.com/index.php/admin/remotecontrol")
    );
}
