//! Integration tests for session key renewal and the login cooldown.

mod common;

use chrono::{Duration, Utc};
use common::spawn_fake_limesurvey;
use limesurvey_rpc::{ErrorKind, LimeSurveyError};
use limesurvey_session::{
    Config, SessionKeyStatus, SessionState, SurveySessionManager, SurveySettings,
};

/// Tests that a stale key is replaced by exactly one login.
#[tokio::test]
async fn test_stale_key_is_replaced() {
    let server = spawn_fake_limesurvey().await;
    let mut manager = SurveySessionManager::new(
        server.config(),
        SurveySettings::new(42),
        SessionState::with_session_key("stale"),
    )
    .expect("Failed to build manager");

    manager.ensure_session_key().await.expect("login failed");
    manager.ensure_session_key().await.expect("session key check failed");

    assert_eq!(manager.state().session_key.as_deref(), Some("key-1"));
    assert_eq!(manager.state().status(), SessionKeyStatus::Valid);
    assert_eq!(server.count("get_session_key"), 1);
    assert_eq!(server.count("get_summary"), 2);
}

/// Tests that a key expired on the server is renewed only after the cooldown.
#[tokio::test]
async fn test_expired_key_respects_cooldown() {
    let server = spawn_fake_limesurvey().await;
    let mut manager =
        SurveySessionManager::new(server.config(), SurveySettings::new(42), SessionState::new())
            .expect("Failed to build manager");
    manager.ensure_session_key().await.expect("login failed");

    // The server forgets every key.
    server.with_fake(|fake| fake.valid_key = None);

    let mut state = manager.into_state();
    let mut manager =
        SurveySessionManager::new(server.config(), SurveySettings::new(42), state.clone())
            .expect("Failed to build manager");
    let err = manager.ensure_session_key().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ExceededLoginAttempts);
    assert_eq!(server.count("get_session_key"), 1);

    state.record_login_attempt(Utc::now() - Duration::minutes(10));
    let mut manager = SurveySessionManager::new(server.config(), SurveySettings::new(42), state)
        .expect("Failed to build manager");
    manager.ensure_session_key().await.expect("login failed");

    assert_eq!(manager.state().session_key.as_deref(), Some("key-2"));
    assert_eq!(server.count("get_session_key"), 2);
}

/// Tests that a refused login starts the cooldown, also across a state file.
#[tokio::test]
async fn test_refused_login_persists_cooldown() {
    let server = spawn_fake_limesurvey().await;
    let config = Config {
        api_password: Some("wrong".to_string()),
        ..server.config()
    };
    let state_path = std::env::temp_dir()
        .join(format!("limesurvey-it-{}", std::process::id()))
        .join("session.json");

    let mut manager =
        SurveySessionManager::new(config.clone(), SurveySettings::new(42), SessionState::new())
            .expect("Failed to build manager");
    let err = manager.ensure_session_key().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidCredentials);
    manager
        .into_state()
        .save(&state_path)
        .await
        .expect("Failed to save state");

    let state = SessionState::load(&state_path)
        .await
        .expect("Failed to load state")
        .expect("state file should exist");
    assert!(state.last_login_attempt.is_some());

    let mut manager = SurveySessionManager::new(config, SurveySettings::new(42), state)
        .expect("Failed to build manager");
    let err = manager.ensure_session_key().await.unwrap_err();

    assert!(
        matches!(err, LimeSurveyError::ExceededLoginAttempts { retry_after_secs, .. } if retry_after_secs > 0),
        "got: {err:?}"
    );
    assert_eq!(server.count("get_session_key"), 1);

    if let Some(dir) = state_path.parent() {
        std::fs::remove_dir_all(dir).ok();
    }
}

/// Tests that the summary is available once a key is held.
#[tokio::test]
async fn test_summary_after_login() {
    let server = spawn_fake_limesurvey().await;
    let mut manager =
        SurveySessionManager::new(server.config(), SurveySettings::new(42), SessionState::new())
            .expect("Failed to build manager");

    manager.ensure_session_key().await.expect("login failed");
    let summary = manager.survey_summary().await.expect("summary failed");

    assert_eq!(summary["completed_responses"], "0");
}

/// Tests that an unreachable endpoint is a transport failure of the base kind.
#[tokio::test]
async fn test_unreachable_endpoint() {
    let config = Config {
        internal_api: Some("http://127.0.0.1:1/index.php/admin/remotecontrol".to_string()),
        api_timeout: 1,
        ..Config::default()
    };
    let mut manager = SurveySessionManager::new(
        config,
        SurveySettings::new(42),
        SessionState::with_session_key("key-1"),
    )
    .expect("Failed to build manager");

    let err = manager.ensure_session_key().await.unwrap_err();

    assert!(
        matches!(err, LimeSurveyError::Transport { .. }),
        "got: {err:?}"
    );
    assert_eq!(err.kind(), ErrorKind::Api);
}
