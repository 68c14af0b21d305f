//! LimeSurvey CLI
//!
//! Plays the host of a survey block from a terminal: renders the student
//! view for a learner, checks participants, and prints survey summaries.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use limesurvey_session::{
    present_student_view, Config, LearnerContext, SessionState, SurveySessionManager,
    SurveySettings,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

/// Default location of the persisted session state.
const DEFAULT_STATE_FILE: &str = ".limesurvey/session.json";

/// LimeSurvey - embedded survey host
///
/// Registers learners as participants of a LimeSurvey survey and hands out
/// their survey URL and access code.
#[derive(Parser, Debug)]
#[command(name = "limesurvey")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (default: limesurvey.json in current directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Path to the session state file
    #[arg(long, value_name = "FILE", default_value = DEFAULT_STATE_FILE)]
    state: PathBuf,

    /// LimeSurvey survey id
    #[arg(long, value_name = "ID")]
    survey_id: u64,

    /// Treat the survey as anonymous (no participant registration)
    #[arg(long)]
    anonymous: bool,

    /// API user for this survey block, overriding the configuration
    #[arg(long, value_name = "USER")]
    api_user: Option<String>,

    /// API password for this survey block, overriding the configuration
    #[arg(long, value_name = "PASSWORD")]
    api_password: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the student view for a learner and print it as JSON
    View {
        /// Opaque learner id used to correlate participants
        #[arg(long)]
        anonymous_id: String,

        /// Learner e-mail address
        #[arg(long)]
        email: String,

        /// Learner full name
        #[arg(long, default_value = "")]
        full_name: String,

        /// Render as course staff (full error messages)
        #[arg(long)]
        staff: bool,
    },

    /// Check whether a learner is a survey participant
    Check {
        /// Opaque learner id used to correlate participants
        #[arg(long)]
        anonymous_id: String,
    },

    /// Print the survey summary
    Summary,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if args.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // Logs go to stderr so stdout stays machine readable.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(config = ?args.config, state = %args.state.display(), "Starting");

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

/// Loads state, runs the subcommand, and saves state again.
///
/// State is saved even when the subcommand fails, so a failed login still
/// starts the cooldown window.
async fn run(args: Args) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    let survey = SurveySettings::new(args.survey_id)
        .anonymous(args.anonymous)
        .with_credentials(args.api_user, args.api_password);
    let state = load_state(&args.state).await?;

    let mut manager = SurveySessionManager::new(config, survey, state)?;
    let outcome = run_command(&mut manager, args.command).await;

    manager.into_state().save(&args.state).await?;
    tracing::debug!(state = %args.state.display(), "Session state saved");

    outcome
}

async fn run_command(manager: &mut SurveySessionManager, command: Command) -> anyhow::Result<()> {
    match command {
        Command::View {
            anonymous_id,
            email,
            full_name,
            staff,
        } => {
            let learner = LearnerContext::new(anonymous_id, email, full_name).staff(staff);
            let context = present_student_view(manager, Some(&learner)).await;
            println!("{}", serde_json::to_string_pretty(&context)?);
        }
        Command::Check { anonymous_id } => {
            manager.ensure_session_key().await?;
            let status = manager.check_participant(&anonymous_id).await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "anonymous_id": anonymous_id,
                    "status": status,
                }))?
            );
        }
        Command::Summary => {
            manager.ensure_session_key().await?;
            let summary = manager.survey_summary().await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }
    Ok(())
}

/// Loads configuration from the given path or the default location.
fn load_config(config_path: Option<&str>) -> anyhow::Result<Config> {
    match config_path {
        Some(path_str) => {
            let path = Path::new(path_str);
            if !path.exists() {
                anyhow::bail!(
                    "Config file not found: '{}'\n\nSuggestion: Check the path or remove the --config flag to use defaults",
                    path.display()
                );
            }
            Ok(Config::load_from_file(path)?)
        }
        None => Ok(Config::load()?),
    }
}

/// Loads the session state, starting empty when no file exists.
async fn load_state(state_path: &Path) -> anyhow::Result<SessionState> {
    match SessionState::load(state_path).await? {
        Some(state) => {
            tracing::info!(status = %state.status(), "Loaded session state");
            Ok(state)
        }
        None => {
            tracing::info!("No session state found, starting fresh");
            Ok(SessionState::new())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_view_command() {
        let args = Args::try_parse_from([
            "limesurvey",
            "--survey-id",
            "42",
            "view",
            "--anonymous-id",
            "anon-1",
            "--email",
            "ada@example.com",
            "--full-name",
            "Ada Lovelace",
        ])
        .unwrap();

        assert_eq!(args.survey_id, 42);
        assert_eq!(args.state, PathBuf::from(DEFAULT_STATE_FILE));
        assert!(matches!(
            args.command,
            Command::View { ref anonymous_id, staff: false, .. } if anonymous_id == "anon-1"
        ));
    }

    #[test]
    fn survey_id_is_required() {
        assert!(Args::try_parse_from(["limesurvey", "summary"]).is_err());
    }
}
