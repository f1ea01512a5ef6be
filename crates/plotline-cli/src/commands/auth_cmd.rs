use plotline_core::auth::Credentials;
use serde::Serialize;

use crate::cli::AuthCommands;
use crate::commands::common::{format_report_lines, format_timestamp, open_session};
use crate::error::CliError;
use crate::session::{CliSession, SessionOptions};

#[derive(Debug, Serialize)]
struct AuthStatus<'a> {
    profile: &'a str,
    api_base_url: &'a str,
    expires_at: Option<i64>,
    report: plotline_core::state::SyncReport,
}

pub async fn run_auth(command: AuthCommands, options: &SessionOptions) -> Result<(), CliError> {
    match command {
        AuthCommands::Login { email, password } => {
            let session = open_session(options).await?;
            let user = session
                .coordinator
                .login(&Credentials::new(email, password))
                .await?;
            session.rebaseline();
            session.finish().await?;

            println!(
                "Signed in profile '{}' as {}",
                session.profile_name,
                user.label()
            );
            Ok(())
        }
        AuthCommands::Register { email, password } => {
            let session = open_session(options).await?;
            let user = session
                .coordinator
                .register(&Credentials::new(email, password))
                .await?;
            session.rebaseline();
            session.finish().await?;

            println!(
                "Registered and signed in profile '{}' as {}",
                session.profile_name,
                user.label()
            );
            Ok(())
        }
        AuthCommands::Status { json } => run_status(json, options).await,
        AuthCommands::Logout => {
            let session = open_session(options).await?;
            session.coordinator.logout().await?;
            // Logout already cleared the store and the scratch copy.
            session.coordinator.shutdown();

            println!("Signed out profile '{}'", session.profile_name);
            Ok(())
        }
    }
}

/// Status still reports when the server is unreachable; the failed pull
/// shows up as a degraded status.
async fn run_status(as_json: bool, options: &SessionOptions) -> Result<(), CliError> {
    let session = CliSession::open(options)?;
    if let Err(error) = session.start().await {
        tracing::warn!("Could not reach the server: {}", error);
    }
    session.coordinator.shutdown();

    let report = session.coordinator.report();
    let expires_at = session.session_expires_at();

    if as_json {
        let status = AuthStatus {
            profile: &session.profile_name,
            api_base_url: session.api_base_url(),
            expires_at,
            report,
        };
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("Profile:     {}", session.profile_name);
    for line in format_report_lines(&report, session.api_base_url()) {
        println!("{line}");
    }
    if let Some(expires_at) = expires_at {
        let expires = chrono::DateTime::from_timestamp(expires_at, 0);
        println!("Expires:     {}", format_timestamp(expires));
    }
    Ok(())
}
