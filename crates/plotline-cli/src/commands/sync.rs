use plotline_core::state::SyncReport;
use plotline_core::sync::PushOutcome;
use serde::Serialize;

use crate::commands::common::{describe_push_outcome, format_report_lines, open_session};
use crate::error::CliError;
use crate::session::SessionOptions;

#[derive(Debug, Serialize)]
struct SyncSummary<'a> {
    api_base_url: &'a str,
    outcome: PushOutcome,
    report: SyncReport,
}

/// Pull and reconcile, then upload the reconciled state.
///
/// Signed out, the upload is a scratch save.
pub async fn run_sync(as_json: bool, options: &SessionOptions) -> Result<(), CliError> {
    let session = open_session(options).await?;
    let outcome = session.coordinator.flush().await;
    session.coordinator.shutdown();

    let report = session.coordinator.report();
    if as_json {
        let summary = SyncSummary {
            api_base_url: session.api_base_url(),
            outcome,
            report,
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Sync {}", describe_push_outcome(outcome));
        for line in format_report_lines(&report, session.api_base_url()) {
            println!("{line}");
        }
    }

    if outcome == PushOutcome::Failed {
        return Err(CliError::Upload(format!(
            "the server at {} did not accept the update",
            session.api_base_url()
        )));
    }
    Ok(())
}
