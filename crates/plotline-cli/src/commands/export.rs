use std::path::Path;

use plotline_core::export::{render_snapshot_export, scoped_to_story};
use plotline_core::models::Story;
use plotline_core::{LocalStore, SnapshotStore};

use crate::cli::ExportFormat;
use crate::commands::common::{open_session, resolve_entity};
use crate::error::CliError;
use crate::session::SessionOptions;

pub async fn run_export(
    format: ExportFormat,
    story: Option<&str>,
    output_path: Option<&Path>,
    options: &SessionOptions,
) -> Result<(), CliError> {
    let session = open_session(options).await?;
    let rendered = render_export(&session.store, format, story)?;
    session.finish().await?;

    if let Some(path) = output_path {
        std::fs::write(path, rendered)?;
        println!("{}", path.display());
    } else {
        println!("{rendered}");
    }

    Ok(())
}

pub fn render_export(
    store: &LocalStore,
    format: ExportFormat,
    story: Option<&str>,
) -> Result<String, CliError> {
    let snapshot = store.export_snapshot();
    let snapshot = match story {
        Some(query) => {
            let story = resolve_entity::<Story>(store, query)?;
            scoped_to_story(&snapshot, &story.id)
        }
        None => snapshot,
    };

    Ok(render_snapshot_export(&snapshot, format.into())?)
}
