//! Plotline CLI - plan stories from the terminal
//!
//! Every command opens a sync session for the selected profile, works on the
//! reconciled local store, and uploads its changes before exiting.

mod auth;
mod cli;
mod commands;
mod config_profiles;
mod error;
mod session;


use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::add::run_add;
use crate::commands::auth_cmd::run_auth;
use crate::commands::common::session_options;
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::delete::run_delete;
use crate::commands::edit::run_edit;
use crate::commands::export::run_export;
use crate::commands::list::run_list;
use crate::commands::show::run_show;
use crate::commands::sync::run_sync;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let directive = "plotline_cli=info"
        .parse()
        .map_err(|error| CliError::Config(format!("Invalid log directive: {error}")))?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(directive))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let profile = cli.profile.as_deref();

    match cli.command {
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref())?,
        Commands::Config { command } => run_config(command, profile)?,
        command => {
            let options = session_options(profile, cli.data_dir)?;
            match command {
                Commands::Add { entity } => run_add(entity, &options).await?,
                Commands::List { kind, story, json } => {
                    run_list(kind.into(), story.as_deref(), json, &options).await?;
                }
                Commands::Show { story } => run_show(&story, &options).await?,
                Commands::Edit(args) => run_edit(args, &options).await?,
                Commands::Delete { kind, id } => run_delete(kind.into(), &id, &options).await?,
                Commands::Export {
                    format,
                    story,
                    output,
                } => {
                    run_export(format, story.as_deref(), output.as_deref(), &options).await?;
                }
                Commands::Sync { json } => run_sync(json, &options).await?,
                Commands::Auth { command } => run_auth(command, &options).await?,
                Commands::Completions { .. } | Commands::Config { .. } => {}
            }
        }
    }

    Ok(())
}
