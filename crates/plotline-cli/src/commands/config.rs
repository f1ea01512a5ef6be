use std::env;
use std::path::Path;

use plotline_core::config::DEFAULT_API_BASE_URL;
use plotline_core::util::normalize_text_option;

use crate::cli::ConfigCommands;
use crate::config_profiles::{default_config_path, CliProfilesConfig};
use crate::error::CliError;

pub fn run_config(command: ConfigCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    let path = default_config_path().map_err(CliError::Config)?;
    match command {
        ConfigCommands::Init {
            profile,
            api_url,
            no_activate,
        } => {
            let (profile_name, api_base_url) = run_config_init(
                &path,
                profile.as_deref().or(global_profile),
                api_url,
                no_activate,
            )?;
            println!("Profile '{profile_name}' initialized at {}", path.display());
            println!(
                "Using {api_base_url}. Run `plotline auth login --email <email> --password <password>` to sign in."
            );
            Ok(())
        }
        ConfigCommands::Show => {
            for line in describe_config(&path, global_profile)? {
                println!("{line}");
            }
            Ok(())
        }
    }
}

/// Writes the profile and returns its name with the effective API URL.
///
/// The URL comes from `--api-url`, then `PLOTLINE_API_URL`, then whatever the
/// profile already had.
pub fn run_config_init(
    path: &Path,
    profile_name: Option<&str>,
    api_url: Option<String>,
    no_activate: bool,
) -> Result<(String, String), CliError> {
    let mut config = CliProfilesConfig::load_from_path(path).map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);

    let merged_api_url = normalize_text_option(api_url)
        .or_else(|| normalize_text_option(env::var("PLOTLINE_API_URL").ok()));

    let profile = config.profile_mut_or_default(&profile_name);
    if let Some(url) = merged_api_url {
        profile.api_base_url = Some(url);
    }
    profile.validate().map_err(CliError::Config)?;
    let effective_url = profile
        .api_base_url()
        .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

    if !no_activate {
        config.active_profile = Some(profile_name.clone());
    }

    config.save_to_path(path).map_err(CliError::Config)?;
    tracing::debug!(profile = %profile_name, "Saved CLI profile");
    Ok((profile_name, effective_url))
}

pub fn describe_config(path: &Path, global_profile: Option<&str>) -> Result<Vec<String>, CliError> {
    let config = CliProfilesConfig::load_from_path(path).map_err(CliError::Config)?;
    let resolved = config.resolve_profile_name(global_profile);

    let mut lines = vec![
        format!("Config file:    {}", path.display()),
        format!("Active profile: {resolved}"),
    ];
    if config.profiles.is_empty() {
        lines.push("No profiles configured; using PLOTLINE_API_URL or the default server.".to_string());
    }
    for (name, profile) in &config.profiles {
        let marker = if *name == resolved { "*" } else { " " };
        let url = profile
            .api_base_url()
            .unwrap_or_else(|| "(default)".to_string());
        lines.push(format!("{marker} {name:<16} {url}"));
    }
    Ok(lines)
}
