pub mod merge;
pub mod schema;

pub use schema::*;

use crate::cli::{Cli, Commands};
use anyhow::Context;
use std::path::Path;

/// Load configuration by merging global, workspace, and CLI sources.
/// Precedence: CLI > workspace config > global config > defaults.
///
/// Missing config files are handled gracefully (defaults apply).
pub fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let global = load_global_config();

    // Workspace path comes from the CLI or global config; it decides where
    // the workspace-level config file is looked up.
    let workspace_path = cli_workspace(cli)
        .or_else(|| global.workspace.clone())
        .unwrap_or_else(|| std::path::PathBuf::from("./workspace"));

    let workspace = load_workspace_config(&workspace_path);
    let cli_partial = cli_to_partial(cli);

    Ok(cli_partial
        .with_fallback(workspace)
        .with_fallback(global)
        .finalize())
}

/// Load global config from the platform-specific config directory.
/// Returns empty PartialConfig if file not found.
fn load_global_config() -> PartialConfig {
    match global_config_path() {
        Some(p) => load_toml_file(&p).unwrap_or_default(),
        None => {
            tracing::debug!("Could not determine global config directory");
            PartialConfig::default()
        }
    }
}

/// Load workspace config from workspace/conductor.toml.
/// Returns empty PartialConfig if file not found.
fn load_workspace_config(workspace_path: &Path) -> PartialConfig {
    let config_path = workspace_path.join("conductor.toml");
    load_toml_file(&config_path).unwrap_or_default()
}

fn load_toml_file(path: &Path) -> Option<PartialConfig> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            match toml::from_str::<ConfigFile>(&contents)
                .context(format!("Failed to parse {}", path.display()))
            {
                Ok(config_file) => {
                    tracing::info!("Loaded config from {}", path.display());
                    Some(config_file.to_partial())
                }
                Err(e) => {
                    tracing::warn!("Config parse error: {:#}", e);
                    None
                }
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config file at {}, using defaults", path.display());
            None
        }
        Err(e) => {
            tracing::warn!("Failed to read config at {}: {}", path.display(), e);
            None
        }
    }
}

/// Resolve the platform-specific global config path.
/// Linux: ~/.config/conductor/conductor.toml
/// macOS: ~/Library/Application Support/conductor/conductor.toml
fn global_config_path() -> Option<std::path::PathBuf> {
    directories::ProjectDirs::from("", "", "conductor")
        .map(|dirs| dirs.config_dir().join("conductor.toml"))
}

fn cli_workspace(cli: &Cli) -> Option<std::path::PathBuf> {
    match &cli.command {
        Commands::Run { workspace, .. } => workspace.clone(),
        Commands::Ask { workspace, .. } => workspace.clone(),
        Commands::Resume { .. } | Commands::List { .. } => None,
    }
}

/// Convert CLI arguments to a PartialConfig for merging.
fn cli_to_partial(cli: &Cli) -> PartialConfig {
    match &cli.command {
        Commands::Run {
            workspace,
            state_dir,
            auto_approve,
            ..
        } => PartialConfig {
            workspace: workspace.clone(),
            state_dir: state_dir.clone(),
            auto_approve: auto_approve.then_some(true),
            ..Default::default()
        },
        Commands::Resume {
            state_dir,
            auto_approve,
            ..
        } => PartialConfig {
            state_dir: state_dir.clone(),
            auto_approve: auto_approve.then_some(true),
            ..Default::default()
        },
        Commands::List { state_dir } => PartialConfig {
            state_dir: state_dir.clone(),
            ..Default::default()
        },
        Commands::Ask { workspace, .. } => PartialConfig {
            workspace: workspace.clone(),
            ..Default::default()
        },
    }
}
