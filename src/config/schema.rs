use serde::Deserialize;
use std::path::PathBuf;

/// The TOML file structure for conductor.toml.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    pub general: Option<GeneralConfig>,
    pub execution: Option<ExecutionConfig>,
}

#[derive(Debug, Deserialize)]
pub struct GeneralConfig {
    pub workspace: Option<String>,
    pub state_dir: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExecutionConfig {
    /// Skip all approval prompts (headless execution).
    pub auto_approve: Option<bool>,
    /// Retries applied to steps that don't set their own limit.
    pub default_max_retries: Option<u32>,
}

impl ConfigFile {
    pub fn to_partial(self) -> PartialConfig {
        let general = self.general.unwrap_or(GeneralConfig {
            workspace: None,
            state_dir: None,
        });
        let execution = self.execution.unwrap_or(ExecutionConfig {
            auto_approve: None,
            default_max_retries: None,
        });
        PartialConfig {
            workspace: general.workspace.map(PathBuf::from),
            state_dir: general.state_dir.map(PathBuf::from),
            auto_approve: execution.auto_approve,
            default_max_retries: execution.default_max_retries,
        }
    }
}

/// Fully-resolved runtime configuration. All fields have values.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub workspace: PathBuf,
    pub state_dir: PathBuf,
    pub auto_approve: bool,
    pub default_max_retries: u32,
}

/// Partial config used during merge. All fields are Option so that
/// missing fields don't override lower-priority values.
#[derive(Debug, Clone, Default)]
pub struct PartialConfig {
    pub workspace: Option<PathBuf>,
    pub state_dir: Option<PathBuf>,
    pub auto_approve: Option<bool>,
    pub default_max_retries: Option<u32>,
}
