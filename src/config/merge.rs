use super::schema::{AppConfig, PartialConfig};
use crate::persistence::FileTaskStore;
use std::path::PathBuf;

impl PartialConfig {
    /// Merge self with a lower-priority fallback.
    /// Self's non-None values take precedence.
    pub fn with_fallback(self, fallback: PartialConfig) -> PartialConfig {
        PartialConfig {
            workspace: self.workspace.or(fallback.workspace),
            state_dir: self.state_dir.or(fallback.state_dir),
            auto_approve: self.auto_approve.or(fallback.auto_approve),
            default_max_retries: self.default_max_retries.or(fallback.default_max_retries),
        }
    }

    /// Convert to AppConfig, filling any remaining gaps with defaults.
    pub fn finalize(self) -> AppConfig {
        let workspace = self.workspace.unwrap_or_else(|| PathBuf::from("./workspace"));
        let state_dir = self
            .state_dir
            .or_else(FileTaskStore::default_dir)
            .unwrap_or_else(|| workspace.join(".conductor/tasks"));

        AppConfig {
            workspace,
            state_dir,
            auto_approve: self.auto_approve.unwrap_or(false),
            default_max_retries: self.default_max_retries.unwrap_or(2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn higher_priority_values_win() {
        let high = PartialConfig {
            workspace: Some(PathBuf::from("/high")),
            auto_approve: Some(true),
            ..Default::default()
        };
        let low = PartialConfig {
            workspace: Some(PathBuf::from("/low")),
            state_dir: Some(PathBuf::from("/low/state")),
            ..Default::default()
        };

        let merged = high.with_fallback(low);
        assert_eq!(merged.workspace, Some(PathBuf::from("/high")));
        assert_eq!(merged.state_dir, Some(PathBuf::from("/low/state")));
        assert_eq!(merged.auto_approve, Some(true));
    }

    #[test]
    fn finalize_fills_defaults() {
        let config = PartialConfig::default().finalize();
        assert_eq!(config.workspace, PathBuf::from("./workspace"));
        assert!(!config.auto_approve);
        assert_eq!(config.default_max_retries, 2);
    }
}
