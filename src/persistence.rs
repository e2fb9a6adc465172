//! Durable task snapshots for crash-resumable execution.
//!
//! The engine persists a [`PersistedTaskState`] after every successfully
//! completed step, keyed by task id. Any keyed store works behind the
//! [`TaskStore`] trait; the shipped [`FileTaskStore`] keeps one JSON
//! document per task and writes via temp-file + rename so a snapshot is
//! atomic from the caller's perspective -- no partial-write state is ever
//! observable.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::PersistenceError;
use crate::task::{now_iso, PersistedTaskState, Task};

/// Durable keyed store for in-flight task snapshots.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Write or overwrite the snapshot for `state.task.id`.
    async fn save(&self, state: &PersistedTaskState) -> Result<(), PersistenceError>;

    /// Fetch the snapshot for a task id, if one exists.
    async fn get(&self, task_id: &str) -> Result<Option<PersistedTaskState>, PersistenceError>;

    /// Enumerate all snapshots (used to present resumable work).
    async fn list(&self) -> Result<Vec<PersistedTaskState>, PersistenceError>;

    /// Remove the snapshot for a task id. Missing snapshots are fine.
    async fn delete(&self, task_id: &str) -> Result<(), PersistenceError>;
}

/// Build a snapshot for `task` with the index of the last completed step.
pub fn snapshot(
    task: &Task,
    current_step_index: usize,
    original_request: &str,
    workspace_root: &std::path::Path,
) -> PersistedTaskState {
    PersistedTaskState {
        task: task.clone(),
        current_step_index,
        original_request: original_request.to_string(),
        workspace_root: workspace_root.to_path_buf(),
        saved_at: now_iso(),
    }
}

/// One-JSON-file-per-task store.
pub struct FileTaskStore {
    dir: PathBuf,
}

impl FileTaskStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Platform default: `{data_dir}/conductor/tasks`.
    pub fn default_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "conductor")
            .map(|dirs| dirs.data_dir().join("tasks"))
    }

    fn path_for(&self, task_id: &str) -> PathBuf {
        self.dir.join(format!("task-{task_id}.json"))
    }
}

#[async_trait]
impl TaskStore for FileTaskStore {
    async fn save(&self, state: &PersistedTaskState) -> Result<(), PersistenceError> {
        let path = self.path_for(&state.task.id);
        let tmp_path = self.dir.join(format!(".task-{}.json.tmp", state.task.id));

        let json = serde_json::to_vec_pretty(state).map_err(|e| PersistenceError::Corrupt {
            path: path.clone(),
            message: format!("serialization failed: {e}"),
        })?;

        // Write-then-rename keeps the snapshot atomic for readers.
        tokio::fs::write(&tmp_path, &json).await?;
        tokio::fs::rename(&tmp_path, &path).await?;

        tracing::debug!(task_id = %state.task.id, step_index = state.current_step_index, "snapshot saved");
        Ok(())
    }

    async fn get(&self, task_id: &str) -> Result<Option<PersistedTaskState>, PersistenceError> {
        let path = self.path_for(task_id);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let state = serde_json::from_str(&contents).map_err(|e| PersistenceError::Corrupt {
            path,
            message: e.to_string(),
        })?;
        Ok(Some(state))
    }

    async fn list(&self) -> Result<Vec<PersistedTaskState>, PersistenceError> {
        let mut states = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !name.starts_with("task-") || !name.ends_with(".json") {
                continue;
            }

            let contents = tokio::fs::read_to_string(entry.path()).await?;
            match serde_json::from_str::<PersistedTaskState>(&contents) {
                Ok(state) => states.push(state),
                Err(e) => {
                    // A corrupt entry should not hide the healthy ones.
                    tracing::warn!(path = %entry.path().display(), error = %e, "skipping corrupt snapshot");
                }
            }
        }

        states.sort_by(|a, b| a.saved_at.cmp(&b.saved_at));
        Ok(states)
    }

    async fn delete(&self, task_id: &str) -> Result<(), PersistenceError> {
        match tokio::fs::remove_file(self.path_for(task_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
