//! Best-effort compensating rollback.
//!
//! After a fatal failure the execution history is walked in reverse and
//! every file a completed step reported as created is deleted. Only
//! created files can be undone reliably; modified and deleted files are
//! reported as unrecoverable rather than silently ignored, since restoring
//! them would require a backup component this engine does not have.
//! Rollback never raises -- individual undo failures are logged and folded
//! into the structured outcome.

use std::path::PathBuf;

use serde::Serialize;

use crate::engine::events::{EngineEvent, EventSink, FileChange};
use crate::task::StepResult;

/// Structured report of a rollback pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RollbackOutcome {
    /// True when every undo operation succeeded.
    pub success: bool,
    /// History entries processed (all of them, even if some undos failed).
    pub steps_rolled_back: usize,
    /// Created files that were successfully removed.
    pub files_restored: Vec<PathBuf>,
    /// Modified/deleted files that cannot be restored without a backup.
    pub unrecoverable: Vec<PathBuf>,
    /// First undo failure, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Undo the side effects recorded in `history`, newest first.
///
/// The history is cleared afterward regardless of outcome.
pub async fn rollback_history(history: &mut Vec<StepResult>, events: &EventSink) -> RollbackOutcome {
    let mut outcome = RollbackOutcome {
        success: true,
        ..Default::default()
    };

    for result in history.iter().rev() {
        outcome.steps_rolled_back += 1;

        for path in result.files_created.iter().rev() {
            match tokio::fs::remove_file(path).await {
                Ok(()) => {
                    events.emit(EngineEvent::FileChanged {
                        path: path.clone(),
                        change: FileChange::Deleted,
                    });
                    outcome.files_restored.push(path.clone());
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    // Already gone; nothing to undo.
                    outcome.files_restored.push(path.clone());
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "rollback delete failed");
                    outcome.success = false;
                    if outcome.error.is_none() {
                        outcome.error = Some(format!("failed to delete {}: {e}", path.display()));
                    }
                }
            }
        }

        for path in result.files_modified.iter().chain(result.files_deleted.iter()) {
            tracing::warn!(
                path = %path.display(),
                "cannot restore modified/deleted file without a backup"
            );
            outcome.unrecoverable.push(path.clone());
        }
    }

    history.clear();
    outcome
}
