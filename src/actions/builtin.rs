//! Built-in action executors.
//!
//! File actions keep their side effects inside the workspace directory
//! (writes and deletes are containment-checked against the canonicalized
//! workspace root; reads are unrestricted). Every file side effect is
//! reported both on the [`StepResult`] file lists -- which is what makes
//! compensating rollback possible -- and as a `FileChanged` event.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::json;

use super::{ActionContext, ActionExecutor};
use crate::engine::events::{EngineEvent, FileChange};
use crate::error::ActionError;
use crate::task::StepResult;

/// Extract a required string parameter or fail non-retryably.
fn require_str<'a>(
    params: &'a serde_json::Value,
    key: &str,
    kind: &str,
) -> Result<&'a str, ActionError> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ActionError::InvalidParams {
            kind: kind.to_string(),
            message: format!("missing or invalid '{key}' argument"),
        })
}

/// Resolve `rel` inside the workspace and verify containment.
///
/// Containment is checked lexically before any directory is created, so a
/// rejected path leaves no side effects on disk. The canonical check after
/// directory creation catches symlinks pointing out of the workspace.
/// Escapes are a non-retryable domain error.
async fn resolve_in_workspace(workspace: &Path, rel: &str) -> Result<PathBuf, ActionError> {
    let rel_path = Path::new(rel);
    if rel_path.is_absolute() {
        return Err(ActionError::NonRetryable(format!(
            "path '{rel}' must be relative to the workspace root"
        )));
    }
    if rel_path
        .components()
        .any(|c| matches!(c, std::path::Component::ParentDir))
    {
        return Err(ActionError::NonRetryable(format!(
            "path '{rel}' is outside the workspace directory"
        )));
    }

    let full_path = workspace.join(rel_path);

    let parent = full_path
        .parent()
        .ok_or_else(|| ActionError::NonRetryable(format!("path '{rel}' has no parent directory")))?;
    tokio::fs::create_dir_all(parent)
        .await
        .map_err(|e| ActionError::Retryable(format!("failed to create directories: {e}")))?;

    let ws_root = tokio::fs::canonicalize(workspace)
        .await
        .map_err(|e| ActionError::NonRetryable(format!("workspace root is not accessible: {e}")))?;
    let canonical_parent = tokio::fs::canonicalize(parent)
        .await
        .map_err(|e| ActionError::Retryable(format!("failed to resolve path: {e}")))?;
    let canonical_target = canonical_parent.join(full_path.file_name().unwrap_or_default());

    if !canonical_target.starts_with(&ws_root) {
        return Err(ActionError::NonRetryable(format!(
            "path '{rel}' is outside the workspace directory"
        )));
    }

    Ok(canonical_target)
}

/// Write content to a workspace-relative path.
///
/// Params: `path` (string), `content` (string).
pub struct FileWrite;

#[async_trait]
impl ActionExecutor for FileWrite {
    async fn execute(
        &self,
        params: &serde_json::Value,
        ctx: &ActionContext,
    ) -> Result<StepResult, ActionError> {
        let rel = require_str(params, "path", "file_write")?;
        let content = require_str(params, "content", "file_write")?;

        let target = resolve_in_workspace(&ctx.workspace, rel).await?;
        let pre_existing = target.exists();

        tokio::fs::write(&target, content)
            .await
            .map_err(|e| ActionError::Retryable(format!("file_write: {e}")))?;

        let change = if pre_existing {
            FileChange::Modified
        } else {
            FileChange::Created
        };
        ctx.events.emit(EngineEvent::FileChanged {
            path: target.clone(),
            change,
        });

        let mut result = StepResult::ok(format!("wrote {} bytes to {rel}", content.len()));
        result.data = Some(json!({ "path": rel, "written_bytes": content.len() }));
        if pre_existing {
            result.files_modified.push(target);
        } else {
            result.files_created.push(target);
        }
        Ok(result)
    }

    fn validate_params(&self, params: &serde_json::Value) -> bool {
        params.get("path").and_then(|v| v.as_str()).is_some()
            && params.get("content").and_then(|v| v.as_str()).is_some()
    }
}

/// Read a file, workspace-relative or absolute. Reads are unrestricted.
///
/// Params: `path` (string). A missing file is a non-retryable domain
/// error -- retrying cannot make it appear.
pub struct FileRead;

#[async_trait]
impl ActionExecutor for FileRead {
    async fn execute(
        &self,
        params: &serde_json::Value,
        ctx: &ActionContext,
    ) -> Result<StepResult, ActionError> {
        let rel = require_str(params, "path", "file_read")?;

        let full_path = if Path::new(rel).is_absolute() {
            PathBuf::from(rel)
        } else {
            ctx.workspace.join(rel)
        };

        match tokio::fs::read_to_string(&full_path).await {
            Ok(content) => {
                let mut result = StepResult::ok(format!("read {} bytes from {rel}", content.len()));
                result.data = Some(json!({ "path": rel, "content": content }));
                Ok(result)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ActionError::NonRetryable(
                format!("referenced file does not exist: {rel}"),
            )),
            Err(e) => Err(ActionError::Retryable(format!("file_read: {e}"))),
        }
    }

    fn validate_params(&self, params: &serde_json::Value) -> bool {
        params.get("path").and_then(|v| v.as_str()).is_some()
    }
}

/// Delete a workspace-relative file.
///
/// Params: `path` (string).
pub struct FileDelete;

#[async_trait]
impl ActionExecutor for FileDelete {
    async fn execute(
        &self,
        params: &serde_json::Value,
        ctx: &ActionContext,
    ) -> Result<StepResult, ActionError> {
        let rel = require_str(params, "path", "file_delete")?;
        let target = resolve_in_workspace(&ctx.workspace, rel).await?;

        match tokio::fs::remove_file(&target).await {
            Ok(()) => {
                ctx.events.emit(EngineEvent::FileChanged {
                    path: target.clone(),
                    change: FileChange::Deleted,
                });
                let mut result = StepResult::ok(format!("deleted {rel}"));
                result.files_deleted.push(target);
                Ok(result)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ActionError::NonRetryable(
                format!("referenced file does not exist: {rel}"),
            )),
            Err(e) => Err(ActionError::Retryable(format!("file_delete: {e}"))),
        }
    }

    fn validate_params(&self, params: &serde_json::Value) -> bool {
        params.get("path").and_then(|v| v.as_str()).is_some()
    }
}

/// Ask the language-model collaborator to generate text.
///
/// Params: `prompt` (string). The output lands in
/// `StepResult.data["ai_content"]`, which is what auto-synthesis scans for.
pub struct GenerateContent;

#[async_trait]
impl ActionExecutor for GenerateContent {
    async fn execute(
        &self,
        params: &serde_json::Value,
        ctx: &ActionContext,
    ) -> Result<StepResult, ActionError> {
        let prompt = require_str(params, "prompt", "generate_content")?;

        let mut context = std::collections::HashMap::new();
        context.insert("task".to_string(), ctx.task_title.clone());
        context.insert("task_id".to_string(), ctx.task_id.clone());

        let content = ctx
            .llm
            .generate(prompt, &context)
            .await
            .map_err(|e| ActionError::Retryable(format!("generation failed: {e}")))?;

        let mut result = StepResult::ok(format!("generated {} chars", content.len()));
        result.data = Some(json!({ "ai_content": content }));
        Ok(result)
    }

    fn validate_params(&self, params: &serde_json::Value) -> bool {
        params.get("prompt").and_then(|v| v.as_str()).is_some()
    }
}
