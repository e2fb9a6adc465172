//! Type definitions for tasks, steps, actions, and execution results.
//!
//! These types form the shared vocabulary between the lifecycle manager,
//! the step runner, the snapshot store, and the CLI. Everything that can
//! land in a snapshot derives [`serde::Serialize`] and
//! [`serde::Deserialize`].

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Unique identifier for a task. UUID v4 strings, readable in logs.
pub type TaskId = String;

/// Unique identifier for a step within a task.
pub type StepId = String;

/// Returns the current UTC time as an ISO 8601 string with milliseconds.
pub fn now_iso() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Steps assembled, execution not started.
    Planning,
    /// The per-step loop is running.
    InProgress,
    /// Stopped at a step boundary; resumable from the snapshot store.
    Paused,
    /// All steps completed (plus optional synthesis step).
    Completed,
    /// A step failed with retries exhausted; rollback was attempted.
    Failed,
    /// An approval was rejected. Not an error state.
    Cancelled,
}

/// Lifecycle status of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    AwaitingApproval,
    Approved,
    Rejected,
    InProgress,
    Completed,
    Failed,
}

/// The typed operation a step performs via the action registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Registry key, e.g. `file_write` or `generate_content`.
    pub kind: String,
    /// Opaque parameter bag interpreted by the executor.
    #[serde(default)]
    pub params: serde_json::Value,
}

impl Action {
    pub fn new(kind: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            params,
        }
    }
}

/// Outcome of one step attempt.
///
/// The file lists feed compensating rollback: only `files_created` can be
/// undone reliably; modified/deleted entries are reported as unrecoverable
/// without a prior backup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepResult {
    pub success: bool,
    pub message: String,
    /// Opaque result payload. `generate_content` stores its output under
    /// the `ai_content` key, which is what auto-synthesis looks for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files_created: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files_modified: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files_deleted: Vec<PathBuf>,
}

impl StepResult {
    /// A successful result with just a message.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            ..Default::default()
        }
    }

    /// A failed result with just a message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            ..Default::default()
        }
    }

    /// The AI-generated content payload, if this result carries one.
    pub fn ai_content(&self) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|d| d.get("ai_content"))
            .and_then(|v| v.as_str())
    }
}

/// One discrete, independently retryable unit of execution within a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub id: StepId,
    pub task_id: TaskId,
    /// 1-based position; strictly increasing and unique within a task.
    pub order: u32,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub action: Action,
    pub status: StepStatus,
    /// Human-in-the-loop gate. A step with this set never transitions to
    /// `InProgress` until `approved` is true.
    #[serde(default)]
    pub requires_approval: bool,
    #[serde(default)]
    pub approved: bool,
    /// Number of *retries* allowed after the first attempt.
    #[serde(default)]
    pub max_retries: u32,
    /// Retries actually performed. Informational after success.
    #[serde(default)]
    pub retry_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<StepResult>,
}

impl Step {
    pub fn new(task_id: &str, order: u32, title: impl Into<String>, action: Action) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            task_id: task_id.to_string(),
            order,
            title: title.into(),
            description: String::new(),
            action,
            status: StepStatus::Pending,
            requires_approval: false,
            approved: false,
            max_retries: 0,
            retry_count: 0,
            result: None,
        }
    }
}

/// Bookkeeping recorded on the task as it runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskMetadata {
    /// Wall-clock execution time in milliseconds, set at termination.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<u64>,
    pub completed_steps: usize,
    pub total_steps: usize,
}

/// A unit of work composed of ordered steps pursuing one user request.
///
/// Owned exclusively by the lifecycle manager while executing; the
/// snapshot store holds a copy between runs. Steps are immutable in count
/// and order once execution starts, except for the single synthesis step
/// that may be appended after normal completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub steps: Vec<Step>,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    /// Non-empty exactly when status is `Failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub metadata: TaskMetadata,
}

impl Task {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            description: description.into(),
            steps: Vec::new(),
            status: TaskStatus::Planning,
            started_at: None,
            completed_at: None,
            error: None,
            metadata: TaskMetadata::default(),
        }
    }

    /// Append a step with the next `order` value.
    pub fn push_step(&mut self, title: impl Into<String>, action: Action) -> &mut Step {
        let order = self.steps.last().map(|s| s.order + 1).unwrap_or(1);
        let step = Step::new(&self.id, order, title, action);
        self.steps.push(step);
        self.steps.last_mut().unwrap()
    }

    /// Count of steps that reached `Completed`.
    pub fn completed_steps(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .count()
    }
}

/// Immutable, fully-self-describing snapshot of an in-flight task.
///
/// Written after each successfully completed step so resumption never
/// depends on in-memory state surviving a crash. `current_step_index` is
/// the index of the last completed step; resume restarts at the next one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedTaskState {
    pub task: Task,
    pub current_step_index: usize,
    pub original_request: String,
    pub workspace_root: PathBuf,
    pub saved_at: String,
}
