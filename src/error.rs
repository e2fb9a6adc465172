use std::path::PathBuf;

/// Errors raised by action executors and the step runner.
///
/// The retryable/non-retryable split drives the step runner's retry loop:
/// a [`ActionError::NonRetryable`] failure is terminal for the attempt
/// sequence regardless of remaining retries, while [`ActionError::Retryable`]
/// failures are re-attempted up to the step's `max_retries`.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("no executor registered for action kind '{kind}'")]
    MissingExecutor { kind: String },

    #[error("invalid parameters for action '{kind}': {message}")]
    InvalidParams { kind: String, message: String },

    /// A domain error no amount of retrying can fix (missing file,
    /// workspace escape, malformed input).
    #[error("{0}")]
    NonRetryable(String),

    /// A transient failure worth retrying (I/O hiccup, collaborator error).
    #[error("{0}")]
    Retryable(String),
}

impl ActionError {
    /// Whether the step runner may attempt this action again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ActionError::Retryable(_))
    }
}

/// Errors related to the durable task snapshot store.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt snapshot at {path}: {message}")]
    Corrupt { path: PathBuf, message: String },

    #[error("no persisted state for task '{task_id}'")]
    NotFound { task_id: String },
}

/// Errors related to agent routing and delegation.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("no agent roles registered")]
    NoRolesRegistered,

    #[error("all selected roles failed: {0}")]
    AllRolesFailed(String),
}
