//! Pluggable action dispatch.
//!
//! The [`ActionRegistry`] maps an action kind to an executor at runtime, so
//! new kinds register without modifying any dispatcher. Multiple callers
//! may register the same kind; the latest registration wins, which is what
//! lets an embedding application replace a built-in with its own
//! implementation. The registry is read-mostly after startup.

pub mod builtin;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::engine::events::EventSink;
use crate::error::ActionError;
use crate::llm::LanguageModel;
use crate::task::{StepResult, TaskId};

/// Execution context handed to every action executor.
///
/// Carries the adapters an executor may need (workspace root for file
/// side effects, the language-model collaborator) plus the identity of the
/// in-flight task and the event sink for file-change notifications.
pub struct ActionContext {
    pub workspace: PathBuf,
    pub llm: Arc<dyn LanguageModel>,
    pub events: EventSink,
    pub task_id: TaskId,
    pub task_title: String,
}

/// A pluggable executor for one action kind.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Run the action. Side effects are confined to what this method does;
    /// the step runner itself performs no I/O.
    async fn execute(
        &self,
        params: &serde_json::Value,
        ctx: &ActionContext,
    ) -> Result<StepResult, ActionError>;

    /// Optional pre-flight parameter check. Defaults to accepting.
    fn validate_params(&self, _params: &serde_json::Value) -> bool {
        true
    }
}

/// Runtime lookup table from action kind to executor.
pub struct ActionRegistry {
    executors: RwLock<HashMap<String, Arc<dyn ActionExecutor>>>,
}

impl ActionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            executors: RwLock::new(HashMap::new()),
        }
    }

    /// A registry preloaded with the built-in executors
    /// (`file_write`, `file_read`, `file_delete`, `generate_content`).
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register("file_write", Arc::new(builtin::FileWrite));
        registry.register("file_read", Arc::new(builtin::FileRead));
        registry.register("file_delete", Arc::new(builtin::FileDelete));
        registry.register("generate_content", Arc::new(builtin::GenerateContent));
        registry
    }

    /// Register an executor for `kind`. Replaces any prior registration.
    pub fn register(&self, kind: impl Into<String>, executor: Arc<dyn ActionExecutor>) {
        let kind = kind.into();
        let mut executors = self.executors.write().unwrap();
        if executors.insert(kind.clone(), executor).is_some() {
            tracing::debug!(kind = %kind, "action executor replaced");
        }
    }

    /// Look up the executor for `kind`.
    pub fn get(&self, kind: &str) -> Option<Arc<dyn ActionExecutor>> {
        self.executors.read().unwrap().get(kind).cloned()
    }

    /// Registered action kinds, sorted for stable output.
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.executors.read().unwrap().keys().cloned().collect();
        kinds.sort();
        kinds
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
