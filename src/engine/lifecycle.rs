//! Task lifecycle manager.
//!
//! Drives a task's steps strictly in order through the step runner, with:
//!
//! 1. A cooperative pause flag checked once per step boundary (a step
//!    already in flight always runs to completion first)
//! 2. Approval gating for steps that require it (a rejection cancels the
//!    whole task immediately)
//! 3. A snapshot after every completed step so the task is resumable
//! 4. Best-effort rollback of created files on fatal failure
//! 5. An auto-synthesis step appended after normal completion when at
//!    least two completed steps produced AI-generated content
//!
//! Ordinary step failures never surface as `Err` -- `execute_task` always
//! hands back a terminated [`Task`] with its status and error field set.
//! Only a missing or corrupt snapshot makes `resume_task` return an error.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::actions::{ActionContext, ActionRegistry};
use crate::engine::approval::{ApprovalGate, ApprovalRequest, AutoApprove};
use crate::engine::events::{EngineEvent, EventSink};
use crate::engine::executor::{FallbackStrategy, StepRunner};
use crate::engine::rollback::rollback_history;
use crate::error::PersistenceError;
use crate::llm::LanguageModel;
use crate::persistence::{snapshot, TaskStore};
use crate::task::{now_iso, Action, Step, StepResult, StepStatus, Task, TaskStatus};

/// Orchestrates full task execution: approval, retries, persistence,
/// rollback, and synthesis.
pub struct TaskManager {
    registry: Arc<ActionRegistry>,
    store: Arc<dyn TaskStore>,
    llm: Arc<dyn LanguageModel>,
    events: EventSink,
    approval: Arc<dyn ApprovalGate>,
    fallback: Option<Arc<dyn FallbackStrategy>>,
    workspace: PathBuf,
    pause_requested: Arc<AtomicBool>,
}

impl TaskManager {
    pub fn new(
        registry: Arc<ActionRegistry>,
        store: Arc<dyn TaskStore>,
        llm: Arc<dyn LanguageModel>,
        workspace: impl Into<PathBuf>,
    ) -> Self {
        Self {
            registry,
            store,
            llm,
            events: EventSink::disabled(),
            approval: Arc::new(AutoApprove),
            fallback: None,
            workspace: workspace.into(),
            pause_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    pub fn with_approval_gate(mut self, gate: Arc<dyn ApprovalGate>) -> Self {
        self.approval = gate;
        self
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn FallbackStrategy>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Request a cooperative pause. Takes effect at the next step boundary.
    pub fn pause(&self) {
        self.pause_requested.store(true, Ordering::SeqCst);
    }

    /// Clear a pending pause request.
    pub fn resume(&self) {
        self.pause_requested.store(false, Ordering::SeqCst);
    }

    /// Shared handle to the pause flag, for wiring into signal handlers.
    pub fn pause_handle(&self) -> Arc<AtomicBool> {
        self.pause_requested.clone()
    }

    /// Execute `task` from its first step.
    ///
    /// Always returns the terminated (or paused) task; ordinary step
    /// failures are folded into task status, never raised.
    pub async fn execute_task(&self, task: Task, original_request: &str) -> Task {
        let workspace = self.workspace.clone();
        self.run_from(task, 0, original_request, &workspace).await
    }

    /// Resume a persisted task at `current_step_index + 1`, restoring its
    /// originating request and workspace root from the snapshot.
    pub async fn resume_task(&self, task_id: &str) -> Result<Task, PersistenceError> {
        let state = self
            .store
            .get(task_id)
            .await?
            .ok_or_else(|| PersistenceError::NotFound {
                task_id: task_id.to_string(),
            })?;

        tracing::info!(
            task_id = %task_id,
            resume_at = state.current_step_index + 1,
            "resuming persisted task"
        );

        let mut task = state.task;
        task.status = TaskStatus::InProgress;
        Ok(self
            .run_from(
                task,
                state.current_step_index + 1,
                &state.original_request,
                &state.workspace_root,
            )
            .await)
    }

    /// The per-step loop shared by execute and resume.
    async fn run_from(
        &self,
        mut task: Task,
        start_index: usize,
        original_request: &str,
        workspace: &Path,
    ) -> Task {
        let started = Instant::now();
        if task.started_at.is_none() {
            task.started_at = Some(now_iso());
        }
        task.status = TaskStatus::InProgress;
        // Order is fixed once execution starts; sorting here only
        // normalizes plans that were assembled out of order.
        task.steps.sort_by_key(|s| s.order);
        task.metadata.total_steps = task.steps.len();

        // Steps completed before a resume re-enter the history, so a
        // post-resume failure rolls back the whole task's side effects,
        // not just the work done since the snapshot.
        let mut history: Vec<StepResult> = task
            .steps
            .iter()
            .take(start_index)
            .filter(|s| s.status == StepStatus::Completed)
            .filter_map(|s| s.result.clone())
            .collect();
        let mut index = start_index;

        while index < task.steps.len() {
            // 1. Cooperative pause, checked only at step boundaries.
            if self.pause_requested.load(Ordering::SeqCst) {
                task.status = TaskStatus::Paused;
                if index > 0 {
                    self.persist(&task, index - 1, original_request, workspace).await;
                }
                tracing::info!(task_id = %task.id, next_step = index, "task paused");
                return task;
            }

            // 2. Approval gate.
            if task.steps[index].requires_approval && !task.steps[index].approved {
                task.steps[index].status = StepStatus::AwaitingApproval;
                let request = ApprovalRequest::for_step(&task, &task.steps[index]);
                if !self.approval.review(request).await {
                    task.steps[index].status = StepStatus::Rejected;
                    task.status = TaskStatus::Cancelled;
                    task.completed_at = Some(now_iso());
                    task.metadata.execution_time_ms =
                        Some(started.elapsed().as_millis() as u64);
                    history.clear();
                    self.discard_snapshot(&task.id).await;
                    tracing::info!(task_id = %task.id, step = %task.steps[index].title, "approval rejected, task cancelled");
                    return task;
                }
                task.steps[index].approved = true;
                task.steps[index].status = StepStatus::Approved;
            }

            // 3. Run the step.
            self.events.emit(EngineEvent::StepStarted {
                task_id: task.id.clone(),
                step_id: task.steps[index].id.clone(),
                order: task.steps[index].order,
                title: task.steps[index].title.clone(),
            });

            let ctx = ActionContext {
                workspace: workspace.to_path_buf(),
                llm: self.llm.clone(),
                events: self.events.clone(),
                task_id: task.id.clone(),
                task_title: task.title.clone(),
            };
            let mut runner = StepRunner::new(self.registry.clone());
            if let Some(ref fallback) = self.fallback {
                runner = runner.with_fallback(fallback.clone());
            }
            let result = runner.run(&mut task.steps[index], &ctx).await;
            history.push(result.clone());

            if result.success {
                // 4. Persist progress, report it, move on.
                self.events.emit(EngineEvent::StepCompleted {
                    task_id: task.id.clone(),
                    step_id: task.steps[index].id.clone(),
                    result: result.clone(),
                });
                task.metadata.completed_steps = task.completed_steps();
                self.persist(&task, index, original_request, workspace).await;
                self.events.emit(EngineEvent::TaskProgress {
                    task_id: task.id.clone(),
                    completed: task.metadata.completed_steps,
                    total: task.metadata.total_steps,
                });
                index += 1;
            } else {
                // 5. Fatal failure: record, roll back, stop.
                let message = format!(
                    "step {} '{}' failed: {}",
                    task.steps[index].order, task.steps[index].title, result.message
                );
                self.events.emit(EngineEvent::StepErrored {
                    task_id: task.id.clone(),
                    step_id: task.steps[index].id.clone(),
                    message: message.clone(),
                });

                task.error = Some(message.clone());
                task.status = TaskStatus::Failed;
                task.completed_at = Some(now_iso());
                task.metadata.execution_time_ms = Some(started.elapsed().as_millis() as u64);

                let outcome = rollback_history(&mut history, &self.events).await;
                tracing::warn!(
                    task_id = %task.id,
                    steps_rolled_back = outcome.steps_rolled_back,
                    files_restored = outcome.files_restored.len(),
                    unrecoverable = outcome.unrecoverable.len(),
                    "task failed, rollback finished"
                );
                self.discard_snapshot(&task.id).await;
                self.events.emit(EngineEvent::TaskError {
                    task_id: task.id.clone(),
                    message,
                });
                return task;
            }
        }

        // All steps succeeded and no pause intervened.
        self.append_synthesis_step(&mut task).await;

        task.status = TaskStatus::Completed;
        task.completed_at = Some(now_iso());
        task.metadata.completed_steps = task.completed_steps();
        task.metadata.total_steps = task.steps.len();
        task.metadata.execution_time_ms = Some(started.elapsed().as_millis() as u64);
        history.clear();
        self.discard_snapshot(&task.id).await;
        self.events.emit(EngineEvent::TaskCompleted {
            task_id: task.id.clone(),
        });
        tracing::info!(task_id = %task.id, steps = task.steps.len(), "task completed");
        task
    }

    /// Snapshot after a completed step. A write failure is logged but does
    /// not fail the task -- execution state is still sound in memory.
    async fn persist(
        &self,
        task: &Task,
        current_step_index: usize,
        original_request: &str,
        workspace: &Path,
    ) {
        let state = snapshot(task, current_step_index, original_request, workspace);
        if let Err(e) = self.store.save(&state).await {
            tracing::warn!(task_id = %task.id, error = %e, "snapshot save failed");
        }
    }

    /// Remove the snapshot for a terminated task so `list` only shows
    /// genuinely resumable work.
    async fn discard_snapshot(&self, task_id: &str) {
        if let Err(e) = self.store.delete(task_id).await {
            tracing::warn!(task_id = %task_id, error = %e, "snapshot delete failed");
        }
    }

    /// Append a synthetic, already-completed step summarizing AI-generated
    /// step outputs, when at least two completed steps produced any.
    ///
    /// The step is exempt from approval and retry logic -- it exists
    /// purely as a recorded summary. A collaborator failure skips
    /// synthesis rather than failing the completed task.
    async fn append_synthesis_step(&self, task: &mut Task) {
        let sources: Vec<(String, String)> = task
            .steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .filter_map(|s| {
                s.result
                    .as_ref()
                    .and_then(|r| r.ai_content())
                    .map(|content| (s.title.clone(), content.to_string()))
            })
            .collect();

        if sources.len() < 2 {
            return;
        }

        let mut prompt = String::with_capacity(1024);
        prompt.push_str(
            "Combine the following step results into one coherent narrative summary:\n\n",
        );
        for (title, content) in &sources {
            prompt.push_str(&format!("### {title}\n{content}\n\n"));
        }

        let mut context = HashMap::new();
        context.insert("task".to_string(), task.title.clone());
        context.insert("task_id".to_string(), task.id.clone());

        match self.llm.generate(&prompt, &context).await {
            Ok(narrative) => {
                let order = task.steps.last().map(|s| s.order + 1).unwrap_or(1);
                let mut step = Step::new(
                    &task.id,
                    order,
                    "Synthesis of generated results",
                    Action::new("synthesis", serde_json::json!({})),
                );
                step.status = StepStatus::Completed;
                let mut result =
                    StepResult::ok(format!("synthesized {} step results", sources.len()));
                result.data = Some(serde_json::json!({ "ai_content": narrative }));
                step.result = Some(result);
                task.steps.push(step);
            }
            Err(e) => {
                tracing::warn!(task_id = %task.id, error = %e, "auto-synthesis skipped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionExecutor;
    use crate::engine::approval::RejectAll;
    use crate::error::ActionError;
    use crate::llm::ScriptedModel;
    use crate::persistence::FileTaskStore;
    use async_trait::async_trait;
    use serde_json::json;
    use tempfile::TempDir;

    struct AlwaysFails;

    #[async_trait]
    impl ActionExecutor for AlwaysFails {
        async fn execute(
            &self,
            _params: &serde_json::Value,
            _ctx: &ActionContext,
        ) -> Result<StepResult, ActionError> {
            Err(ActionError::Retryable("nope".into()))
        }
    }

    fn make_manager(tmp: &TempDir) -> TaskManager {
        let registry = Arc::new(ActionRegistry::with_builtins());
        let store = Arc::new(FileTaskStore::new(tmp.path().join("state")).unwrap());
        let llm = Arc::new(ScriptedModel::fixed("generated text"));
        let workspace = tmp.path().join("workspace");
        std::fs::create_dir_all(&workspace).unwrap();
        TaskManager::new(registry, store, llm, workspace)
    }

    fn write_step_task(count: usize) -> Task {
        let mut task = Task::new("write files", "");
        for i in 0..count {
            task.push_step(
                format!("write {i}"),
                Action::new(
                    "file_write",
                    json!({"path": format!("out-{i}.txt"), "content": format!("content {i}")}),
                ),
            );
        }
        task
    }

    #[tokio::test]
    async fn executes_all_steps_in_order() {
        let tmp = TempDir::new().unwrap();
        let manager = make_manager(&tmp);
        let task = write_step_task(3);

        let done = manager.execute_task(task, "write three files").await;

        assert_eq!(done.status, TaskStatus::Completed);
        assert_eq!(done.completed_steps(), 3);
        assert!(done.error.is_none());
        assert!(done.started_at.is_some());
        assert!(done.completed_at.is_some());
        for i in 0..3 {
            assert!(tmp.path().join("workspace").join(format!("out-{i}.txt")).exists());
        }
    }

    #[tokio::test]
    async fn failed_step_stops_execution_and_rolls_back() {
        let tmp = TempDir::new().unwrap();
        let registry = Arc::new(ActionRegistry::with_builtins());
        registry.register("explode", Arc::new(AlwaysFails));
        let store = Arc::new(FileTaskStore::new(tmp.path().join("state")).unwrap());
        let workspace = tmp.path().join("workspace");
        std::fs::create_dir_all(&workspace).unwrap();
        let manager = TaskManager::new(
            registry,
            store,
            Arc::new(ScriptedModel::fixed("x")),
            &workspace,
        );

        let mut task = Task::new("doomed", "");
        task.push_step(
            "write survivor",
            Action::new("file_write", json!({"path": "keep.txt", "content": "a"})),
        );
        task.push_step("boom", Action::new("explode", json!({})));
        task.push_step(
            "never runs",
            Action::new("file_write", json!({"path": "later.txt", "content": "b"})),
        );

        let done = manager.execute_task(task, "doomed run").await;

        assert_eq!(done.status, TaskStatus::Failed);
        assert!(done.error.as_deref().unwrap().contains("boom"));
        assert_eq!(done.steps[0].status, StepStatus::Completed);
        assert_eq!(done.steps[1].status, StepStatus::Failed);
        assert_eq!(done.steps[2].status, StepStatus::Pending);
        // Rollback removed the file step 1 created.
        assert!(!workspace.join("keep.txt").exists());
        assert!(!workspace.join("later.txt").exists());
    }

    #[tokio::test]
    async fn rejection_cancels_without_running_executor() {
        let tmp = TempDir::new().unwrap();
        let manager = make_manager(&tmp).with_approval_gate(Arc::new(RejectAll));

        let mut task = Task::new("gated", "");
        let step = task.push_step(
            "risky write",
            Action::new("file_write", json!({"path": "risky.txt", "content": "x"})),
        );
        step.requires_approval = true;

        let done = manager.execute_task(task, "gated run").await;

        assert_eq!(done.status, TaskStatus::Cancelled);
        assert_eq!(done.steps[0].status, StepStatus::Rejected);
        assert!(done.error.is_none(), "cancellation is not an error");
        assert!(!tmp.path().join("workspace/risky.txt").exists());
    }

    #[tokio::test]
    async fn auto_approval_when_no_gate_installed() {
        let tmp = TempDir::new().unwrap();
        let manager = make_manager(&tmp);

        let mut task = Task::new("gated", "");
        let step = task.push_step(
            "approved write",
            Action::new("file_write", json!({"path": "ok.txt", "content": "x"})),
        );
        step.requires_approval = true;

        let done = manager.execute_task(task, "auto-approved").await;

        assert_eq!(done.status, TaskStatus::Completed);
        assert!(done.steps[0].approved);
    }

    #[tokio::test]
    async fn synthesis_step_appended_for_two_generated_results() {
        let tmp = TempDir::new().unwrap();
        let manager = make_manager(&tmp);

        let mut task = Task::new("research", "");
        task.push_step(
            "analyze A",
            Action::new("generate_content", json!({"prompt": "analyze A"})),
        );
        task.push_step(
            "analyze B",
            Action::new("generate_content", json!({"prompt": "analyze B"})),
        );

        let done = manager.execute_task(task, "research run").await;

        assert_eq!(done.status, TaskStatus::Completed);
        assert_eq!(done.steps.len(), 3, "synthesis step appended");
        let synthesis = done.steps.last().unwrap();
        assert_eq!(synthesis.status, StepStatus::Completed);
        assert_eq!(synthesis.order, 3);
        assert!(!synthesis.requires_approval);
        assert!(synthesis.result.as_ref().unwrap().ai_content().is_some());
    }

    #[tokio::test]
    async fn no_synthesis_for_single_generated_result() {
        let tmp = TempDir::new().unwrap();
        let manager = make_manager(&tmp);

        let mut task = Task::new("mixed", "");
        task.push_step(
            "generate",
            Action::new("generate_content", json!({"prompt": "only one"})),
        );
        task.push_step(
            "write",
            Action::new("file_write", json!({"path": "f.txt", "content": "x"})),
        );

        let done = manager.execute_task(task, "mixed run").await;
        assert_eq!(done.steps.len(), 2, "no synthesis step");
    }

    #[tokio::test]
    async fn model_failure_does_not_fail_file_only_task() {
        let tmp = TempDir::new().unwrap();
        let registry = Arc::new(ActionRegistry::with_builtins());
        let store = Arc::new(FileTaskStore::new(tmp.path().join("state")).unwrap());
        let workspace = tmp.path().join("workspace");
        std::fs::create_dir_all(&workspace).unwrap();
        let manager = TaskManager::new(
            registry,
            store,
            Arc::new(ScriptedModel::failing()),
            &workspace,
        );

        let mut task = Task::new("resilient", "");
        task.push_step(
            "write a",
            Action::new("file_write", json!({"path": "a.txt", "content": "a"})),
        );
        let done = manager.execute_task(task, "no llm available").await;
        assert_eq!(done.status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn pause_takes_effect_at_step_boundary() {
        let tmp = TempDir::new().unwrap();
        let manager = make_manager(&tmp);
        manager.pause();

        let task = write_step_task(2);
        let done = manager.execute_task(task, "paused immediately").await;

        assert_eq!(done.status, TaskStatus::Paused);
        assert_eq!(done.completed_steps(), 0);
    }
}
