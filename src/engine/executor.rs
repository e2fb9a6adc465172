//! Single-step execution with retry and fallback policy.
//!
//! The runner executes one step to a terminal outcome: it looks up the
//! executor for the step's action kind, invokes it, and on retryable
//! failure re-attempts up to the step's `max_retries`, optionally letting
//! a fallback strategy substitute adjusted parameters (or a different
//! action kind entirely) before each retry. The runner performs no I/O of
//! its own; side effects belong to the invoked executor.

use std::sync::Arc;

use crate::actions::{ActionContext, ActionRegistry};
use crate::error::ActionError;
use crate::task::{Action, Step, StepResult, StepStatus};

/// Hook consulted between a retryable failure and the next attempt.
///
/// Returning `Some(action)` substitutes that action for the retry;
/// returning `None` retries the current action unchanged.
pub trait FallbackStrategy: Send + Sync {
    fn next_attempt(&self, step: &Step, error: &ActionError) -> Option<Action>;
}

/// Executes one step through the action registry.
pub struct StepRunner {
    registry: Arc<ActionRegistry>,
    fallback: Option<Arc<dyn FallbackStrategy>>,
}

impl StepRunner {
    pub fn new(registry: Arc<ActionRegistry>) -> Self {
        Self {
            registry,
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn FallbackStrategy>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Run `step` to a terminal per-attempt outcome.
    ///
    /// With `max_retries = N` the action is invoked at most `N + 1` times;
    /// `retry_count` equals the number of retries performed (so `N` on
    /// final failure). Non-retryable errors fail the step immediately
    /// regardless of remaining retries. On success the step is marked
    /// completed with the result attached; `retry_count` is left as-is
    /// (informational).
    pub async fn run(&self, step: &mut Step, ctx: &ActionContext) -> StepResult {
        step.status = StepStatus::InProgress;
        let mut action = step.action.clone();

        loop {
            let Some(executor) = self.registry.get(&action.kind) else {
                let e = ActionError::MissingExecutor {
                    kind: action.kind.clone(),
                };
                return fail_step(step, e.to_string());
            };

            if !executor.validate_params(&action.params) {
                return fail_step(
                    step,
                    format!("parameter validation failed for action '{}'", action.kind),
                );
            }

            match executor.execute(&action.params, ctx).await {
                Ok(result) => {
                    step.status = if result.success {
                        StepStatus::Completed
                    } else {
                        StepStatus::Failed
                    };
                    step.result = Some(result.clone());
                    return result;
                }
                Err(e) if e.is_retryable() && step.retry_count < step.max_retries => {
                    step.retry_count += 1;
                    tracing::warn!(
                        step = %step.title,
                        kind = %action.kind,
                        retry = step.retry_count,
                        max_retries = step.max_retries,
                        error = %e,
                        "step attempt failed, retrying"
                    );
                    if let Some(ref fallback) = self.fallback {
                        if let Some(substitute) = fallback.next_attempt(step, &e) {
                            tracing::info!(
                                step = %step.title,
                                from = %action.kind,
                                to = %substitute.kind,
                                "fallback strategy substituted action"
                            );
                            action = substitute;
                        }
                    }
                }
                Err(e) => return fail_step(step, e.to_string()),
            }
        }
    }
}

fn fail_step(step: &mut Step, message: String) -> StepResult {
    step.status = StepStatus::Failed;
    let result = StepResult::failed(message);
    step.result = Some(result.clone());
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionExecutor;
    use crate::engine::events::EventSink;
    use crate::llm::OfflineModel;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::TempDir;

    /// Fails with a retryable error `failures` times, then succeeds.
    struct FlakyExecutor {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl ActionExecutor for FlakyExecutor {
        async fn execute(
            &self,
            _params: &serde_json::Value,
            _ctx: &ActionContext,
        ) -> Result<StepResult, ActionError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(ActionError::Retryable(format!("transient failure #{call}")))
            } else {
                Ok(StepResult::ok("finally worked"))
            }
        }
    }

    struct NonRetryableExecutor {
        calls: AtomicU32,
    }

    #[async_trait]
    impl ActionExecutor for NonRetryableExecutor {
        async fn execute(
            &self,
            _params: &serde_json::Value,
            _ctx: &ActionContext,
        ) -> Result<StepResult, ActionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ActionError::NonRetryable("file is gone".into()))
        }
    }

    fn make_ctx(tmp: &TempDir) -> ActionContext {
        ActionContext {
            workspace: tmp.path().to_path_buf(),
            llm: Arc::new(OfflineModel),
            events: EventSink::disabled(),
            task_id: "task-1".into(),
            task_title: "runner test".into(),
        }
    }

    fn make_step(kind: &str, max_retries: u32) -> Step {
        let mut step = Step::new(
            "task-1",
            1,
            "test step",
            Action::new(kind, serde_json::json!({})),
        );
        step.max_retries = max_retries;
        step
    }

    #[tokio::test]
    async fn missing_executor_fails_without_retry() {
        let tmp = TempDir::new().unwrap();
        let runner = StepRunner::new(Arc::new(ActionRegistry::new()));
        let mut step = make_step("unregistered", 3);

        let result = runner.run(&mut step, &make_ctx(&tmp)).await;

        assert!(!result.success);
        assert!(result.message.contains("no executor registered"));
        assert_eq!(step.status, StepStatus::Failed);
        assert_eq!(step.retry_count, 0);
    }

    #[tokio::test]
    async fn retryable_failure_retries_up_to_max() {
        let tmp = TempDir::new().unwrap();
        let registry = Arc::new(ActionRegistry::new());
        let executor = Arc::new(FlakyExecutor {
            failures: u32::MAX,
            calls: AtomicU32::new(0),
        });
        registry.register("flaky", executor.clone());
        let runner = StepRunner::new(registry);

        let mut step = make_step("flaky", 2);
        let result = runner.run(&mut step, &make_ctx(&tmp)).await;

        assert!(!result.success);
        // max_retries = 2 means 3 invocations total, retry_count == 2.
        assert_eq!(executor.calls.load(Ordering::SeqCst), 3);
        assert_eq!(step.retry_count, 2);
        assert_eq!(step.status, StepStatus::Failed);
    }

    #[tokio::test]
    async fn zero_retries_invokes_exactly_once() {
        let tmp = TempDir::new().unwrap();
        let registry = Arc::new(ActionRegistry::new());
        let executor = Arc::new(FlakyExecutor {
            failures: u32::MAX,
            calls: AtomicU32::new(0),
        });
        registry.register("flaky", executor.clone());
        let runner = StepRunner::new(registry);

        let mut step = make_step("flaky", 0);
        let result = runner.run(&mut step, &make_ctx(&tmp)).await;

        assert!(!result.success);
        assert_eq!(executor.calls.load(Ordering::SeqCst), 1);
        assert_eq!(step.retry_count, 0);
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let tmp = TempDir::new().unwrap();
        let registry = Arc::new(ActionRegistry::new());
        registry.register(
            "flaky",
            Arc::new(FlakyExecutor {
                failures: 2,
                calls: AtomicU32::new(0),
            }),
        );
        let runner = StepRunner::new(registry);

        let mut step = make_step("flaky", 3);
        let result = runner.run(&mut step, &make_ctx(&tmp)).await;

        assert!(result.success);
        assert_eq!(step.status, StepStatus::Completed);
        assert_eq!(step.retry_count, 2);
        assert!(step.result.is_some());
    }

    #[tokio::test]
    async fn non_retryable_error_skips_remaining_retries() {
        let tmp = TempDir::new().unwrap();
        let registry = Arc::new(ActionRegistry::new());
        let executor = Arc::new(NonRetryableExecutor {
            calls: AtomicU32::new(0),
        });
        registry.register("doomed", executor.clone());
        let runner = StepRunner::new(registry);

        let mut step = make_step("doomed", 5);
        let result = runner.run(&mut step, &make_ctx(&tmp)).await;

        assert!(!result.success);
        assert_eq!(executor.calls.load(Ordering::SeqCst), 1);
        assert_eq!(step.retry_count, 0);
    }

    #[tokio::test]
    async fn fallback_substitutes_action_for_retry() {
        struct SwitchToBackup;
        impl FallbackStrategy for SwitchToBackup {
            fn next_attempt(&self, _step: &Step, _error: &ActionError) -> Option<Action> {
                Some(Action::new("backup", serde_json::json!({})))
            }
        }

        struct BackupExecutor;

        #[async_trait]
        impl ActionExecutor for BackupExecutor {
            async fn execute(
                &self,
                _params: &serde_json::Value,
                _ctx: &ActionContext,
            ) -> Result<StepResult, ActionError> {
                Ok(StepResult::ok("backup path"))
            }
        }

        let tmp = TempDir::new().unwrap();
        let registry = Arc::new(ActionRegistry::new());
        registry.register(
            "flaky",
            Arc::new(FlakyExecutor {
                failures: u32::MAX,
                calls: AtomicU32::new(0),
            }),
        );
        registry.register("backup", Arc::new(BackupExecutor));
        let runner = StepRunner::new(registry).with_fallback(Arc::new(SwitchToBackup));

        let mut step = make_step("flaky", 1);
        let result = runner.run(&mut step, &make_ctx(&tmp)).await;

        assert!(result.success);
        assert_eq!(result.message, "backup path");
        assert_eq!(step.retry_count, 1);
    }
}
