//! Human-in-the-loop approval gate.
//!
//! A step with `requires_approval` set never runs until a gate approves
//! it. The gate receives a structured summary of what is about to happen
//! so a UI or CLI can render a meaningful prompt. Review may block
//! indefinitely; callers that need a bound should wrap their gate in a
//! timeout.

use async_trait::async_trait;
use serde::Serialize;

use crate::task::{Step, Task};

/// Structured summary of a pending step, handed to the gate for review.
#[derive(Debug, Clone, Serialize)]
pub struct ApprovalRequest {
    pub task_id: String,
    pub task_title: String,
    pub step_id: String,
    pub step_title: String,
    pub step_description: String,
    pub action_kind: String,
    pub action_params: serde_json::Value,
}

impl ApprovalRequest {
    pub fn for_step(task: &Task, step: &Step) -> Self {
        Self {
            task_id: task.id.clone(),
            task_title: task.title.clone(),
            step_id: step.id.clone(),
            step_title: step.title.clone(),
            step_description: step.description.clone(),
            action_kind: step.action.kind.clone(),
            action_params: step.action.params.clone(),
        }
    }
}

/// Decides whether a gated step may proceed. Returning `false` cancels
/// the entire task.
#[async_trait]
pub trait ApprovalGate: Send + Sync {
    async fn review(&self, request: ApprovalRequest) -> bool;
}

/// Approves everything. The default for headless and test execution.
pub struct AutoApprove;

#[async_trait]
impl ApprovalGate for AutoApprove {
    async fn review(&self, _request: ApprovalRequest) -> bool {
        true
    }
}

/// Rejects everything. Useful for exercising cancellation paths.
pub struct RejectAll;

#[async_trait]
impl ApprovalGate for RejectAll {
    async fn review(&self, _request: ApprovalRequest) -> bool {
        false
    }
}
