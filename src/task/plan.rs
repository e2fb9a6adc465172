//! User-authored task plans.
//!
//! A plan is the JSON document a caller hands to `run`: a title plus an
//! ordered list of steps. It is a looser shape than [`Task`] -- ids,
//! order values, and statuses are assigned when the plan is converted.

use serde::Deserialize;

use crate::task::{Action, Task};

#[derive(Debug, Deserialize)]
pub struct TaskPlan {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub steps: Vec<StepPlan>,
}

#[derive(Debug, Deserialize)]
pub struct StepPlan {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub action: Action,
    #[serde(default)]
    pub requires_approval: bool,
    /// Falls back to the configured default when absent.
    pub max_retries: Option<u32>,
}

impl TaskPlan {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let plan: TaskPlan = serde_json::from_str(json)?;
        anyhow::ensure!(!plan.steps.is_empty(), "plan has no steps");
        Ok(plan)
    }

    /// Materialize into an executable task with assigned ids and orders.
    pub fn into_task(self, default_max_retries: u32) -> Task {
        let mut task = Task::new(self.title, self.description);
        for plan_step in self.steps {
            let step = task.push_step(plan_step.title, plan_step.action);
            step.description = plan_step.description;
            step.requires_approval = plan_step.requires_approval;
            step.max_retries = plan_step.max_retries.unwrap_or(default_max_retries);
        }
        task
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::StepStatus;

    const PLAN: &str = r##"{
        "title": "Write docs",
        "steps": [
            {
                "title": "create outline",
                "action": { "kind": "file_write", "params": { "path": "outline.md", "content": "# Outline" } }
            },
            {
                "title": "delete draft",
                "action": { "kind": "file_delete", "params": { "path": "draft.md" } },
                "requires_approval": true,
                "max_retries": 1
            }
        ]
    }"##;

    #[test]
    fn plan_materializes_into_task() {
        let task = TaskPlan::from_json(PLAN).unwrap().into_task(3);

        assert_eq!(task.title, "Write docs");
        assert_eq!(task.steps.len(), 2);
        assert_eq!(task.steps[0].order, 1);
        assert_eq!(task.steps[0].max_retries, 3, "default applies");
        assert_eq!(task.steps[0].status, StepStatus::Pending);
        assert!(task.steps[1].requires_approval);
        assert_eq!(task.steps[1].max_retries, 1, "explicit value wins");
    }

    #[test]
    fn empty_plan_is_rejected() {
        let err = TaskPlan::from_json(r#"{"title": "empty", "steps": []}"#).unwrap_err();
        assert!(err.to_string().contains("no steps"));
    }
}
