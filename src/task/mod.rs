//! Task and step data model shared by the engine, persistence, and CLI.

pub mod plan;
pub mod types;

pub use plan::{StepPlan, TaskPlan};
pub use types::*;
