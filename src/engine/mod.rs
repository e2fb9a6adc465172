//! Task execution engine.
//!
//! [`lifecycle::TaskManager`] drives a task's steps in order, gating risky
//! steps behind [`approval`], running each step through
//! [`executor::StepRunner`], snapshotting progress after every completed
//! step, and invoking [`rollback`] on fatal failure. Observers receive
//! [`events::EngineEvent`] notifications throughout.

pub mod approval;
pub mod events;
pub mod executor;
pub mod lifecycle;
pub mod rollback;
