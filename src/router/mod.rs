//! Multi-agent request routing.
//!
//! A free-form request comes in, the router scores every registered role
//! against it, fans the request out to the selected roles concurrently,
//! and synthesizes their responses into one answer. Routing is independent
//! of the task lifecycle engine; a caller may feed a routed answer back
//! into a task plan, but nothing here depends on the engine.

pub mod orchestrator;
pub mod roles;
pub mod types;

pub use orchestrator::AgentRouter;
pub use roles::{builtin_roles, AgentRole, PromptedRole};
pub use types::{AgentResponse, CoordinationStatus, CoordinationTask, RoutedResponse, RouterContext};
