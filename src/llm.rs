//! Language-model collaborator boundary.
//!
//! The engine treats text generation as a black box: a prompt plus
//! contextual metadata goes in, generated text comes out. Retry policy, if
//! any, belongs to the implementation behind the trait -- the engine never
//! re-prompts on its own.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

/// Black-box text generation used by `generate_content` actions, the
/// auto-synthesis step, and the built-in agent roles.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Produce generated text for `prompt`. `context` carries contextual
    /// metadata (role name, task title, workspace) the implementation may
    /// fold into its request.
    async fn generate(&self, prompt: &str, context: &HashMap<String, String>) -> anyhow::Result<String>;
}

/// Deterministic provider-free model.
///
/// Echoes a structured summary of the prompt so the engine is fully
/// functional without a configured provider. Useful for headless runs and
/// as the CLI default.
pub struct OfflineModel;

#[async_trait]
impl LanguageModel for OfflineModel {
    async fn generate(&self, prompt: &str, context: &HashMap<String, String>) -> anyhow::Result<String> {
        let first_line = prompt.lines().next().unwrap_or("").trim();
        let mut out = format!("[offline] {first_line}");
        if let Some(role) = context.get("role") {
            out.push_str(&format!(" (as {role})"));
        }
        Ok(out)
    }
}

/// Test double that returns queued responses in order.
///
/// When the queue runs dry it falls back to a fixed default, so tests that
/// only care about a single generation don't have to count calls. An
/// optional failure flag makes every call return an error instead, for
/// exercising degraded paths.
pub struct ScriptedModel {
    responses: Mutex<Vec<String>>,
    default: String,
    fail: bool,
}

impl ScriptedModel {
    /// Model that always answers with `default`.
    pub fn fixed(default: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            default: default.into(),
            fail: false,
        }
    }

    /// Model that answers with `responses` front-to-back, then `default`.
    pub fn queued(responses: Vec<String>, default: impl Into<String>) -> Self {
        let mut rev = responses;
        rev.reverse();
        Self {
            responses: Mutex::new(rev),
            default: default.into(),
            fail: false,
        }
    }

    /// Model whose every call fails.
    pub fn failing() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            default: String::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, _prompt: &str, _context: &HashMap<String, String>) -> anyhow::Result<String> {
        if self.fail {
            anyhow::bail!("scripted model failure");
        }
        let mut queue = self.responses.lock().unwrap();
        Ok(queue.pop().unwrap_or_else(|| self.default.clone()))
    }
}
