//! Router-facing data types.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::task::now_iso;

/// What one agent role produced for a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    pub content: String,
    /// Self-reported confidence in `[0, 1]`.
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl AgentResponse {
    pub fn new(content: impl Into<String>, confidence: f32) -> Self {
        Self {
            content: content.into(),
            confidence: confidence.clamp(0.0, 1.0),
            suggestions: Vec::new(),
        }
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }
}

/// Ambient context a caller can attach to a request. All fields optional;
/// whatever is present feeds capability scoring and role prompts.
#[derive(Debug, Clone, Default)]
pub struct RouterContext {
    /// File the user is currently focused on, if any.
    pub current_file: Option<PathBuf>,
    pub workspace: Option<PathBuf>,
    pub extra: HashMap<String, String>,
}

impl RouterContext {
    /// Flatten into string metadata for the language-model collaborator.
    pub fn to_prompt_context(&self) -> HashMap<String, String> {
        let mut out = self.extra.clone();
        if let Some(ref file) = self.current_file {
            out.insert("current_file".into(), file.display().to_string());
        }
        if let Some(ref ws) = self.workspace {
            out.insert("workspace".into(), ws.display().to_string());
        }
        out
    }

    /// Extra text the capability scorer matches keywords against, beyond
    /// the request itself.
    pub fn scoring_text(&self) -> String {
        let mut text = String::new();
        if let Some(ref file) = self.current_file {
            text.push_str(&file.display().to_string());
            text.push(' ');
        }
        for (k, v) in &self.extra {
            text.push_str(k);
            text.push(' ');
            text.push_str(v);
            text.push(' ');
        }
        text
    }
}

/// Phase of an in-flight routed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinationStatus {
    Analyzing,
    Processing,
    Synthesizing,
}

/// Bookkeeping record for a request currently inside the router.
///
/// Exists only while the request is being routed and synthesized; callers
/// can query the active set to show in-flight work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinationTask {
    pub id: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, String>,
    pub status: CoordinationStatus,
    pub required_roles: Vec<String>,
    pub started_at: String,
}

impl CoordinationTask {
    pub fn new(description: impl Into<String>, context: HashMap<String, String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            description: description.into(),
            context,
            status: CoordinationStatus::Analyzing,
            required_roles: Vec::new(),
            started_at: now_iso(),
        }
    }
}

/// Final synthesized answer for a routed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutedResponse {
    pub content: String,
    /// Merged suggestions from every responding role, order-preserving.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    /// Roles that actually produced a response (failures excluded).
    pub responding_roles: Vec<String>,
}
