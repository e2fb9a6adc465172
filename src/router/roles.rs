//! Agent roles and the built-in role set.
//!
//! A role is a stateless responder: same request and context in, one
//! [`AgentResponse`] out. The shipped roles are thin personas over the
//! language-model collaborator; embedding applications can register their
//! own implementations alongside or instead of them.

use std::sync::Arc;

use async_trait::async_trait;

use crate::llm::LanguageModel;
use crate::router::types::{AgentResponse, RouterContext};

/// A specialized responder selected by capability match.
#[async_trait]
pub trait AgentRole: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Lowercase keywords this role claims. Scoring counts how many appear
    /// in the request text and context.
    fn capabilities(&self) -> &[&str];

    /// Answer `request`. An error here removes this role from the result
    /// set for the request; it never aborts the other fanned-out roles.
    async fn process(&self, request: &str, ctx: &RouterContext) -> anyhow::Result<AgentResponse>;
}

/// A role whose behavior is a persona prompt over the language model.
pub struct PromptedRole {
    name: String,
    description: String,
    capabilities: Vec<&'static str>,
    persona: String,
    confidence: f32,
    llm: Arc<dyn LanguageModel>,
}

impl PromptedRole {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        capabilities: Vec<&'static str>,
        persona: impl Into<String>,
        confidence: f32,
        llm: Arc<dyn LanguageModel>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            capabilities,
            persona: persona.into(),
            confidence,
            llm,
        }
    }
}

#[async_trait]
impl AgentRole for PromptedRole {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn capabilities(&self) -> &[&str] {
        &self.capabilities
    }

    async fn process(&self, request: &str, ctx: &RouterContext) -> anyhow::Result<AgentResponse> {
        let prompt = format!(
            "{persona}\n\nRequest:\n{request}\n\nRespond with your analysis, then list concrete suggestions, one per line, each prefixed with '- '.",
            persona = self.persona,
        );
        let mut context = ctx.to_prompt_context();
        context.insert("role".into(), self.name.clone());

        let raw = self.llm.generate(&prompt, &context).await?;
        let (content, suggestions) = split_suggestions(&raw);
        Ok(AgentResponse::new(content, self.confidence).with_suggestions(suggestions))
    }
}

/// Split trailing `- ` bullet lines off as suggestions.
fn split_suggestions(raw: &str) -> (String, Vec<String>) {
    let mut content_lines = Vec::new();
    let mut suggestions = Vec::new();
    for line in raw.lines() {
        if let Some(rest) = line.trim_start().strip_prefix("- ") {
            suggestions.push(rest.trim().to_string());
        } else {
            content_lines.push(line);
        }
    }
    (content_lines.join("\n").trim().to_string(), suggestions)
}

/// The default role set: a general-purpose lead plus four specialists.
///
/// The lead doubles as the fallback when no capability keyword matches a
/// request.
pub fn builtin_roles(llm: Arc<dyn LanguageModel>) -> Vec<Arc<dyn AgentRole>> {
    vec![
        Arc::new(PromptedRole::new(
            "lead",
            "General-purpose coordinator for planning and cross-cutting work",
            vec!["plan", "coordinate", "organize", "overview", "roadmap"],
            "You are the lead engineer. Give a pragmatic, end-to-end answer and flag anything that needs a specialist.",
            0.6,
            llm.clone(),
        )),
        Arc::new(PromptedRole::new(
            "architect",
            "System structure, module boundaries, and refactoring",
            vec!["architecture", "design", "structure", "refactor", "module", "boundary"],
            "You are a software architect. Focus on structure, boundaries, and long-term maintainability.",
            0.8,
            llm.clone(),
        )),
        Arc::new(PromptedRole::new(
            "frontend",
            "User interfaces, components, and styling",
            vec!["ui", "component", "react", "view", "style", "css", "frontend"],
            "You are a frontend specialist. Focus on user-facing behavior, components, and styling.",
            0.8,
            llm.clone(),
        )),
        Arc::new(PromptedRole::new(
            "backend",
            "APIs, services, persistence, and integrations",
            vec!["api", "endpoint", "server", "database", "integration", "backend"],
            "You are a backend specialist. Focus on service behavior, data flow, and integration points.",
            0.8,
            llm.clone(),
        )),
        Arc::new(PromptedRole::new(
            "qa",
            "Testing strategy, coverage, and defect analysis",
            vec!["test", "coverage", "bug", "verify", "regression", "qa"],
            "You are a QA specialist. Focus on how to verify the change and where defects are likely to hide.",
            0.7,
            llm,
        )),
    ]
}
