//! The router itself: analyze, fan out, synthesize.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use crate::error::RouterError;
use crate::llm::LanguageModel;
use crate::router::roles::{builtin_roles, AgentRole};
use crate::router::types::{
    AgentResponse, CoordinationStatus, CoordinationTask, RoutedResponse, RouterContext,
};

/// Routes free-form requests to one or more agent roles and synthesizes
/// their responses.
///
/// The role set is read-mostly: registration happens at startup or
/// extension time, routing only reads. In-flight requests are tracked in
/// an active set callers can query for display.
pub struct AgentRouter {
    roles: RwLock<Vec<Arc<dyn AgentRole>>>,
    llm: Arc<dyn LanguageModel>,
    active: Mutex<HashMap<String, CoordinationTask>>,
}

impl AgentRouter {
    /// A router with no roles. Routing fails until at least one is
    /// registered.
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self {
            roles: RwLock::new(Vec::new()),
            llm,
            active: Mutex::new(HashMap::new()),
        }
    }

    /// A router preloaded with the built-in role set.
    pub fn with_builtin_roles(llm: Arc<dyn LanguageModel>) -> Self {
        let router = Self::new(llm.clone());
        for role in builtin_roles(llm) {
            router.register_role(role);
        }
        router
    }

    pub fn register_role(&self, role: Arc<dyn AgentRole>) {
        self.roles.write().unwrap().push(role);
    }

    pub fn role_names(&self) -> Vec<String> {
        self.roles
            .read()
            .unwrap()
            .iter()
            .map(|r| r.name().to_string())
            .collect()
    }

    /// Requests currently being routed or synthesized.
    pub fn active_tasks(&self) -> Vec<CoordinationTask> {
        self.active.lock().unwrap().values().cloned().collect()
    }

    /// Select the role set for a request by capability-keyword scoring.
    ///
    /// Every role with at least one keyword hit is selected, so a request
    /// spanning several domains fans out to several specialists while a
    /// single-domain request selects exactly one. With no hits at all the
    /// `lead` role (or the first registered role) answers alone.
    pub fn analyze(&self, request: &str, ctx: &RouterContext) -> Vec<Arc<dyn AgentRole>> {
        let roles = self.roles.read().unwrap();
        let haystack = format!("{} {}", request, ctx.scoring_text()).to_lowercase();

        let mut selected: Vec<Arc<dyn AgentRole>> = roles
            .iter()
            .filter(|role| capability_score(role.as_ref(), &haystack) > 0)
            .cloned()
            .collect();

        if selected.is_empty() {
            if let Some(fallback) = roles
                .iter()
                .find(|r| r.name() == "lead")
                .or_else(|| roles.first())
            {
                selected.push(fallback.clone());
            }
        }
        selected
    }

    /// Route a free-form request end to end.
    ///
    /// A role whose invocation fails is dropped from the result set; the
    /// request only fails when no roles are registered or every selected
    /// role failed.
    pub async fn route(
        &self,
        request: &str,
        ctx: &RouterContext,
    ) -> Result<RoutedResponse, RouterError> {
        if self.roles.read().unwrap().is_empty() {
            return Err(RouterError::NoRolesRegistered);
        }

        let selected = self.analyze(request, ctx);

        let mut coordination = CoordinationTask::new(request, ctx.to_prompt_context());
        coordination.required_roles = selected.iter().map(|r| r.name().to_string()).collect();
        coordination.status = CoordinationStatus::Processing;
        let coordination_id = coordination.id.clone();
        tracing::info!(
            request = %coordination.description,
            roles = ?coordination.required_roles,
            "routing request"
        );
        self.active
            .lock()
            .unwrap()
            .insert(coordination_id.clone(), coordination);

        // Fan out: every selected role runs concurrently; the join below is
        // a barrier, a slow role delays synthesis but a failed one only
        // removes itself from the result set.
        let mut handles = Vec::with_capacity(selected.len());
        for role in selected {
            let request = request.to_string();
            let ctx = ctx.clone();
            handles.push(tokio::spawn(async move {
                let name = role.name().to_string();
                let outcome = role.process(&request, &ctx).await;
                (name, outcome)
            }));
        }

        let mut responses: Vec<(String, AgentResponse)> = Vec::new();
        let mut failures: Vec<String> = Vec::new();
        for joined in futures::future::join_all(handles).await {
            match joined {
                Ok((name, Ok(response))) => responses.push((name, response)),
                Ok((name, Err(e))) => {
                    tracing::warn!(role = %name, error = %e, "role failed, continuing with partial results");
                    failures.push(format!("{name}: {e}"));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "role task panicked");
                    failures.push(format!("join: {e}"));
                }
            }
        }

        if let Some(task) = self.active.lock().unwrap().get_mut(&coordination_id) {
            task.status = CoordinationStatus::Synthesizing;
        }

        let result = if responses.is_empty() {
            Err(RouterError::AllRolesFailed(failures.join("; ")))
        } else {
            Ok(self.synthesize(request, responses, ctx).await)
        };

        // The coordination record goes away on every exit path.
        self.active.lock().unwrap().remove(&coordination_id);
        result
    }

    /// Forward one discrete unit of work to the single best-matching role
    /// and return its raw response.
    pub async fn delegate(
        &self,
        title: &str,
        description: &str,
    ) -> Result<AgentResponse, RouterError> {
        let best = {
            let roles = self.roles.read().unwrap();
            let haystack = format!("{title} {description}").to_lowercase();
            roles
                .iter()
                .max_by_key(|role| capability_score(role.as_ref(), &haystack))
                .cloned()
                .ok_or(RouterError::NoRolesRegistered)?
        };

        tracing::debug!(role = %best.name(), title = %title, "delegating unit of work");
        let request = format!("{title}\n\n{description}");
        best.process(&request, &RouterContext::default())
            .await
            .map_err(|e| RouterError::AllRolesFailed(format!("{}: {e}", best.name())))
    }

    /// One respondent answers verbatim; several get a combined report with
    /// a labeled perspective section per role and a merged next-steps
    /// section. The summary narrative comes from the language model when
    /// available, with a deterministic fallback.
    async fn synthesize(
        &self,
        request: &str,
        mut responses: Vec<(String, AgentResponse)>,
        ctx: &RouterContext,
    ) -> RoutedResponse {
        // Most confident perspective leads the report.
        responses.sort_by(|a, b| b.1.confidence.total_cmp(&a.1.confidence));
        let responding_roles: Vec<String> = responses.iter().map(|(n, _)| n.clone()).collect();

        if responses.len() == 1 {
            let (_, response) = responses.into_iter().next().unwrap();
            return RoutedResponse {
                content: response.content,
                suggestions: response.suggestions,
                responding_roles,
            };
        }

        let mut content = String::new();
        for (name, response) in &responses {
            content.push_str(&format!("## Perspective: {name}\n{}\n\n", response.content));
        }

        let prompt = format!(
            "Several specialists analyzed this request:\n{request}\n\n{content}\nSummarize the points of agreement, the points requiring coordination between them, and the recommended next steps.",
        );
        let summary = match self.llm.generate(&prompt, &ctx.to_prompt_context()).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "synthesis summary unavailable, using role content only");
                format!(
                    "Collected {} perspectives ({}). Review each section above and reconcile overlapping recommendations.",
                    responses.len(),
                    responding_roles.join(", ")
                )
            }
        };
        content.push_str(&format!("## Summary\n{summary}\n\n"));

        let suggestions = merge_suggestions(&responses);
        content.push_str("## Next steps\n");
        if suggestions.is_empty() {
            content.push_str("- No concrete suggestions were raised.\n");
        } else {
            for suggestion in &suggestions {
                content.push_str(&format!("- {suggestion}\n"));
            }
        }

        RoutedResponse {
            content,
            suggestions,
            responding_roles,
        }
    }
}

fn capability_score(role: &dyn AgentRole, haystack: &str) -> usize {
    role.capabilities()
        .iter()
        .filter(|keyword| haystack.contains(*keyword))
        .count()
}

/// Merge suggestion lists across roles, deduplicating while keeping first
/// appearance order.
fn merge_suggestions(responses: &[(String, AgentResponse)]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut merged = Vec::new();
    for (_, response) in responses {
        for suggestion in &response.suggestions {
            if seen.insert(suggestion.clone()) {
                merged.push(suggestion.clone());
            }
        }
    }
    merged
}
