use std::sync::Arc;

use async_trait::async_trait;

use conductor::error::RouterError;
use conductor::llm::ScriptedModel;
use conductor::router::{AgentResponse, AgentRole, AgentRouter, RouterContext};

// ─── Helpers ──────────────────────────────────────────────────────────

fn builtin_router() -> AgentRouter {
    AgentRouter::with_builtin_roles(Arc::new(ScriptedModel::fixed(
        "Analysis of the request.\n- add integration coverage",
    )))
}

struct Unavailable {
    name: &'static str,
    capabilities: Vec<&'static str>,
}

#[async_trait]
impl AgentRole for Unavailable {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "always errors"
    }

    fn capabilities(&self) -> &[&str] {
        &self.capabilities
    }

    async fn process(
        &self,
        _request: &str,
        _ctx: &RouterContext,
    ) -> anyhow::Result<AgentResponse> {
        anyhow::bail!("provider unreachable")
    }
}

// ============================================================
// Role selection
// ============================================================

#[tokio::test]
async fn test_single_domain_request_gets_one_perspective() {
    let router = builtin_router();

    let response = router
        .route("harden the api endpoint validation", &RouterContext::default())
        .await
        .unwrap();

    assert_eq!(response.responding_roles, vec!["backend"]);
    // One respondent answers verbatim, with no report scaffolding.
    assert!(!response.content.contains("## Perspective"));
    assert_eq!(response.suggestions, vec!["add integration coverage"]);
}

#[tokio::test]
async fn test_cross_cutting_request_fans_out_to_both_specialists() {
    let router = builtin_router();

    let response = router
        .route(
            "change the settings ui component and the api endpoint it calls",
            &RouterContext::default(),
        )
        .await
        .unwrap();

    assert!(response.responding_roles.contains(&"frontend".to_string()));
    assert!(response.responding_roles.contains(&"backend".to_string()));
    assert!(response.content.contains("## Perspective: frontend"));
    assert!(response.content.contains("## Perspective: backend"));
    assert!(response.content.contains("## Summary"));
    assert!(response.content.contains("## Next steps"));
}

#[tokio::test]
async fn test_unmatched_request_falls_back_to_lead() {
    let router = builtin_router();

    let response = router
        .route("what should I work on this afternoon?", &RouterContext::default())
        .await
        .unwrap();

    assert_eq!(response.responding_roles, vec!["lead"]);
}

#[tokio::test]
async fn test_current_file_context_influences_selection() {
    let router = builtin_router();
    let ctx = RouterContext {
        current_file: Some("src/components/Button.css".into()),
        ..Default::default()
    };

    let response = router.route("make this look better", &ctx).await.unwrap();
    assert_eq!(response.responding_roles, vec!["frontend"]);
}

// ============================================================
// Partial failure
// ============================================================

#[tokio::test]
async fn test_failed_role_degrades_to_remaining_perspectives() {
    let router = builtin_router();
    // Latest registration shares the "ui" keyword, so both it and the
    // built-in frontend role are selected for a ui request.
    router.register_role(Arc::new(Unavailable {
        name: "design-reviewer",
        capabilities: vec!["ui"],
    }));

    let response = router
        .route("review the ui layout", &RouterContext::default())
        .await
        .unwrap();

    assert_eq!(response.responding_roles, vec!["frontend"]);
    assert!(!response.content.contains("design-reviewer"));
}

#[tokio::test]
async fn test_every_role_failing_surfaces_an_error() {
    let router = AgentRouter::new(Arc::new(ScriptedModel::fixed("unused")));
    router.register_role(Arc::new(Unavailable {
        name: "solo",
        capabilities: vec!["api"],
    }));

    match router.route("fix the api", &RouterContext::default()).await {
        Err(RouterError::AllRolesFailed(message)) => {
            assert!(message.contains("solo"));
            assert!(message.contains("provider unreachable"));
        }
        other => panic!("expected AllRolesFailed, got {other:?}"),
    }

    assert!(router.active_tasks().is_empty(), "coordination record cleaned up");
}

// ============================================================
// Delegation
// ============================================================

#[tokio::test]
async fn test_delegate_routes_to_best_scoring_role() {
    let router = builtin_router();

    let response = router
        .delegate("Raise coverage", "add a regression test for the parser bug")
        .await
        .unwrap();

    // qa matches "coverage", "test", "regression", and "bug".
    assert!(!response.content.is_empty());
    assert_eq!(response.suggestions, vec!["add integration coverage"]);
}

#[tokio::test]
async fn test_delegate_with_no_roles_fails_gracefully() {
    let router = AgentRouter::new(Arc::new(ScriptedModel::fixed("unused")));
    match router.delegate("anything", "at all").await {
        Err(RouterError::NoRolesRegistered) => {}
        other => panic!("expected NoRolesRegistered, got {other:?}"),
    }
}
