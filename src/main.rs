use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;

use conductor::actions::ActionRegistry;
use conductor::cli::{Cli, Commands};
use conductor::config;
use conductor::engine::approval::{ApprovalGate, ApprovalRequest, AutoApprove};
use conductor::engine::events::{EngineEvent, EventSink, FileChange};
use conductor::engine::lifecycle::TaskManager;
use conductor::llm::OfflineModel;
use conductor::persistence::{FileTaskStore, TaskStore};
use conductor::router::{AgentRouter, RouterContext};
use conductor::task::{Task, TaskPlan, TaskStatus};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let config = config::load_config(&cli)?;
    tracing::info!(
        workspace = %config.workspace.display(),
        state_dir = %config.state_dir.display(),
        "Config loaded"
    );

    match cli.command {
        Commands::Run { ref plan, .. } => {
            let json = std::fs::read_to_string(plan)?;
            let task = TaskPlan::from_json(&json)?.into_task(config.default_max_retries);
            let request = task.title.clone();

            let manager = build_manager(&config)?;
            let done = manager.execute_task(task, &request).await;
            print_summary(&done);
            if done.status == TaskStatus::Failed {
                anyhow::bail!("task failed: {}", done.error.as_deref().unwrap_or("unknown"));
            }
        }
        Commands::Resume { ref task_id, .. } => {
            let manager = build_manager(&config)?;
            let done = manager.resume_task(task_id).await?;
            print_summary(&done);
            if done.status == TaskStatus::Failed {
                anyhow::bail!("task failed: {}", done.error.as_deref().unwrap_or("unknown"));
            }
        }
        Commands::List { .. } => {
            let store = FileTaskStore::new(&config.state_dir)?;
            let states = store.list().await?;
            if states.is_empty() {
                println!("No resumable tasks.");
            }
            for state in states {
                println!(
                    "{}  {}  [{}/{}]  saved {}",
                    state.task.id,
                    state.task.title,
                    state.task.metadata.completed_steps,
                    state.task.metadata.total_steps,
                    state.saved_at,
                );
            }
        }
        Commands::Ask { ref request, ref file, .. } => {
            let router = AgentRouter::with_builtin_roles(Arc::new(OfflineModel));
            let ctx = RouterContext {
                current_file: file.clone(),
                workspace: Some(config.workspace.clone()),
                ..Default::default()
            };
            let response = router.route(request, &ctx).await?;
            println!("{}", response.content);
            if !response.suggestions.is_empty() {
                println!("\nSuggestions:");
                for suggestion in &response.suggestions {
                    println!("  - {suggestion}");
                }
            }
            tracing::info!(roles = ?response.responding_roles, "request routed");
        }
    }

    Ok(())
}

fn build_manager(config: &config::AppConfig) -> anyhow::Result<TaskManager> {
    std::fs::create_dir_all(&config.workspace)?;
    let registry = Arc::new(ActionRegistry::with_builtins());
    let store = Arc::new(FileTaskStore::new(&config.state_dir)?);
    let llm = Arc::new(OfflineModel);

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    spawn_event_printer(rx);

    let gate: Arc<dyn ApprovalGate> = if config.auto_approve {
        Arc::new(AutoApprove)
    } else {
        Arc::new(ConsoleApproval)
    };

    Ok(TaskManager::new(registry, store, llm, &config.workspace)
        .with_events(EventSink::new(tx))
        .with_approval_gate(gate))
}

/// Prints progress events as they arrive. Stops when the engine drops its
/// sender.
fn spawn_event_printer(mut rx: tokio::sync::mpsc::UnboundedReceiver<EngineEvent>) {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                EngineEvent::StepStarted { order, title, .. } => {
                    println!("[{order}] {title} ...");
                }
                EngineEvent::TaskProgress { completed, total, .. } => {
                    println!("    {completed}/{total} steps done");
                }
                EngineEvent::StepErrored { message, .. } => {
                    println!("    error: {message}");
                }
                EngineEvent::FileChanged { path, change } => {
                    let verb = match change {
                        FileChange::Created => "created",
                        FileChange::Modified => "modified",
                        FileChange::Deleted => "deleted",
                    };
                    println!("    {verb} {}", path.display());
                }
                EngineEvent::StepCompleted { .. }
                | EngineEvent::TaskCompleted { .. }
                | EngineEvent::TaskError { .. } => {}
            }
        }
    });
}

fn print_summary(task: &Task) {
    let status = match task.status {
        TaskStatus::Planning => "planning",
        TaskStatus::InProgress => "in progress",
        TaskStatus::Paused => "paused",
        TaskStatus::Completed => "completed",
        TaskStatus::Failed => "failed",
        TaskStatus::Cancelled => "cancelled",
    };
    println!(
        "\nTask '{}' {} ({}/{} steps{})",
        task.title,
        status,
        task.metadata.completed_steps,
        task.metadata.total_steps,
        task.metadata
            .execution_time_ms
            .map(|ms| format!(", {ms} ms"))
            .unwrap_or_default(),
    );
    if let Some(ref error) = task.error {
        println!("  error: {error}");
    }
}

/// Interactive approval prompt on stdin.
struct ConsoleApproval;

#[async_trait]
impl ApprovalGate for ConsoleApproval {
    async fn review(&self, request: ApprovalRequest) -> bool {
        println!(
            "\nApproval required: step '{}' of task '{}'",
            request.step_title, request.task_title
        );
        if !request.step_description.is_empty() {
            println!("  {}", request.step_description);
        }
        println!("  action: {} {}", request.action_kind, request.action_params);
        print!("Proceed? [y/N] ");
        let _ = std::io::stdout().flush();

        let answer = tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).map(|_| line).ok()
        })
        .await
        .ok()
        .flatten()
        .unwrap_or_default();

        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}
