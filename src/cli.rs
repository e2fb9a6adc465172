use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "conductor", version, about = "Agentic task orchestration engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute a task plan from a JSON file
    Run {
        /// Path to the task plan (JSON)
        plan: PathBuf,

        /// Workspace directory for file side effects
        #[arg(short, long)]
        workspace: Option<PathBuf>,

        /// Directory for task snapshots
        #[arg(long)]
        state_dir: Option<PathBuf>,

        /// Approve every gated step without prompting
        #[arg(long)]
        auto_approve: bool,
    },
    /// Resume a previously interrupted task
    Resume {
        /// Task id of the snapshot to resume
        task_id: String,

        /// Directory for task snapshots
        #[arg(long)]
        state_dir: Option<PathBuf>,

        /// Approve every gated step without prompting
        #[arg(long)]
        auto_approve: bool,
    },
    /// List resumable task snapshots
    List {
        /// Directory for task snapshots
        #[arg(long)]
        state_dir: Option<PathBuf>,
    },
    /// Route a free-form request through the agent roles
    Ask {
        /// The request text
        request: String,

        /// File the request is about, if any
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Workspace directory
        #[arg(short, long)]
        workspace: Option<PathBuf>,
    },
}
