use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "prism", about = concat!("prism v", env!("CARGO_PKG_VERSION"), " - phases down to actions"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a different project directory
    #[arg(short = 'C', long = "project-dir", global = true)]
    pub project_dir: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new prism project in the current directory
    Init(InitArgs),
    /// Add a phase, milestone, objective, deliverable or action
    Add(AddArgs),
    /// Change an item's name, description, due date or status
    Edit(EditArgs),
    /// Delete an item and everything beneath it
    Delete(DeleteArgs),
    /// Show an item and its children
    Show(ShowArgs),
    /// Set the working context, or show the current position
    Nav(NavArgs),
    /// Work through actions one at a time
    Task(TaskCmd),
    /// Summarize progress
    Status(StatusArgs),
    /// List archived items
    Archived(ArchivedArgs),
    /// Manage ideas that are not in the tree yet
    Orphan(OrphanCmd),
}

#[derive(Args)]
pub struct InitArgs {
    /// Reinitialize even if .prism/ already exists
    #[arg(long)]
    pub force: bool,
}

// ---------------------------------------------------------------------------
// Item args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct AddArgs {
    /// Kind of item (phase, milestone, objective, deliverable, action)
    pub kind: String,
    /// Item name
    pub name: String,
    /// Description
    #[arg(short, long)]
    pub description: Option<String>,
    /// Parent path (default: inferred from the current position)
    #[arg(short, long)]
    pub parent: Option<String>,
    /// Initial status
    #[arg(long)]
    pub status: Option<String>,
    /// Move the cursor and context to the new item
    #[arg(long)]
    pub nav: bool,
}

#[derive(Args)]
pub struct EditArgs {
    /// Item path (default: the current context)
    pub path: Option<String>,
    /// New name
    #[arg(long)]
    pub name: Option<String>,
    /// New description
    #[arg(short, long)]
    pub description: Option<String>,
    /// Due date (deliverables and actions only)
    #[arg(long)]
    pub due: Option<String>,
    /// New status
    #[arg(long)]
    pub status: Option<String>,
}

#[derive(Args)]
pub struct DeleteArgs {
    /// Item path
    pub path: String,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Item path (default: the current context, or the whole tree)
    pub path: Option<String>,
    /// Include archived children
    #[arg(long)]
    pub archived: bool,
}

#[derive(Args)]
pub struct NavArgs {
    /// Path or token to use as the context
    pub path: Option<String>,
}

// ---------------------------------------------------------------------------
// Task args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct TaskCmd {
    #[command(subcommand)]
    pub action: TaskAction,
}

#[derive(Subcommand)]
pub enum TaskAction {
    /// Start the next pending action (or show the one in progress)
    Start,
    /// Complete the action in progress
    Done,
    /// Complete the action in progress and start the next one
    Next,
}

// ---------------------------------------------------------------------------
// Summary args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct StatusArgs {
    /// Limit to a phase
    #[arg(long, conflicts_with = "milestone")]
    pub phase: Option<String>,
    /// Limit to a milestone
    #[arg(long)]
    pub milestone: Option<String>,
}

#[derive(Args)]
pub struct ArchivedArgs {
    /// Only this kind (phase, milestone, objective)
    #[arg(long)]
    pub kind: Option<String>,
}

// ---------------------------------------------------------------------------
// Orphan args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct OrphanCmd {
    #[command(subcommand)]
    pub action: OrphanAction,
}

#[derive(Subcommand)]
pub enum OrphanAction {
    /// List orphan ideas, highest priority first
    List,
    /// Record a new idea
    Add {
        /// Idea name
        name: String,
        /// What the idea is about
        #[arg(short, long)]
        description: String,
        /// Priority: a number or a label (low, medium, high, critical)
        #[arg(long)]
        priority: Option<String>,
    },
    /// Turn an idea into a tree item
    Adopt {
        /// Orphan id (or a unique prefix)
        id: String,
        /// Kind of item to create
        #[arg(long)]
        kind: String,
        /// Parent path (default: inferred from the current position)
        #[arg(short, long)]
        parent: Option<String>,
    },
    /// Drop an idea
    Delete {
        /// Orphan id (or a unique prefix)
        id: String,
    },
}
