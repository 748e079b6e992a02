use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tt", about = concat!("tasktree v", env!("CARGO_PKG_VERSION"), " - ordered task lists as a tree"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Entity store file
    #[arg(short = 's', long = "store", global = true, default_value = "tasks.json")]
    pub store: String,

    /// Config file
    #[arg(long, global = true, default_value = "tasktree.toml")]
    pub config: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the task tree, or the subtree below one entity
    Show(ShowArgs),
    /// Validate tree structure and sibling links
    Check,
    /// Compare two store files
    Diff(DiffArgs),
    /// Add a list, or an item with --list / --parent
    Add(AddArgs),
    /// Change an entity's title
    Title(TitleArgs),
    /// Remove entities (an item's children take its place)
    Rm(IdsArgs),
    /// Move items up one level, after their parent
    Promote(IdsArgs),
    /// Move items under their previous sibling
    Demote(IdsArgs),
    /// Swap items with their previous sibling
    Up(IdsArgs),
    /// Swap items with their next sibling
    Down(IdsArgs),
    /// Mark items completed (cascades to subtasks)
    Done(IdsArgs),
    /// Mark items as needing action (reopens completed parents)
    Reopen(IdsArgs),
}

// ---------------------------------------------------------------------------
// Read command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ShowArgs {
    /// Entity to show (default: everything)
    pub id: Option<String>,
}

#[derive(Args)]
pub struct DiffArgs {
    /// Store file taken as the baseline
    pub baseline: String,
    /// Store file taken as the working copy
    pub working: String,
}

// ---------------------------------------------------------------------------
// Write command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct AddArgs {
    /// Title of the new entity
    pub title: String,
    /// List to add an item to
    #[arg(long)]
    pub list: Option<String>,
    /// Parent item (implies its list)
    #[arg(long)]
    pub parent: Option<String>,
    /// Sort position among siblings
    #[arg(long)]
    pub position: Option<i64>,
}

#[derive(Args)]
pub struct TitleArgs {
    /// Entity ID
    pub id: String,
    /// New title
    pub title: String,
}

#[derive(Args)]
pub struct IdsArgs {
    /// Entity IDs
    #[arg(required = true)]
    pub ids: Vec<String>,
}
