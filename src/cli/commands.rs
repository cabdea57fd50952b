use clap::{Args, Parser, Subcommand};

use crate::model::config::DeletePolicy;

#[derive(Parser)]
#[command(name = "nt", about = concat!("navtree v", env!("CARGO_PKG_VERSION"), " - arrange navigation menus"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a different project directory
    #[arg(short = 'C', long = "project-dir", global = true)]
    pub project_dir: Option<String>,

    /// Menu to operate on (default: first menu in navtree.toml)
    #[arg(short = 'm', long, global = true)]
    pub menu: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create navtree/navtree.toml in the current directory
    Init(InitArgs),
    /// List configured menus, or add one
    Menus(MenusCmd),
    /// Show a menu as a tree
    Tree(TreeArgs),
    /// Add an item at the end of its group
    Add(AddArgs),
    /// Drop an item on a display row, with a horizontal offset
    Drag(DragArgs),
    /// Nest an item under the sibling above it
    Indent(ItemIdArg),
    /// Move an item up one level, after its former parent
    Outdent(ItemIdArg),
    /// Place an item under a parent at an index
    Mv(MvArgs),
    /// Delete an item
    Rm(RmArgs),
    /// Change an item's title
    Title(TitleArgs),
    /// Set or clear an item's link target
    Link(LinkArgs),
    /// Show an item in the served menu
    Activate(ItemIdArg),
    /// Hide an item (and everything under it) from the served menu
    Deactivate(ItemIdArg),
    /// Validate stored structure
    Check,
    /// Rewrite parents and ranks so the stored menu matches the display
    Repair,
    /// View or prune the recovery log
    Recovery(RecoveryCmd),
}

#[derive(Args)]
pub struct InitArgs {
    /// Project name (default: inferred from directory name)
    #[arg(long)]
    pub name: Option<String>,
    /// Create a menu: --add-menu <id> "name" (repeatable; default: main)
    #[arg(long = "add-menu", num_args = 2, value_names = ["ID", "NAME"], action = clap::ArgAction::Append)]
    pub menu: Vec<String>,
    /// Overwrite an existing navtree.toml
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct MenusCmd {
    #[command(subcommand)]
    pub action: Option<MenusAction>,
}

#[derive(Subcommand)]
pub enum MenusAction {
    /// Register a new menu in navtree.toml
    Add(MenuAddArgs),
}

#[derive(Args)]
pub struct MenuAddArgs {
    pub id: String,
    pub name: String,
}

#[derive(Args)]
pub struct TreeArgs {
    /// Only what the served menu shows
    #[arg(long)]
    pub active: bool,
    /// Prefix each row with its display index
    #[arg(long)]
    pub rows: bool,
}

#[derive(Args)]
pub struct AddArgs {
    /// Item title
    pub title: String,
    /// Parent item ID (default: top level)
    #[arg(long)]
    pub parent: Option<String>,
    /// Explicit item ID (default: <menu>-NNN)
    #[arg(long)]
    pub id: Option<String>,
    /// Link target as <kind>:<id>
    #[arg(long, conflicts_with = "url")]
    pub link: Option<String>,
    /// Custom URL or path
    #[arg(long)]
    pub url: Option<String>,
    /// Open in a new tab
    #[arg(long)]
    pub new_tab: bool,
    /// Create hidden from the served menu
    #[arg(long)]
    pub inactive: bool,
}

#[derive(Args)]
pub struct DragArgs {
    /// Item ID
    pub id: String,
    /// Row index to drop on (see `nt tree --rows`, with the item's own
    /// children left out)
    #[arg(long)]
    pub slot: usize,
    /// Horizontal displacement; positive nests, negative promotes
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub dx: i32,
}

#[derive(Args)]
pub struct ItemIdArg {
    /// Item ID
    pub id: String,
}

#[derive(Args)]
pub struct MvArgs {
    /// Item ID
    pub id: String,
    /// Position among the new siblings (0-indexed)
    pub index: usize,
    /// New parent item ID
    #[arg(long, conflicts_with = "root")]
    pub parent: Option<String>,
    /// Move to the top level
    #[arg(long)]
    pub root: bool,
}

#[derive(Args)]
pub struct RmArgs {
    /// Item ID
    pub id: String,
    /// What to do with children (default: [delete] policy in navtree.toml)
    #[arg(long, value_parser = parse_policy)]
    pub policy: Option<DeletePolicy>,
}

#[derive(Args)]
pub struct TitleArgs {
    /// Item ID
    pub id: String,
    /// New title
    pub title: String,
}

#[derive(Args)]
pub struct LinkArgs {
    /// Item ID
    pub id: String,
    /// Link target as <kind>:<id>
    #[arg(conflicts_with_all = ["url", "clear"])]
    pub target: Option<String>,
    /// Custom URL or path
    #[arg(long, conflicts_with = "clear")]
    pub url: Option<String>,
    /// Remove the link
    #[arg(long)]
    pub clear: bool,
}

#[derive(Args)]
pub struct RecoveryCmd {
    #[command(subcommand)]
    pub action: Option<RecoveryAction>,
    /// Maximum number of entries to show (default: 10)
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Subcommand)]
pub enum RecoveryAction {
    /// Remove old entries
    Prune(RecoveryPruneArgs),
    /// Print the absolute path to the recovery log
    Path,
}

#[derive(Args)]
pub struct RecoveryPruneArgs {
    /// Remove entries before this timestamp (ISO-8601; default: 30 days ago)
    #[arg(long)]
    pub before: Option<String>,
    /// Remove all entries
    #[arg(long, conflicts_with = "before")]
    pub all: bool,
}

fn parse_policy(s: &str) -> Result<DeletePolicy, String> {
    match s {
        "promote" => Ok(DeletePolicy::Promote),
        "cascade" => Ok(DeletePolicy::Cascade),
        "reject" => Ok(DeletePolicy::Reject),
        other => Err(format!(
            "unknown policy \"{}\" (expected promote, cascade or reject)",
            other
        )),
    }
}
