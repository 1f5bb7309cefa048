use clap::{Args, Parser, Subcommand};

use crate::model::settings::{GroupBy, SortBy, ViewMode, ViewType};
use crate::model::task::{Priority, Status};

#[derive(Parser)]
#[command(name = "tp", about = concat!("taskpanel v", env!("CARGO_PKG_VERSION"), " - tasks, priorities and reminders"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a different workspace directory
    #[arg(short = 'C', long = "workspace-dir", global = true)]
    pub workspace_dir: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a .taskpanel/ workspace in the current directory
    Init,
    /// List tasks grouped into sections
    List(ListArgs),
    /// Show task details
    Show(ShowArgs),
    /// Add a task at the end of the list
    Add(AddArgs),
    /// Change task status
    Status(StatusArgs),
    /// Change task priority
    Priority(PriorityArgs),
    /// Change task title
    Title(TitleArgs),
    /// Set task description (empty clears it)
    Describe(DescribeArgs),
    /// Set or clear the due date
    Due(DueArgs),
    /// Add reminders, or clear them all
    Remind(RemindArgs),
    /// Move a task before another, or to the end of a group
    Mv(MvArgs),
    /// Delete a task
    Rm(RmArgs),
    /// Subtask management
    Sub(SubCmd),
    /// Show task statistics
    Stats,
    /// Show or change view settings
    Settings(SettingsArgs),
    /// Show or change workspace configuration
    Config(ConfigCmd),
    /// Read JSON commands from stdin, one per line, and answer each on stdout
    Apply,
    /// Run the reminder scheduler until interrupted
    Watch,
}

// ---------------------------------------------------------------------------
// Read command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ListArgs {
    /// View whose saved settings apply
    #[arg(long, default_value = "sidebar")]
    pub view: ViewType,
    /// Group by status, priority or none (default: view setting)
    #[arg(long)]
    pub group_by: Option<GroupBy>,
    /// Sort by custom, priority, due or title (default: view setting)
    #[arg(long)]
    pub sort: Option<SortBy>,
    /// Include completed tasks even if the view hides them
    #[arg(long)]
    pub all: bool,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Task ID to show
    pub id: String,
}

// ---------------------------------------------------------------------------
// Write command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct AddArgs {
    /// Task title
    pub text: String,
    /// must, should, could or wont (default: config)
    #[arg(long, short)]
    pub priority: Option<Priority>,
    /// todo, ready, in-progress, testing or done
    #[arg(long, short)]
    pub status: Option<Status>,
    /// Description text
    #[arg(long, short)]
    pub description: Option<String>,
    /// Due date (epoch ms, RFC 3339, "YYYY-MM-DD HH:MM", YYYY-MM-DD, +2h)
    #[arg(long)]
    pub due: Option<String>,
    /// Reminder time, same formats as --due (repeatable)
    #[arg(long)]
    pub remind: Vec<String>,
}

#[derive(Args)]
pub struct StatusArgs {
    /// Task ID
    pub id: String,
    /// New status
    pub status: Status,
}

#[derive(Args)]
pub struct PriorityArgs {
    /// Task ID
    pub id: String,
    /// New priority
    pub priority: Priority,
}

#[derive(Args)]
pub struct TitleArgs {
    /// Task ID
    pub id: String,
    /// New title
    pub text: String,
}

#[derive(Args)]
pub struct DescribeArgs {
    /// Task ID
    pub id: String,
    /// New description
    pub text: String,
}

#[derive(Args)]
pub struct DueArgs {
    /// Task ID
    pub id: String,
    /// Due date (omit with --clear)
    #[arg(required_unless_present = "clear")]
    pub when: Option<String>,
    /// Remove the due date
    #[arg(long, conflicts_with = "when")]
    pub clear: bool,
}

#[derive(Args)]
pub struct RemindArgs {
    /// Task ID
    pub id: String,
    /// Reminder times to add
    #[arg(required_unless_present = "clear")]
    pub when: Vec<String>,
    /// Remove every reminder
    #[arg(long, conflicts_with = "when")]
    pub clear: bool,
}

#[derive(Args)]
pub struct MvArgs {
    /// Task ID to move
    pub id: String,
    /// Place before this task (default: end of the group)
    #[arg(long)]
    pub before: Option<String>,
    /// Grouping the move applies to
    #[arg(long, default_value = "status")]
    pub group_by: GroupBy,
    /// Target status group (default: current status)
    #[arg(long)]
    pub status: Option<Status>,
    /// Target priority group (default: current priority)
    #[arg(long)]
    pub priority: Option<Priority>,
}

#[derive(Args)]
pub struct RmArgs {
    /// Task ID to delete
    pub id: String,
}

#[derive(Args)]
pub struct SubCmd {
    #[command(subcommand)]
    pub action: SubAction,
}

#[derive(Subcommand)]
pub enum SubAction {
    /// Add a subtask
    Add {
        /// Parent task ID
        task: String,
        /// Subtask text
        text: String,
    },
    /// Toggle a subtask's completed flag
    Toggle {
        /// Parent task ID
        task: String,
        /// Subtask ID
        sub: String,
    },
    /// Change a subtask's text
    Title {
        /// Parent task ID
        task: String,
        /// Subtask ID
        sub: String,
        /// New text
        text: String,
    },
    /// Delete a subtask
    Rm {
        /// Parent task ID
        task: String,
        /// Subtask ID
        sub: String,
    },
}

// ---------------------------------------------------------------------------
// Settings and config args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct SettingsArgs {
    /// View to show or change
    #[arg(long, default_value = "sidebar")]
    pub view: ViewType,
    /// list or kanban
    #[arg(long)]
    pub mode: Option<ViewMode>,
    /// status, priority or none
    #[arg(long)]
    pub group_by: Option<GroupBy>,
    /// custom, priority, due or title
    #[arg(long)]
    pub sort: Option<SortBy>,
    /// Hide completed tasks (true/false)
    #[arg(long)]
    pub hide_completed: Option<bool>,
    /// Collapse a section by name (repeatable)
    #[arg(long)]
    pub collapse: Vec<String>,
    /// Expand a collapsed section (repeatable)
    #[arg(long)]
    pub expand: Vec<String>,
}

impl SettingsArgs {
    pub fn has_changes(&self) -> bool {
        self.mode.is_some()
            || self.group_by.is_some()
            || self.sort.is_some()
            || self.hide_completed.is_some()
            || !self.collapse.is_empty()
            || !self.expand.is_empty()
    }
}

#[derive(Args)]
pub struct ConfigCmd {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Set a dotted key, e.g. `stats.show_done false`
    Set {
        /// Dotted key
        key: String,
        /// New value
        value: String,
    },
}
