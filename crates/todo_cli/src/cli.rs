//! CLI argument definitions for the todo manager.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use todo_core::{Priority, StatusFilter};

#[derive(Parser)]
#[command(
    name = "todo",
    version,
    about = "Local-first todo manager",
    long_about = "Manage todos stored in a local SQLite file.\n\n\
                  Supports filtering, reordering, JSON import/export and\n\
                  due-date reminders."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// SQLite file holding the todo list.
    #[arg(long = "db", value_name = "PATH", default_value = "todos.db", global = true)]
    pub db: PathBuf,

    /// JSON configuration file (storage key, toast and reminder timings).
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Directory for rotated log files. Logging is off when omitted.
    #[arg(long = "log-dir", value_name = "DIR", global = true)]
    pub log_dir: Option<PathBuf>,

    /// Log level used with --log-dir.
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Answer yes to every confirmation prompt.
    #[arg(long = "yes", short = 'y', global = true)]
    pub yes: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Add a new todo.
    Add(AddArgs),
    /// List todos, optionally filtered.
    List(ListArgs),
    /// Show one todo in detail.
    Show(IdArg),
    /// Change fields of an existing todo.
    Edit(EditArgs),
    /// Flip a todo between open and completed.
    Toggle(IdArg),
    /// Delete one todo.
    Delete(IdArg),
    /// Move a todo to a new position in the list.
    Move(MoveArgs),
    /// Delete every completed todo.
    ClearCompleted,
    /// Mark every todo as completed.
    CompleteAll,
    /// Mark every todo as open.
    ReopenAll,
    /// Print total, active and completed counts.
    Stats,
    /// Write the full list as JSON.
    Export(ExportArgs),
    /// Replace the full list with todos from a JSON file.
    Import(ImportArgs),
    /// Add the onboarding sample todos.
    Sample,
    /// Watch due dates and print reminders until interrupted.
    Remind(RemindArgs),
}

#[derive(Args)]
pub struct IdArg {
    /// Todo id (a unique prefix is enough).
    #[arg(value_name = "ID")]
    pub id: String,
}

#[derive(Args)]
pub struct AddArgs {
    #[arg(value_name = "TITLE")]
    pub title: String,

    #[arg(long, short = 'd')]
    pub description: Option<String>,

    #[arg(long, short = 'p', value_enum)]
    pub priority: Option<PriorityArg>,

    /// Due date as RFC 3339 (`2026-03-01T09:00:00Z`) or a plain date.
    #[arg(long, value_name = "WHEN")]
    pub due: Option<String>,
}

#[derive(Args)]
pub struct ListArgs {
    #[arg(long, short = 's', value_enum, default_value = "all")]
    pub status: StatusArg,

    #[arg(long, short = 'p', value_enum)]
    pub priority: Option<PriorityArg>,

    /// Case-insensitive text matched against title and description.
    #[arg(long, value_name = "TEXT")]
    pub search: Option<String>,
}

#[derive(Args)]
pub struct EditArgs {
    #[arg(value_name = "ID")]
    pub id: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long, conflicts_with = "clear_description")]
    pub description: Option<String>,

    #[arg(long)]
    pub clear_description: bool,

    #[arg(long, value_enum)]
    pub priority: Option<PriorityArg>,

    #[arg(long, value_name = "WHEN", conflicts_with = "clear_due")]
    pub due: Option<String>,

    #[arg(long)]
    pub clear_due: bool,
}

#[derive(Args)]
pub struct MoveArgs {
    #[arg(value_name = "ID")]
    pub id: String,

    /// Zero-based target position in the full list.
    #[arg(value_name = "POSITION")]
    pub to: usize,
}

#[derive(Args)]
pub struct ExportArgs {
    /// Output file; stdout when omitted.
    #[arg(long, short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct ImportArgs {
    #[arg(value_name = "PATH")]
    pub input: PathBuf,
}

#[derive(Args)]
pub struct RemindArgs {
    /// Run a single due check and exit.
    #[arg(long)]
    pub once: bool,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum PriorityArg {
    Low,
    Medium,
    High,
}

impl From<PriorityArg> for Priority {
    fn from(value: PriorityArg) -> Self {
        match value {
            PriorityArg::Low => Priority::Low,
            PriorityArg::Medium => Priority::Medium,
            PriorityArg::High => Priority::High,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum StatusArg {
    All,
    Active,
    Completed,
}

impl From<StatusArg> for StatusFilter {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::All => StatusFilter::All,
            StatusArg::Active => StatusFilter::Active,
            StatusArg::Completed => StatusFilter::Completed,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevelArg {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}
