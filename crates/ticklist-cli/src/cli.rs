use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use ticklist_core::{tasks::Priority, view::Filter};

/// CLI surface definition.
#[derive(Parser, Debug)]
#[command(
    name = "ticklist",
    about = "Local task list with filters, search and durable storage",
    version,
    propagate_version = true
)]
pub struct Cli {
    /// Optional subcommand; defaults to launching the TUI when absent.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Launch the interactive TUI (press q to exit).
    Tui,
    /// Print version and exit.
    Version,
    /// Run a health check against the configured storage.
    Health,
    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Work with tasks without opening the TUI.
    #[command(subcommand)]
    Task(TaskCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Create a default config file if one does not exist.
    Init,
}

/// Ids may be given in full or as a unique prefix of at least 4 characters.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum TaskCommand {
    /// List tasks, newest first.
    List {
        /// all, completed or pending.
        #[arg(long, short)]
        filter: Option<Filter>,
        /// Case-insensitive match on text or category.
        #[arg(long, short)]
        search: Option<String>,
    },
    /// Add a task.
    Add {
        #[arg(required = true)]
        text: Vec<String>,
        #[arg(long, short, default_value_t = Priority::Low)]
        priority: Priority,
        /// Due date as YYYY-MM-DD.
        #[arg(long)]
        due: Option<NaiveDate>,
        #[arg(long, short)]
        category: Option<String>,
    },
    /// Flip a task between pending and completed.
    Toggle { id: String },
    /// Change fields of a task; omitted fields keep their value.
    Edit {
        id: String,
        #[arg(long)]
        text: Option<String>,
        #[arg(long, short)]
        priority: Option<Priority>,
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<NaiveDate>,
        #[arg(long)]
        clear_due: bool,
        /// New category; an empty value removes it.
        #[arg(long, short)]
        category: Option<String>,
    },
    /// Delete a task.
    Delete { id: String },
    /// Print task counts.
    Stats,
}
