use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::model::view::{SortOrder, StatusFilter};

#[derive(Parser)]
#[command(name = "tb", about = concat!("[x] taskboard v", env!("CARGO_PKG_VERSION"), " - your tasks, filtered and paged"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file (default: ./taskboard.toml if present)
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `taskboard=trace` (default: from config)
    #[arg(long = "log-level", global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List tasks, filtered, sorted and paged
    List(ListArgs),
    /// Add a task
    Add(AddArgs),
    /// Mark a task complete
    Done(IdArgs),
    /// Mark a task pending again
    Reopen(IdArgs),
    /// Change a task's title
    Edit(EditArgs),
    /// Delete a task
    Rm(IdArgs),
    /// Show task counts
    Stats,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Only tasks whose title contains this text (case-insensitive)
    #[arg(short = 's', long)]
    pub search: Option<String>,
    /// Completion filter: all, completed or pending
    #[arg(long, default_value = "all")]
    pub status: StatusFilter,
    /// Order by creation time: desc (newest first) or asc
    #[arg(long, default_value = "desc")]
    pub sort: SortOrder,
    /// Page to show (1-based)
    #[arg(short = 'p', long, default_value_t = 1)]
    pub page: usize,
    /// Show the whole page instead of the initial peek
    #[arg(short = 'e', long)]
    pub expand: bool,
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// Task title
    #[arg(required = true, num_args = 1..)]
    pub title: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct IdArgs {
    /// Task ID
    pub id: String,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    /// Task ID
    pub id: String,
    /// New title
    #[arg(required = true, num_args = 1..)]
    pub title: Vec<String>,
}
