//! Command-line interface for mytodo.
//!
//! One-shot commands load the list, perform a single operation through the
//! view controller, and print the resulting view. `shell` keeps a view open
//! and reads commands from stdin.

mod run;
mod shell;

#[cfg(test)]
mod tests;

pub use run::{open_store, run, run_in, CliOutput};
pub use shell::{parse_line, run_shell, ShellCommand};

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// mytodo - a todo list backed by a hosted table.
///
/// The store is configured through SUPABASE_URL and SUPABASE_ANON_KEY
/// (environment, .env, or mytodo.yaml). Use --sqlite to work against a
/// local database instead.
#[derive(Parser, Debug)]
#[command(name = "mytodo")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Read store settings from this file instead of ./mytodo.yaml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Use a local SQLite database (a path, or :memory:)
    #[arg(long, global = true)]
    pub sqlite: Option<PathBuf>,

    /// Print the view as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Load templates from this directory, falling back to the built-in ones
    #[arg(long, global = true)]
    pub templates: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show the task list, newest first.
    List {
        /// Hide finished tasks
        #[arg(long)]
        hide_completed: bool,
    },

    /// Add a task (at least 3 characters).
    Add {
        /// Task text
        text: String,
    },

    /// Replace the text of a task.
    Edit {
        /// Task id
        id: String,

        /// New text
        text: String,
    },

    /// Mark a task finished, or unfinished if it already is.
    Toggle {
        /// Task id
        id: String,
    },

    /// Delete a task.
    Delete {
        /// Task id
        id: String,
    },

    /// Open an interactive session reading commands from stdin.
    ///
    /// Store calls run in the background, so further commands can be typed
    /// while earlier ones are still in flight. Type `help` for the list of
    /// commands.
    Shell,

    /// Show version information.
    Version,
}

impl Command {
    /// Returns true if this command talks to the task store.
    #[must_use]
    pub const fn needs_store(&self) -> bool {
        !matches!(self, Self::Version)
    }
}
