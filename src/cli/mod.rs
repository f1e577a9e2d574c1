//! CLI argument definitions for parley.

use clap::{Parser, Subcommand};

/// Parley - a terminal assistant that can keep notes, tasks and memory.
///
/// Start with `parley chat`. Records can also be inspected and edited directly
/// with `parley note`, `parley task` and `parley memory`.
#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(author, version, about = "A terminal assistant backed by a chat-completion API", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Completion model to use (overrides config.kdl)
    #[arg(short = 'm', long = "model", global = true, env = "PARLEY_MODEL")]
    pub model: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an interactive conversation (/clear, /help, /quit)
    Chat,

    /// Send one message in a fresh conversation and print the answer
    Ask {
        /// Message to send
        message: String,
    },

    /// Run a tool directive directly, without asking the model
    ///
    /// Example: parley tool '{"tool":"add_note","args":{"text":"buy milk"}}'
    Tool {
        /// Directive JSON text
        directive: String,
    },

    /// Note commands
    Note {
        #[command(subcommand)]
        command: NoteCommands,
    },

    /// Task commands
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },

    /// Long-term memory commands
    Memory {
        #[command(subcommand)]
        command: MemoryCommands,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Note subcommands
#[derive(Subcommand, Debug)]
pub enum NoteCommands {
    /// Save a note
    Add {
        /// Note text
        text: String,
    },

    /// List notes, newest first
    List {
        /// Maximum number of notes
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },

    /// Find notes containing a substring (ASCII case-insensitive)
    Search {
        /// Substring to look for
        query: String,

        /// Maximum number of notes
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },
}

/// Task subcommands
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Add an open task
    Add {
        /// Task text
        text: String,
    },

    /// List tasks by status, newest first
    List {
        /// Status to show (open, done)
        #[arg(short, long, default_value = "open")]
        status: String,

        /// Maximum number of tasks
        #[arg(short = 'n', long, default_value_t = 50)]
        limit: usize,
    },

    /// Mark a task done
    Close {
        /// Task ID
        id: i64,
    },
}

/// Memory subcommands
#[derive(Subcommand, Debug)]
pub enum MemoryCommands {
    /// Remember a value under a key (overwrites)
    Set {
        key: String,
        value: String,
    },

    /// Show the value stored under a key
    Get {
        key: String,
    },

    /// List all entries, most recently updated first
    List,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show resolved settings and where they came from
    Show,

    /// Set a value in config.kdl (model, timeout-secs, history-window, api-base)
    Set {
        key: String,
        value: String,
    },

    /// Store the API key in state.kdl (owner-only permissions)
    SetKey {
        key: String,
    },
}
