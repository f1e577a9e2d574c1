//! Parley - a terminal assistant backed by a chat-completion API.
//!
//! The model answers in prose, or with a single JSON directive that invokes one
//! of a few local tools (notes, tasks, key/value memory). This library holds the
//! record store, the directive parser, the tool registry and the turn
//! orchestrator used by the `parley` binary.

pub mod cli;
pub mod commands;
pub mod config;
pub mod directive;
pub mod llm;
pub mod models;
pub mod orchestrator;
pub mod session;
pub mod storage;
pub mod tools;


/// Library-level error type for parley operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Rejected record input (empty note/task content, empty memory key).
    #[error("{0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing credential or unusable configuration. Fatal before any turn.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for parley operations.
pub type Result<T> = std::result::Result<T, Error>;
