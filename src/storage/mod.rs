//! Storage layer for parley records.
//!
//! Notes, tasks and memory entries live in a single SQLite database at
//! `<data-dir>/assistant.db`. The data directory is `$PARLEY_DATA_DIR` when set,
//! otherwise `~/.local/share/parley/` (platform equivalent via `dirs`).
//!
//! A `Store` owns one connection for its whole lifetime. Every public operation
//! is a single statement, so each call either fully applies or leaves the
//! database unchanged.
//!
//! ## Search semantics
//!
//! `search_notes` is a substring match that ignores ASCII case (SQLite `LIKE`).
//! Non-ASCII letters compare case-sensitively. `%`, `_` and `\` in the query
//! are matched literally.

use crate::models::{MemoryEntry, Note, Task, TaskStatus};
use crate::{Error, Result};
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "PARLEY_DATA_DIR";

/// Database file name inside the data directory.
pub const DB_FILE: &str = "assistant.db";

/// Record store for a single user.
pub struct Store {
    /// Directory holding the database
    pub root: PathBuf,
    conn: Connection,
}

impl Store {
    /// Open (creating if needed) the store in the given data directory.
    pub fn open(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir)?;

        let conn = Connection::open(data_dir.join(DB_FILE))?;
        Self::init_schema(&conn)?;
        tracing::debug!(path = %data_dir.display(), "opened record store");

        Ok(Self {
            root: data_dir.to_path_buf(),
            conn,
        })
    }

    /// Open the store in the resolved default data directory.
    pub fn open_default() -> Result<Self> {
        Self::open(&get_data_dir()?)
    }

    /// Initialize the SQLite schema.
    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS notes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                created_at TEXT NOT NULL,
                content TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                created_at TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'open' CHECK (status IN ('open', 'done')),
                content TEXT NOT NULL
            );

            -- revision orders entries by last write; timestamps can tie
            CREATE TABLE IF NOT EXISTS memory (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                revision INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status);
            CREATE INDEX IF NOT EXISTS idx_memory_revision ON memory(revision);
            "#,
        )?;
        Ok(())
    }

    // === Note Operations ===

    /// Add a note, returning its id.
    pub fn add_note(&mut self, content: &str) -> Result<i64> {
        let content = require_text(content, "note content")?;
        self.conn.execute(
            "INSERT INTO notes (created_at, content) VALUES (?1, ?2)",
            params![Utc::now(), content],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(id, "added note");
        Ok(id)
    }

    /// Get a note by id.
    pub fn get_note(&self, id: i64) -> Result<Note> {
        self.conn
            .query_row(
                "SELECT id, created_at, content FROM notes WHERE id = ?1",
                [id],
                note_from_row,
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("Note not found: #{}", id)))
    }

    /// List notes, most recently created first.
    pub fn list_notes(&self, limit: usize) -> Result<Vec<Note>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, created_at, content FROM notes ORDER BY id DESC LIMIT ?1")?;
        let notes = stmt
            .query_map([sql_limit(limit)], note_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(notes)
    }

    /// Find notes containing `query`, most recently created first.
    pub fn search_notes(&self, query: &str, limit: usize) -> Result<Vec<Note>> {
        let pattern = format!("%{}%", escape_like(query));
        let mut stmt = self.conn.prepare(
            r"SELECT id, created_at, content FROM notes
              WHERE content LIKE ?1 ESCAPE '\'
              ORDER BY id DESC LIMIT ?2",
        )?;
        let notes = stmt
            .query_map(params![pattern, sql_limit(limit)], note_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(notes)
    }

    // === Task Operations ===

    /// Add an open task, returning its id.
    pub fn add_task(&mut self, content: &str) -> Result<i64> {
        let content = require_text(content, "task content")?;
        self.conn.execute(
            "INSERT INTO tasks (created_at, status, content) VALUES (?1, ?2, ?3)",
            params![Utc::now(), TaskStatus::Open.as_str(), content],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(id, "added task");
        Ok(id)
    }

    /// Get a task by id.
    pub fn get_task(&self, id: i64) -> Result<Task> {
        self.conn
            .query_row(
                "SELECT id, created_at, status, content FROM tasks WHERE id = ?1",
                [id],
                task_from_row,
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("Task not found: #{}", id)))
    }

    /// List tasks with the given status, most recently created first.
    pub fn list_tasks(&self, status: TaskStatus, limit: usize) -> Result<Vec<Task>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, created_at, status, content FROM tasks
             WHERE status = ?1 ORDER BY id DESC LIMIT ?2",
        )?;
        let tasks = stmt
            .query_map(params![status.as_str(), sql_limit(limit)], task_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    /// Mark a task done.
    ///
    /// Returns `true` if the task exists, including when it was already done,
    /// and `false` if there is no task with that id.
    pub fn close_task(&mut self, id: i64) -> Result<bool> {
        let changed = self
            .conn
            .execute("UPDATE tasks SET status = 'done' WHERE id = ?1", [id])?;
        tracing::debug!(id, found = changed > 0, "closed task");
        Ok(changed > 0)
    }

    // === Memory Operations ===

    /// Insert or overwrite the memory entry for `key`.
    pub fn set_memory(&mut self, key: &str, value: &str) -> Result<()> {
        let key = require_text(key, "memory key")?;
        self.conn.execute(
            "INSERT INTO memory (key, value, updated_at, revision)
             VALUES (?1, ?2, ?3, (SELECT COALESCE(MAX(revision), 0) + 1 FROM memory))
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at,
                revision = excluded.revision",
            params![key, value.trim(), Utc::now()],
        )?;
        tracing::debug!(key, "set memory");
        Ok(())
    }

    /// Get the memory entry for `key`, if any.
    pub fn get_memory(&self, key: &str) -> Result<Option<MemoryEntry>> {
        let entry = self
            .conn
            .query_row(
                "SELECT key, value, updated_at FROM memory WHERE key = ?1",
                [key.trim()],
                memory_from_row,
            )
            .optional()?;
        Ok(entry)
    }

    /// All memory entries, most recently updated first.
    pub fn all_memory(&self) -> Result<Vec<MemoryEntry>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value, updated_at FROM memory ORDER BY revision DESC")?;
        let entries = stmt
            .query_map([], memory_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }
}

fn note_from_row(row: &Row<'_>) -> rusqlite::Result<Note> {
    Ok(Note {
        id: row.get(0)?,
        created_at: row.get(1)?,
        content: row.get(2)?,
    })
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    let status: String = row.get(2)?;
    let status = TaskStatus::parse(&status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            Type::Text,
            format!("invalid task status: {}", status).into(),
        )
    })?;

    Ok(Task {
        id: row.get(0)?,
        created_at: row.get(1)?,
        status,
        content: row.get(3)?,
    })
}

fn memory_from_row(row: &Row<'_>) -> rusqlite::Result<MemoryEntry> {
    Ok(MemoryEntry {
        key: row.get(0)?,
        value: row.get(1)?,
        updated_at: row.get(2)?,
    })
}

/// Trim `value`, rejecting it if nothing is left.
fn require_text<'a>(value: &'a str, what: &str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation(format!("{} must not be empty", what)));
    }
    Ok(trimmed)
}

/// Escape LIKE wildcards so the query matches literally (with `ESCAPE '\'`).
fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

/// Get the data directory: `$PARLEY_DATA_DIR`, else `<platform data dir>/parley`.
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }

    let data_dir = dirs::data_dir()
        .ok_or_else(|| Error::Other("Could not determine data directory".to_string()))?;
    Ok(data_dir.join("parley"))
}
