//! Command implementations for the parley CLI.
//!
//! Each command returns a result type implementing [`Output`], printed as JSON
//! by default or as human-readable text with `-H`.
//!
//! - `chat` - Interactive conversation loop
//! - `ask` / `tool` - Single turn, or a directive run without the model
//! - `note` / `task` / `memory` - Direct record access, bypassing the model
//! - `config` - Settings and API key

pub mod chat;

use crate::config::{
    self, ConfigOverrides, ParleyConfig, ParleyState, Resolved, ResolvedSettings, mask_secret,
};
use crate::directive::{self, ParsedResponse};
use crate::llm::CompletionClient;
use crate::models::{MemoryEntry, Note, Task, TaskStatus};
use crate::orchestrator::{OutcomeKind, Orchestrator, TurnOutcome};
use crate::session::Session;
use crate::storage::Store;
use crate::tools;
use crate::{Error, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

fn to_json_string<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }).to_string())
}

// === Conversation ===

impl Output for TurnOutcome {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        self.text.clone()
    }
}

/// Send one message in a fresh session.
pub fn ask<C: CompletionClient>(orchestrator: &mut Orchestrator<C>, message: &str) -> Result<TurnOutcome> {
    if message.trim().is_empty() {
        return Err(Error::InvalidInput("message must not be empty".to_string()));
    }
    let mut session = Session::new();
    Ok(orchestrator.run_turn(&mut session, message))
}

/// Run directive text through the parser and registry without the model.
pub fn tool_run(store: &mut Store, text: &str) -> TurnOutcome {
    match directive::parse(text) {
        ParsedResponse::Directive(d) => TurnOutcome {
            kind: OutcomeKind::Tool,
            text: tools::dispatch(store, &d),
            tool: Some(d.tool),
        },
        ParsedResponse::Malformed(e) => TurnOutcome {
            kind: OutcomeKind::DirectiveError,
            tool: None,
            text: e.to_string(),
        },
        ParsedResponse::PlainText(text) => TurnOutcome {
            kind: OutcomeKind::Reply,
            tool: None,
            text,
        },
    }
}

// === Notes ===

#[derive(Serialize)]
pub struct NoteAdded {
    pub id: i64,
    pub content: String,
}

impl Output for NoteAdded {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        format!("Saved note #{}: {}", self.id, self.content)
    }
}

#[derive(Serialize)]
pub struct NoteList {
    pub notes: Vec<Note>,
    pub count: usize,
}

impl Output for NoteList {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        if self.notes.is_empty() {
            return "No notes.".to_string();
        }
        self.notes
            .iter()
            .map(|n| {
                format!(
                    "#{} [{}] {}",
                    n.id,
                    n.created_at.format("%Y-%m-%d %H:%M"),
                    n.content
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub fn note_add(store: &mut Store, text: &str) -> Result<NoteAdded> {
    let id = store.add_note(text)?;
    let note = store.get_note(id)?;
    Ok(NoteAdded {
        id,
        content: note.content,
    })
}

pub fn note_list(store: &Store, limit: usize) -> Result<NoteList> {
    let notes = store.list_notes(limit)?;
    Ok(NoteList {
        count: notes.len(),
        notes,
    })
}

pub fn note_search(store: &Store, query: &str, limit: usize) -> Result<NoteList> {
    let notes = store.search_notes(query, limit)?;
    Ok(NoteList {
        count: notes.len(),
        notes,
    })
}

// === Tasks ===

#[derive(Serialize)]
pub struct TaskAdded {
    pub id: i64,
    pub content: String,
}

impl Output for TaskAdded {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        format!("Added task #{}: {}", self.id, self.content)
    }
}

#[derive(Serialize)]
pub struct TaskList {
    pub status: TaskStatus,
    pub tasks: Vec<Task>,
    pub count: usize,
}

impl Output for TaskList {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        if self.tasks.is_empty() {
            return format!("No {} tasks.", self.status);
        }
        self.tasks
            .iter()
            .map(|t| format!("#{} [{}] {}", t.id, t.status, t.content))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Serialize)]
pub struct TaskClosed {
    pub id: i64,
    pub status: TaskStatus,
}

impl Output for TaskClosed {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        format!("Closed task #{}", self.id)
    }
}

pub fn task_add(store: &mut Store, text: &str) -> Result<TaskAdded> {
    let id = store.add_task(text)?;
    let task = store.get_task(id)?;
    Ok(TaskAdded {
        id,
        content: task.content,
    })
}

pub fn task_list(store: &Store, status: &str, limit: usize) -> Result<TaskList> {
    let status = TaskStatus::parse(status).ok_or_else(|| {
        Error::InvalidInput(format!("Invalid status: {} (expected open or done)", status))
    })?;
    let tasks = store.list_tasks(status, limit)?;
    Ok(TaskList {
        status,
        count: tasks.len(),
        tasks,
    })
}

pub fn task_close(store: &mut Store, id: i64) -> Result<TaskClosed> {
    if !store.close_task(id)? {
        return Err(Error::NotFound(format!("Task not found: #{}", id)));
    }
    Ok(TaskClosed {
        id,
        status: TaskStatus::Done,
    })
}

// === Memory ===

#[derive(Serialize)]
pub struct MemoryShow {
    #[serde(flatten)]
    pub entry: MemoryEntry,
}

impl Output for MemoryShow {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        format!("{} = {}", self.entry.key, self.entry.value)
    }
}

#[derive(Serialize)]
pub struct MemoryList {
    pub entries: Vec<MemoryEntry>,
    pub count: usize,
}

impl Output for MemoryList {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        if self.entries.is_empty() {
            return "No memory entries.".to_string();
        }
        self.entries
            .iter()
            .map(|e| format!("{} = {}", e.key, e.value))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub fn memory_set(store: &mut Store, key: &str, value: &str) -> Result<MemoryShow> {
    store.set_memory(key, value)?;
    memory_get(store, key)
}

pub fn memory_get(store: &Store, key: &str) -> Result<MemoryShow> {
    store
        .get_memory(key)?
        .map(|entry| MemoryShow { entry })
        .ok_or_else(|| Error::NotFound(format!("No memory entry for key: {}", key.trim())))
}

pub fn memory_list(store: &Store) -> Result<MemoryList> {
    let entries = store.all_memory()?;
    Ok(MemoryList {
        count: entries.len(),
        entries,
    })
}

// === Config ===

#[derive(Serialize)]
pub struct BuildInfo {
    pub version: &'static str,
    pub commit: &'static str,
    pub built_at: &'static str,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            commit: env!("PARLEY_GIT_COMMIT"),
            built_at: env!("PARLEY_BUILD_TIMESTAMP"),
        }
    }
}

#[derive(Serialize)]
pub struct ConfigShow {
    pub model: Resolved<String>,
    pub timeout_secs: Resolved<u64>,
    pub history_window: Resolved<usize>,
    pub api_base: Resolved<String>,
    pub api_key_loaded: bool,
    pub api_key_looks_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_source: Option<String>,
    pub config_file: PathBuf,
    pub data_dir: PathBuf,
    pub build: BuildInfo,
}

impl Output for ConfigShow {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        let key = match (&self.api_key, &self.api_key_source) {
            (Some(masked), Some(source)) => format!("{} ({})", masked, source),
            _ => "not set".to_string(),
        };
        let mut lines = vec![
            format!("model:          {} ({})", self.model.value, self.model.source),
            format!(
                "timeout-secs:   {} ({})",
                self.timeout_secs.value, self.timeout_secs.source
            ),
            format!(
                "history-window: {} ({})",
                self.history_window.value, self.history_window.source
            ),
            format!("api-base:       {} ({})", self.api_base.value, self.api_base.source),
            format!("api-key:        {}", key),
        ];
        if self.api_key_loaded && !self.api_key_looks_valid {
            lines.push("warning:        API key does not start with \"sk-\"".to_string());
        }
        lines.push(format!("config file:    {}", self.config_file.display()));
        lines.push(format!("data dir:       {}", self.data_dir.display()));
        lines.push(format!(
            "build:          {} ({}, {})",
            self.build.version, self.build.commit, self.build.built_at
        ));
        lines.join("\n")
    }
}

pub fn config_show(
    config_dir: &Path,
    data_dir: &Path,
    overrides: &ConfigOverrides,
) -> Result<ConfigShow> {
    let settings: ResolvedSettings = config::load_from(config_dir, data_dir, overrides)?;
    Ok(ConfigShow {
        api_key_loaded: settings.has_api_key(),
        api_key_looks_valid: settings.api_key_looks_valid(),
        api_key: settings.masked_api_key(),
        api_key_source: settings.api_key.as_ref().map(|k| k.source.to_string()),
        model: settings.model,
        timeout_secs: settings.timeout_secs,
        history_window: settings.history_window,
        api_base: settings.api_base,
        config_file: config_dir.join(config::CONFIG_FILE),
        data_dir: data_dir.to_path_buf(),
        build: BuildInfo::current(),
    })
}

#[derive(Serialize)]
pub struct ConfigSet {
    pub key: String,
    pub value: String,
    pub path: PathBuf,
}

impl Output for ConfigSet {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        format!("Set {} = {} in {}", self.key, self.value, self.path.display())
    }
}

pub fn config_set(config_dir: &Path, key: &str, value: &str) -> Result<ConfigSet> {
    let mut config: ParleyConfig = config::read_config(config_dir)?;
    config.set(key, value).map_err(Error::InvalidInput)?;
    let path = config::write_config(config_dir, &config)?;
    Ok(ConfigSet {
        key: key.to_string(),
        value: value.trim().to_string(),
        path,
    })
}

#[derive(Serialize)]
pub struct KeyStored {
    pub api_key: String,
    pub path: PathBuf,
}

impl Output for KeyStored {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        format!("Stored API key {} in {}", self.api_key, self.path.display())
    }
}

pub fn config_set_key(data_dir: &Path, key: &str) -> Result<KeyStored> {
    let key = key.trim();
    if key.is_empty() {
        return Err(Error::InvalidInput("API key must not be empty".to_string()));
    }
    let mut state: ParleyState = config::read_state(data_dir)?;
    state.api_key = Some(key.to_string());
    let path = config::write_state(data_dir, &state)?;
    Ok(KeyStored {
        api_key: mask_secret(key),
        path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestEnv;

    #[test]
    fn test_note_add_and_list_output() {
        let env = TestEnv::new();
        let mut store = env.open_store();

        let added = note_add(&mut store, "  buy milk ").unwrap();
        assert_eq!(added.content, "buy milk");
        assert!(added.to_json().contains("\"content\":\"buy milk\""));

        let list = note_list(&store, 10).unwrap();
        assert_eq!(list.count, 1);
        assert!(list.to_human().contains("buy milk"));
    }

    #[test]
    fn test_task_list_rejects_unknown_status() {
        let env = TestEnv::new();
        let store = env.open_store();
        assert!(matches!(
            task_list(&store, "pending", 10),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_task_close_missing_is_not_found() {
        let env = TestEnv::new();
        let mut store = env.open_store();
        assert!(matches!(task_close(&mut store, 7), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_task_list_human_empty() {
        let env = TestEnv::new();
        let store = env.open_store();
        assert_eq!(task_list(&store, "done", 10).unwrap().to_human(), "No done tasks.");
    }

    #[test]
    fn test_memory_show_json_is_flat() {
        let env = TestEnv::new();
        let mut store = env.open_store();
        let shown = memory_set(&mut store, "city", "Paris").unwrap();
        let json: serde_json::Value = serde_json::from_str(&shown.to_json()).unwrap();
        assert_eq!(json["key"], "city");
        assert_eq!(json["value"], "Paris");
    }

    #[test]
    fn test_tool_run_classifies_input() {
        let env = TestEnv::new();
        let mut store = env.open_store();

        let plain = tool_run(&mut store, "Hello there");
        assert_eq!(plain.kind, OutcomeKind::Reply);
        assert_eq!(plain.text, "Hello there");

        let bad = tool_run(&mut store, "{oops}");
        assert_eq!(bad.kind, OutcomeKind::DirectiveError);

        let ran = tool_run(&mut store, r#"{"tool":"add_task","args":{"text":"x"}}"#);
        assert_eq!(ran.kind, OutcomeKind::Tool);
        assert_eq!(ran.tool.as_deref(), Some("add_task"));
    }

    #[test]
    fn test_config_set_persists() {
        let env = TestEnv::new();
        config_set(env.config_path(), "model", "gpt-4o").unwrap();
        let config = config::read_config(env.config_path()).unwrap();
        assert_eq!(config.model.as_deref(), Some("gpt-4o"));
    }

    #[test]
    fn test_config_set_rejects_invalid_value() {
        let env = TestEnv::new();
        assert!(matches!(
            config_set(env.config_path(), "timeout-secs", "0"),
            Err(Error::InvalidInput(_))
        ));
        assert!(!env.config_path().join(config::CONFIG_FILE).exists());
    }

    #[test]
    fn test_config_set_key_masks_output() {
        let env = TestEnv::new();
        let stored = config_set_key(env.data_path(), "sk-1234567890abcdef").unwrap();
        assert_eq!(stored.api_key, "sk-1...cdef");
        assert!(!stored.to_json().contains("1234567890"));
    }
}
