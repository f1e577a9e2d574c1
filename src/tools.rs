//! Tools the model can invoke through a directive.
//!
//! Every tool runs against the [`Store`] and answers with text. Nothing in
//! here returns an error to the caller: unknown tools, missing arguments and
//! rejected input all come back as result text so the conversation can go on.

use crate::directive::ToolDirective;
use crate::models::{Note, Task, TaskStatus};
use crate::storage::Store;

/// Maximum entries listed by `list_open_tasks`.
pub const OPEN_TASKS_CAP: usize = 20;

/// Maximum entries listed by `search_notes`.
pub const SEARCH_NOTES_CAP: usize = 10;

/// Tool definition used to describe the tool to the model.
pub struct ToolDef {
    pub name: &'static str,
    pub description: &'static str,
    /// Required argument names, all strings
    pub args: &'static [&'static str],
}

/// The fixed set of tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    AddNote,
    AddTask,
    ListOpenTasks,
    SearchNotes,
    SetMemory,
}

impl Tool {
    pub const ALL: [Tool; 5] = [
        Tool::AddNote,
        Tool::AddTask,
        Tool::ListOpenTasks,
        Tool::SearchNotes,
        Tool::SetMemory,
    ];

    /// Look up a tool by its wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.def().name == name)
    }

    pub fn def(self) -> ToolDef {
        match self {
            Tool::AddNote => ToolDef {
                name: "add_note",
                description: "Save a note",
                args: &["text"],
            },
            Tool::AddTask => ToolDef {
                name: "add_task",
                description: "Add an open task",
                args: &["text"],
            },
            Tool::ListOpenTasks => ToolDef {
                name: "list_open_tasks",
                description: "List open tasks",
                args: &[],
            },
            Tool::SearchNotes => ToolDef {
                name: "search_notes",
                description: "Find notes containing the query (case-insensitive)",
                args: &["query"],
            },
            Tool::SetMemory => ToolDef {
                name: "set_memory",
                description: "Remember a fact about the user under a key",
                args: &["key", "value"],
            },
        }
    }
}

/// Get all available tool definitions.
pub fn get_tools() -> Vec<ToolDef> {
    Tool::ALL.into_iter().map(Tool::def).collect()
}

/// The system instruction sent ahead of the transcript on every request.
pub fn system_instruction() -> String {
    let mut text = String::from(
        "You are a helpful personal assistant running in a terminal. \
         You can save notes, manage tasks and remember facts about the user with local tools.\n\n\
         To use a tool, reply with exactly one JSON object and nothing else:\n\
         {\"tool\": \"<name>\", \"args\": {\"<arg>\": \"<string value>\"}}\n\n\
         Available tools:\n",
    );

    for def in get_tools() {
        let args = def
            .args
            .iter()
            .map(|arg| format!("\"{}\": string", arg))
            .collect::<Vec<_>>()
            .join(", ");
        text.push_str(&format!("- {} {{{}}}: {}\n", def.name, args, def.description));
    }

    text.push_str(
        "\nCall at most one tool per reply. \
         When no tool is needed, reply in plain text without any JSON.",
    );
    text
}

/// Run a directive against the store and return the result text.
pub fn dispatch(store: &mut Store, directive: &ToolDirective) -> String {
    let Some(tool) = Tool::from_name(&directive.tool) else {
        tracing::warn!(tool = %directive.tool, "unknown tool requested");
        return format!("Unknown tool: {}", directive.tool);
    };

    let def = tool.def();
    if let Some(missing) = def.args.iter().find(|arg| directive.arg(arg).is_none()) {
        return format!("Error: {} requires argument '{}'", def.name, missing);
    }
    let arg = |name: &str| directive.arg(name).unwrap_or_default();

    tracing::info!(tool = def.name, "dispatching tool");
    let result = match tool {
        Tool::AddNote => store
            .add_note(arg("text"))
            .map(|id| format!("Saved note #{}.", id)),
        Tool::AddTask => store
            .add_task(arg("text"))
            .map(|id| format!("Added task #{}.", id)),
        Tool::ListOpenTasks => store
            .list_tasks(TaskStatus::Open, OPEN_TASKS_CAP)
            .map(|tasks| {
                if tasks.is_empty() {
                    "No open tasks.".to_string()
                } else {
                    format_tasks(&tasks)
                }
            }),
        Tool::SearchNotes => {
            let query = arg("query");
            store.search_notes(query, SEARCH_NOTES_CAP).map(|notes| {
                if notes.is_empty() {
                    format!("No notes matching \"{}\".", query)
                } else {
                    format_notes(&notes)
                }
            })
        }
        Tool::SetMemory => {
            let (key, value) = (arg("key").trim(), arg("value").trim());
            store
                .set_memory(key, value)
                .map(|()| format!("Remembered {} = {}.", key, value))
        }
    };

    result.unwrap_or_else(|e| {
        tracing::warn!(tool = def.name, error = %e, "tool failed");
        format!("Error: {}", e)
    })
}

/// `#id: content` lines.
pub fn format_notes(notes: &[Note]) -> String {
    notes
        .iter()
        .map(|n| format!("#{}: {}", n.id, n.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `#id: content` lines.
pub fn format_tasks(tasks: &[Task]) -> String {
    tasks
        .iter()
        .map(|t| format!("#{}: {}", t.id, t.content))
        .collect::<Vec<_>>()
        .join("\n")
}
