//! Classification of model responses.
//!
//! The model is instructed to answer in prose, or with exactly one JSON object
//! of the form `{"tool": "<name>", "args": {"<arg>": "<value>", ...}}` when it
//! wants a tool to run. [`parse`] decides which of the two it got:
//!
//! - text bounded by `{` and `}` after trimming is a directive attempt, and is
//!   either a [`ToolDirective`] or a [`DirectiveParseError`]
//! - anything else is plain text
//!
//! Prose that happens to start with `{` and end with `}` is treated as a
//! directive attempt. That is a limitation of the protocol and is left as is.

use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// A request to run one tool, parsed from a model response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDirective {
    pub tool: String,
    pub args: BTreeMap<String, String>,
}

impl ToolDirective {
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            args: BTreeMap::new(),
        }
    }

    pub fn with_arg(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.insert(name.into(), value.into());
        self
    }

    /// Look up an argument by name.
    pub fn arg(&self, name: &str) -> Option<&str> {
        self.args.get(name).map(String::as_str)
    }
}

/// A directive attempt that could not be understood.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectiveParseError {
    /// Not valid JSON, or not an object
    #[error("Error: could not parse tool call: {0}")]
    InvalidJson(String),

    /// Valid JSON whose fields have the wrong shape
    #[error("Error: malformed tool call: {0}")]
    InvalidShape(String),
}

/// Result of classifying one model response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedResponse {
    /// Prose to show as-is (trimmed)
    PlainText(String),
    /// A well-formed tool invocation
    Directive(ToolDirective),
    /// A directive attempt that failed to parse
    Malformed(DirectiveParseError),
}

#[derive(Deserialize)]
struct RawDirective {
    tool: String,
    #[serde(default)]
    args: Option<BTreeMap<String, String>>,
}

/// Classify a raw model response.
pub fn parse(raw: &str) -> ParsedResponse {
    let text = raw.trim();
    if !(text.starts_with('{') && text.ends_with('}')) {
        return ParsedResponse::PlainText(text.to_string());
    }

    let value: serde_json::Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => return ParsedResponse::Malformed(DirectiveParseError::InvalidJson(e.to_string())),
    };

    match serde_json::from_value::<RawDirective>(value) {
        Ok(raw) => ParsedResponse::Directive(ToolDirective {
            tool: raw.tool,
            args: raw.args.unwrap_or_default(),
        }),
        Err(e) => ParsedResponse::Malformed(DirectiveParseError::InvalidShape(e.to_string())),
    }
}
