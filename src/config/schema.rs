//! KDL schema definitions for config.kdl and state.kdl.

use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};

/// Upper bound for `timeout-secs`.
pub const MAX_TIMEOUT_SECS: u64 = 600;

/// Upper bound for `history-window`.
pub const MAX_HISTORY_WINDOW: usize = 200;

/// Keys accepted by `parley config set`.
pub const CONFIG_KEYS: [&str; 4] = ["model", "timeout-secs", "history-window", "api-base"];

/// User preferences stored in config.kdl.
///
/// File permissions: 0644 (rw-r--r--)
///
/// # KDL Schema
///
/// ```kdl
/// model "gpt-4o-mini"
/// timeout-secs 30
/// history-window 20
/// api-base "https://api.openai.com/v1"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParleyConfig {
    /// Completion model identifier
    pub model: Option<String>,

    /// Completion request timeout in seconds
    pub timeout_secs: Option<u64>,

    /// Number of recent transcript turns sent with each request
    pub history_window: Option<usize>,

    /// Base URL of the OpenAI-compatible API
    pub api_base: Option<String>,
}

impl ParleyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the config values.
    ///
    /// Returns an error message if any value is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(ref model) = self.model {
            if model.trim().is_empty() {
                return Err("model must not be empty".to_string());
            }
        }
        if let Some(secs) = self.timeout_secs {
            if secs == 0 || secs > MAX_TIMEOUT_SECS {
                return Err(format!(
                    "timeout-secs must be 1-{}, got {}",
                    MAX_TIMEOUT_SECS, secs
                ));
            }
        }
        if let Some(window) = self.history_window {
            if window == 0 || window > MAX_HISTORY_WINDOW {
                return Err(format!(
                    "history-window must be 1-{}, got {}",
                    MAX_HISTORY_WINDOW, window
                ));
            }
        }
        if let Some(ref base) = self.api_base {
            if !(base.starts_with("http://") || base.starts_with("https://")) {
                return Err(format!("api-base must be an http(s) URL, got {}", base));
            }
        }
        Ok(())
    }

    /// Set one value from its textual form, as given on the command line.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        let value = value.trim();
        match key {
            "model" => self.model = Some(value.to_string()),
            "timeout-secs" => {
                let secs = value
                    .parse()
                    .map_err(|_| format!("timeout-secs must be an integer, got {}", value))?;
                self.timeout_secs = Some(secs);
            }
            "history-window" => {
                let window = value
                    .parse()
                    .map_err(|_| format!("history-window must be an integer, got {}", value))?;
                self.history_window = Some(window);
            }
            "api-base" => self.api_base = Some(value.to_string()),
            _ => {
                return Err(format!(
                    "unknown config key '{}' (expected one of: {})",
                    key,
                    CONFIG_KEYS.join(", ")
                ));
            }
        }
        self.validate()
    }

    /// Parse config from a KDL document.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        let mut config = Self::new();

        config.model = first_string(doc, "model");
        config.api_base = first_string(doc, "api-base");

        if let Some(i) = first_integer(doc, "timeout-secs") {
            config.timeout_secs = u64::try_from(i).ok();
        }
        if let Some(i) = first_integer(doc, "history-window") {
            config.history_window = usize::try_from(i).ok();
        }

        config
    }

    /// Convert config to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        if let Some(ref model) = self.model {
            push_node(&mut doc, "model", KdlValue::String(model.clone()));
        }
        if let Some(secs) = self.timeout_secs {
            push_node(&mut doc, "timeout-secs", KdlValue::Integer(secs as i128));
        }
        if let Some(window) = self.history_window {
            push_node(&mut doc, "history-window", KdlValue::Integer(window as i128));
        }
        if let Some(ref base) = self.api_base {
            push_node(&mut doc, "api-base", KdlValue::String(base.clone()));
        }

        doc
    }
}

/// Secrets stored in state.kdl.
///
/// **MUST be created with 0600 permissions (owner read/write only)**.
///
/// # KDL Schema
///
/// ```kdl
/// api-key "sk-xxxxxxxxxxxxxxxxxxxx"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParleyState {
    /// Completion API key (sensitive!)
    pub api_key: Option<String>,
}

impl ParleyState {
    /// Parse state from a KDL document.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        Self {
            api_key: first_string(doc, "api-key").filter(|k| !k.trim().is_empty()),
        }
    }

    /// Convert state to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();
        if let Some(ref key) = self.api_key {
            push_node(&mut doc, "api-key", KdlValue::String(key.clone()));
        }
        doc
    }
}

/// Mask a secret for display, keeping the first and last 4 characters.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 12 {
        let head: String = chars.iter().take(4).collect();
        format!("{}...", head)
    } else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    }
}

/// Required permissions for state.kdl (Unix: 0600, owner read/write only).
#[cfg(unix)]
pub const STATE_FILE_MODE: u32 = 0o600;

/// Required permissions for config.kdl (Unix: 0644, readable by all).
#[cfg(unix)]
pub const CONFIG_FILE_MODE: u32 = 0o644;

fn first_string(doc: &KdlDocument, name: &str) -> Option<String> {
    doc.get(name)?
        .entries()
        .first()?
        .value()
        .as_string()
        .map(str::to_string)
}

fn first_integer(doc: &KdlDocument, name: &str) -> Option<i128> {
    doc.get(name)?.entries().first()?.value().as_integer()
}

fn push_node(doc: &mut KdlDocument, name: &str, value: KdlValue) {
    let mut node = KdlNode::new(name);
    node.push(KdlEntry::new(value));
    doc.nodes_mut().push(node);
}
