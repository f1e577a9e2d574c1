//! Precedence resolution for configuration and state.
//!
//! ## API key precedence (highest to lowest)
//!
//! 1. `OPENAI_API_KEY` environment variable
//! 2. state.kdl in the data directory
//!
//! ## Model precedence (highest to lowest)
//!
//! 1. `--model` flag (or `PARLEY_MODEL`, handled by clap)
//! 2. config.kdl
//! 3. Built-in default (`gpt-4o-mini`)
//!
//! Everything else: config.kdl, then built-in defaults.

use crate::config::schema::{ParleyConfig, ParleyState, mask_secret};
use crate::llm::DEFAULT_API_BASE;
use crate::orchestrator::{DEFAULT_HISTORY_WINDOW, DEFAULT_TIMEOUT, TurnSettings};
use crate::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Model used when nothing else is configured.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from environment variable
    EnvVar(String),
    /// Value from CLI flag
    CliFlag,
    /// Value from config.kdl
    Config,
    /// Value from state.kdl
    State,
    /// Built-in default value
    Default,
}

impl fmt::Display for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::Config => write!(f, "config"),
            ValueSource::State => write!(f, "state"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

impl Serialize for ValueSource {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone, Serialize)]
pub struct Resolved<T> {
    pub value: T,
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// CLI overrides for configuration resolution.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Model override from `--model` / `PARLEY_MODEL`
    pub model: Option<String>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Fully resolved settings with source tracking.
#[derive(Debug, Clone)]
pub struct ResolvedSettings {
    pub model: Resolved<String>,
    pub timeout_secs: Resolved<u64>,
    pub history_window: Resolved<usize>,
    pub api_base: Resolved<String>,
    pub api_key: Option<Resolved<String>>,
}

impl ResolvedSettings {
    /// The API key, or a configuration error if none is available.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_ref()
            .map(|r| r.value.as_str())
            .ok_or_else(|| {
                Error::Configuration(format!(
                    "no API key found. Set {} or run `parley config set-key <KEY>`",
                    API_KEY_ENV
                ))
            })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Whether the key has the `sk-` prefix OpenAI keys carry.
    pub fn api_key_looks_valid(&self) -> bool {
        self.api_key
            .as_ref()
            .is_some_and(|r| r.value.starts_with("sk-"))
    }

    pub fn masked_api_key(&self) -> Option<String> {
        self.api_key.as_ref().map(|r| mask_secret(&r.value))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.value)
    }

    /// Settings for the turn orchestrator.
    pub fn turn_settings(&self) -> TurnSettings {
        TurnSettings {
            model: self.model.value.clone(),
            history_window: self.history_window.value,
            timeout: self.timeout(),
        }
    }
}

/// Resolve settings, reading the API key from the environment.
pub fn resolve(
    config: &ParleyConfig,
    state: &ParleyState,
    overrides: &ConfigOverrides,
) -> ResolvedSettings {
    let env_key = std::env::var(API_KEY_ENV).ok();
    resolve_with_env_key(config, state, overrides, env_key)
}

/// Resolve settings with an explicit value for the key environment variable.
pub fn resolve_with_env_key(
    config: &ParleyConfig,
    state: &ParleyState,
    overrides: &ConfigOverrides,
    env_key: Option<String>,
) -> ResolvedSettings {
    let model = if let Some(model) = overrides.model.as_ref().filter(|m| !m.trim().is_empty()) {
        Resolved::new(model.trim().to_string(), ValueSource::CliFlag)
    } else if let Some(ref model) = config.model {
        Resolved::new(model.clone(), ValueSource::Config)
    } else {
        Resolved::new(DEFAULT_MODEL.to_string(), ValueSource::Default)
    };

    let timeout_secs = match config.timeout_secs {
        Some(secs) => Resolved::new(secs, ValueSource::Config),
        None => Resolved::new(DEFAULT_TIMEOUT.as_secs(), ValueSource::Default),
    };

    let history_window = match config.history_window {
        Some(window) => Resolved::new(window, ValueSource::Config),
        None => Resolved::new(DEFAULT_HISTORY_WINDOW, ValueSource::Default),
    };

    let api_base = match config.api_base {
        Some(ref base) => Resolved::new(base.clone(), ValueSource::Config),
        None => Resolved::new(DEFAULT_API_BASE.to_string(), ValueSource::Default),
    };

    let api_key = match env_key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty()) {
        Some(key) => Some(Resolved::new(
            key,
            ValueSource::EnvVar(API_KEY_ENV.to_string()),
        )),
        None => state
            .api_key
            .as_ref()
            .map(|key| Resolved::new(key.clone(), ValueSource::State)),
    };

    ResolvedSettings {
        model,
        timeout_secs,
        history_window,
        api_base,
        api_key,
    }
}
