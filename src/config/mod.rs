//! Configuration and state management for parley.
//!
//! ## config.kdl - User preferences
//!
//! Located at `$PARLEY_CONFIG_DIR/config.kdl`, else `~/.config/parley/config.kdl`.
//!
//! Contains:
//! - `model` - Completion model identifier
//! - `timeout-secs` - Completion request timeout
//! - `history-window` - Transcript turns sent per request
//! - `api-base` - OpenAI-compatible API base URL
//!
//! ## state.kdl - Secrets
//!
//! Located in the data directory next to the database (see
//! [`crate::storage::get_data_dir`]). Holds `api-key`.
//!
//! **CRITICAL**: `state.kdl` MUST be created with 0600 permissions because it
//! contains the API key.
//!
//! Use the [`resolver`] module for precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{
    API_KEY_ENV, ConfigOverrides, DEFAULT_MODEL, Resolved, ResolvedSettings, ValueSource,
    resolve, resolve_with_env_key,
};
pub use schema::{CONFIG_KEYS, ParleyConfig, ParleyState, mask_secret};
#[cfg(unix)]
pub use schema::{CONFIG_FILE_MODE, STATE_FILE_MODE};

use crate::storage::get_data_dir;
use crate::{Error, Result};
use kdl::KdlDocument;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the config directory.
pub const CONFIG_DIR_ENV: &str = "PARLEY_CONFIG_DIR";

pub const CONFIG_FILE: &str = "config.kdl";
pub const STATE_FILE: &str = "state.kdl";

/// Get the config directory: `$PARLEY_CONFIG_DIR`, else `<platform config dir>/parley`.
pub fn get_config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| Error::Other("Could not determine config directory".to_string()))?;
    Ok(config_dir.join("parley"))
}

/// Read config.kdl from `dir`. A missing file is an empty config.
pub fn read_config(dir: &Path) -> Result<ParleyConfig> {
    let path = dir.join(CONFIG_FILE);
    let config = ParleyConfig::from_kdl(&read_kdl(&path)?);
    config
        .validate()
        .map_err(|e| Error::Configuration(format!("{}: {}", path.display(), e)))?;
    Ok(config)
}

/// Write config.kdl into `dir`.
pub fn write_config(dir: &Path, config: &ParleyConfig) -> Result<PathBuf> {
    let path = dir.join(CONFIG_FILE);
    write_kdl(&path, &config.to_kdl(), false)?;
    Ok(path)
}

/// Read state.kdl from `dir`. A missing file is an empty state.
pub fn read_state(dir: &Path) -> Result<ParleyState> {
    Ok(ParleyState::from_kdl(&read_kdl(&dir.join(STATE_FILE))?))
}

/// Write state.kdl into `dir` with owner-only permissions.
pub fn write_state(dir: &Path, state: &ParleyState) -> Result<PathBuf> {
    let path = dir.join(STATE_FILE);
    write_kdl(&path, &state.to_kdl(), true)?;
    Ok(path)
}

/// Load and resolve settings from the default locations.
pub fn load(overrides: &ConfigOverrides) -> Result<ResolvedSettings> {
    load_from(&get_config_dir()?, &get_data_dir()?, overrides)
}

/// Load and resolve settings from explicit directories.
pub fn load_from(
    config_dir: &Path,
    data_dir: &Path,
    overrides: &ConfigOverrides,
) -> Result<ResolvedSettings> {
    let config = read_config(config_dir)?;
    let state = read_state(data_dir)?;
    Ok(resolve(&config, &state, overrides))
}

fn read_kdl(path: &Path) -> Result<KdlDocument> {
    if !path.exists() {
        return Ok(KdlDocument::new());
    }
    let text = fs::read_to_string(path)?;
    text.parse::<KdlDocument>()
        .map_err(|e| Error::Configuration(format!("{}: {}", path.display(), e)))
}

fn write_kdl(path: &Path, doc: &KdlDocument, secret: bool) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

        let mode = if secret { STATE_FILE_MODE } else { CONFIG_FILE_MODE };
        // Narrow an existing file before writing; `mode` only applies on create.
        if path.exists() {
            fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
        }
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(mode)
            .open(path)?;
        file.write_all(doc.to_string().as_bytes())?;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    }
    #[cfg(not(unix))]
    {
        let _ = secret;
        fs::write(path, doc.to_string())?;
    }

    Ok(())
}
