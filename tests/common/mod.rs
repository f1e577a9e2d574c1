//! Common test utilities for parley integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't touch the
//! user's real data or config directories.

#![allow(dead_code)]

use assert_cmd::Command;
pub use tempfile::TempDir;

/// A test environment with isolated storage.
///
/// The `parley()` method returns a `Command` that sets `PARLEY_DATA_DIR` and
/// `PARLEY_CONFIG_DIR` per invocation and clears any API key or model from
/// the outer environment, making tests parallel-safe.
pub struct TestEnv {
    pub data_dir: TempDir,
    pub config_dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            data_dir: TempDir::new().unwrap(),
            config_dir: TempDir::new().unwrap(),
        }
    }

    /// Get a Command for the parley binary with isolated directories.
    pub fn parley(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_parley"));
        cmd.env("PARLEY_DATA_DIR", self.data_dir.path());
        cmd.env("PARLEY_CONFIG_DIR", self.config_dir.path());
        cmd.env_remove("OPENAI_API_KEY");
        cmd.env_remove("PARLEY_MODEL");
        cmd.env_remove("RUST_LOG");
        cmd
    }

    /// A command with an API key set and the API pointed at a closed local
    /// port, so completion calls fail fast with a transport error.
    pub fn parley_offline(&self) -> Command {
        self.parley()
            .args(["config", "set", "api-base", "http://127.0.0.1:1/v1"])
            .assert()
            .success();
        let mut cmd = self.parley();
        cmd.env("OPENAI_API_KEY", "sk-test-key");
        cmd
    }

    pub fn data_path(&self) -> &std::path::Path {
        self.data_dir.path()
    }

    pub fn config_path(&self) -> &std::path::Path {
        self.config_dir.path()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
