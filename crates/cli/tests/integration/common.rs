//! Shared test helpers for CLI integration tests.

use std::path::PathBuf;

use assert_cmd::Command;
use tempfile::TempDir;

/// Isolated test environment.
///
/// Each test gets its own temporary working directory.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  pub fn new() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
    }
  }

  /// The working directory handed to the binary via `--dir`.
  pub fn workdir(&self) -> PathBuf {
    self.temp.path().to_path_buf()
  }

  /// Path of the state file inside the working directory.
  pub fn state_file(&self) -> PathBuf {
    self.workdir().join(".openshift_install_state.json")
  }

  /// Get a pre-configured Command for the kiln binary.
  pub fn kiln_cmd(&self) -> Command {
    let mut cmd = Command::cargo_bin("kiln").unwrap();
    cmd.arg("--dir").arg(self.workdir());
    cmd
  }
}
