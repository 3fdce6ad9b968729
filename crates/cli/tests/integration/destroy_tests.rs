//! Destroy command integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn destroy_removes_files_and_state_entry() {
  let env = TestEnv::new();

  env.kiln_cmd().arg("create").arg("install-config").assert().success();
  assert!(env.workdir().join("install-config.yaml").exists());

  env
    .kiln_cmd()
    .arg("destroy")
    .arg("install-config")
    .assert()
    .success()
    .stdout(predicate::str::contains("Destroyed install-config"));

  assert!(!env.workdir().join("install-config.yaml").exists());
  let state = std::fs::read_to_string(env.state_file()).unwrap();
  assert!(!state.contains("\"install-config\""));
}

#[test]
fn destroy_with_no_state_succeeds() {
  let env = TestEnv::new();

  env
    .kiln_cmd()
    .arg("destroy")
    .arg("install-config")
    .assert()
    .success()
    .stdout(predicate::str::contains("Nothing to destroy"));
}

#[test]
fn destroy_is_idempotent() {
  let env = TestEnv::new();

  env.kiln_cmd().arg("create").arg("install-config").assert().success();

  env.kiln_cmd().arg("destroy").arg("install-config").assert().success();
  env
    .kiln_cmd()
    .arg("destroy")
    .arg("install-config")
    .assert()
    .success()
    .stdout(predicate::str::contains("Nothing to destroy"));
}

#[test]
fn destroy_only_touches_the_target() {
  let env = TestEnv::new();

  env.kiln_cmd().arg("create").arg("ignition-bundle").assert().success();

  env.kiln_cmd().arg("destroy").arg("manifests").assert().success();

  let state = std::fs::read_to_string(env.state_file()).unwrap();
  assert!(!state.contains("\"manifests\""));
  assert!(state.contains("\"ignition-bundle\""));
  assert!(env.workdir().join("bootstrap.ign").exists());
}
