//! Create command integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn create_install_config_writes_file_and_state() {
  let env = TestEnv::new();

  env
    .kiln_cmd()
    .arg("create")
    .arg("install-config")
    .assert()
    .success()
    .stdout(predicate::str::contains("install-config.yaml"))
    .stdout(predicate::str::contains("Created Install Config"));

  let rendered = std::fs::read_to_string(env.workdir().join("install-config.yaml")).unwrap();
  assert!(rendered.contains("clusterName: demo"));
  assert!(env.state_file().exists());
}

#[test]
fn create_is_idempotent() {
  let env = TestEnv::new();

  env.kiln_cmd().arg("create").arg("install-config").assert().success();
  let first_state = std::fs::read(env.state_file()).unwrap();
  let first_config = std::fs::read(env.workdir().join("install-config.yaml")).unwrap();

  env.kiln_cmd().arg("create").arg("install-config").assert().success();

  assert_eq!(std::fs::read(env.state_file()).unwrap(), first_state);
  assert_eq!(
    std::fs::read(env.workdir().join("install-config.yaml")).unwrap(),
    first_config
  );
}

#[test]
fn create_ignition_bundle_generates_the_whole_graph() {
  let env = TestEnv::new();

  env
    .kiln_cmd()
    .arg("create")
    .arg("ignition-bundle")
    .assert()
    .success()
    .stdout(predicate::str::contains("bootstrap.ign"))
    .stdout(predicate::str::contains("master.ign"))
    .stdout(predicate::str::contains("worker.ign"));

  assert!(env.workdir().join("bootstrap.ign").exists());

  let state = std::fs::read_to_string(env.state_file()).unwrap();
  assert!(state.contains("\"install-config\""));
  assert!(state.contains("\"manifests\""));
  assert!(state.contains("\"ignition-bundle\""));
}

#[test]
fn create_consumes_the_install_config_once_absorbed() {
  let env = TestEnv::new();

  env.kiln_cmd().arg("create").arg("install-config").assert().success();
  assert!(env.workdir().join("install-config.yaml").exists());

  env.kiln_cmd().arg("create").arg("ignition-bundle").assert().success();

  // The user-editable input was absorbed downstream and deleted.
  assert!(!env.workdir().join("install-config.yaml").exists());
  assert!(env.workdir().join("bootstrap.ign").exists());
}

#[test]
fn edited_install_config_feeds_the_downstream_assets() {
  let env = TestEnv::new();

  env.kiln_cmd().arg("create").arg("install-config").assert().success();

  let config_path = env.workdir().join("install-config.yaml");
  let edited = std::fs::read_to_string(&config_path)
    .unwrap()
    .replace("clusterName: demo", "clusterName: renamed");
  std::fs::write(&config_path, edited).unwrap();

  env.kiln_cmd().arg("create").arg("ignition-bundle").assert().success();

  let bootstrap = std::fs::read_to_string(env.workdir().join("bootstrap.ign")).unwrap();
  assert!(bootstrap.contains("\"cluster\": \"renamed\""));
  assert!(!config_path.exists());
}
