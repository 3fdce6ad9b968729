//! The demonstration asset taxonomy driven by the CLI.
//!
//! Three nodes: the user-editable install config feeds the cluster
//! manifests, and both feed the Ignition bundle. Each implements the
//! engine's asset contract; the engine itself knows nothing about them.

use std::any::Any;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use kiln_lib::asset::{Asset, AssetId, AssetKind, DynError, Parents, Registry};
use kiln_lib::fetch::FileFetcher;
use kiln_lib::file::File;

pub const INSTALL_CONFIG_FILENAME: &str = "install-config.yaml";

const IGNITION_VERSION: &str = "3.4.0";
const IGNITION_ROLES: [&str; 3] = ["bootstrap", "master", "worker"];

/// The assets addressable from the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Target {
  InstallConfig,
  Manifests,
  IgnitionBundle,
}

impl Target {
  pub fn id(self) -> AssetId {
    match self {
      Target::InstallConfig => InstallConfig::ID,
      Target::Manifests => Manifests::ID,
      Target::IgnitionBundle => IgnitionBundle::ID,
    }
  }
}

/// Registry of every variant the CLI can evaluate.
pub fn registry() -> Registry {
  let mut registry = Registry::new();
  registry.register::<InstallConfig>();
  registry.register::<Manifests>();
  registry.register::<IgnitionBundle>();
  registry
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallConfigData {
  pub cluster_name: String,
  pub base_domain: String,
  pub worker_replicas: u32,
}

impl Default for InstallConfigData {
  fn default() -> Self {
    Self {
      cluster_name: "demo".to_string(),
      base_domain: "example.com".to_string(),
      worker_replicas: 3,
    }
  }
}

/// The user-editable cluster configuration document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstallConfig {
  pub data: Option<InstallConfigData>,
  file: Option<File>,
}

impl Asset for InstallConfig {
  fn id(&self) -> AssetId {
    Self::ID
  }

  fn name(&self) -> &'static str {
    "Install Config"
  }

  fn dependencies(&self) -> Vec<AssetId> {
    Vec::new()
  }

  fn generate(&mut self, _parents: &Parents) -> Result<(), DynError> {
    let data = InstallConfigData::default();
    let rendered = serde_yaml::to_string(&data)?;
    self.file = Some(File::new(INSTALL_CONFIG_FILENAME, rendered.into_bytes()));
    self.data = Some(data);
    Ok(())
  }

  fn files(&self) -> Vec<File> {
    self.file.iter().cloned().collect()
  }

  fn load(&mut self, fetcher: &dyn FileFetcher) -> Result<bool, DynError> {
    let Some(found) = fetcher.fetch_by_name(INSTALL_CONFIG_FILENAME)? else {
      return Ok(false);
    };
    let data: InstallConfigData = serde_yaml::from_slice(&found.data)?;
    self.data = Some(data);
    self.file = Some(found);
    Ok(true)
  }

  fn as_any(&self) -> &dyn Any {
    self
  }

  fn clone_asset(&self) -> Box<dyn Asset> {
    Box::new(self.clone())
  }

  fn deep_equals(&self, other: &dyn Asset) -> bool {
    other.as_any().downcast_ref::<Self>().is_some_and(|o| o == self)
  }
}

impl AssetKind for InstallConfig {
  const ID: AssetId = AssetId("install-config");
}

/// Cluster manifests derived from the install config.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifests {
  files: Vec<File>,
}

impl Asset for Manifests {
  fn id(&self) -> AssetId {
    Self::ID
  }

  fn name(&self) -> &'static str {
    "Manifests"
  }

  fn dependencies(&self) -> Vec<AssetId> {
    vec![InstallConfig::ID]
  }

  fn generate(&mut self, parents: &Parents) -> Result<(), DynError> {
    let config = parents
      .get::<InstallConfig>()
      .ok_or("missing parent: install config")?;
    let data = config.data.as_ref().ok_or("install config is not populated")?;

    let cluster_config = serde_yaml::to_string(&serde_json::json!({
      "apiVersion": "config.kiln.io/v1",
      "kind": "ClusterConfig",
      "metadata": { "name": data.cluster_name },
      "baseDomain": data.base_domain,
      "workerReplicas": data.worker_replicas,
    }))?;
    let infrastructure = serde_json::to_vec_pretty(&serde_json::json!({
      "apiVersion": "config.kiln.io/v1",
      "kind": "Infrastructure",
      "platform": "none",
      "clusterName": data.cluster_name,
    }))?;

    self.files = vec![
      File::new("manifests/cluster-config.yaml", cluster_config.into_bytes()),
      File::new("manifests/infrastructure.json", infrastructure),
    ];
    Ok(())
  }

  fn files(&self) -> Vec<File> {
    self.files.clone()
  }

  fn load(&mut self, fetcher: &dyn FileFetcher) -> Result<bool, DynError> {
    let found = fetcher.fetch_by_pattern("manifests/*")?;
    if found.is_empty() {
      return Ok(false);
    }
    self.files = found;
    Ok(true)
  }

  fn as_any(&self) -> &dyn Any {
    self
  }

  fn clone_asset(&self) -> Box<dyn Asset> {
    Box::new(self.clone())
  }

  fn deep_equals(&self, other: &dyn Asset) -> bool {
    other.as_any().downcast_ref::<Self>().is_some_and(|o| o == self)
  }
}

impl AssetKind for Manifests {
  const ID: AssetId = AssetId("manifests");
}

/// The Ignition payloads handed to cluster machines at first boot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IgnitionBundle {
  files: Vec<File>,
}

impl Asset for IgnitionBundle {
  fn id(&self) -> AssetId {
    Self::ID
  }

  fn name(&self) -> &'static str {
    "Ignition Bundle"
  }

  fn dependencies(&self) -> Vec<AssetId> {
    vec![Manifests::ID, InstallConfig::ID]
  }

  fn generate(&mut self, parents: &Parents) -> Result<(), DynError> {
    let config = parents
      .get::<InstallConfig>()
      .ok_or("missing parent: install config")?;
    let manifests = parents.get::<Manifests>().ok_or("missing parent: manifests")?;
    let data = config.data.as_ref().ok_or("install config is not populated")?;

    let mut files = Vec::with_capacity(IGNITION_ROLES.len());
    for role in IGNITION_ROLES {
      let payload = serde_json::to_vec_pretty(&serde_json::json!({
        "ignition": { "version": IGNITION_VERSION },
        "metadata": {
          "cluster": data.cluster_name,
          "role": role,
          "manifests": manifests.files().len(),
        },
      }))?;
      files.push(File::new(format!("{role}.ign"), payload));
    }
    self.files = files;
    Ok(())
  }

  fn files(&self) -> Vec<File> {
    self.files.clone()
  }

  fn load(&mut self, fetcher: &dyn FileFetcher) -> Result<bool, DynError> {
    let mut found = Vec::with_capacity(IGNITION_ROLES.len());
    for role in IGNITION_ROLES {
      if let Some(file) = fetcher.fetch_by_name(&format!("{role}.ign"))? {
        found.push(file);
      }
    }
    if found.is_empty() {
      return Ok(false);
    }
    if found.len() != IGNITION_ROLES.len() {
      return Err("incomplete ignition bundle in the working directory".into());
    }
    self.files = found;
    Ok(true)
  }

  fn as_any(&self) -> &dyn Any {
    self
  }

  fn clone_asset(&self) -> Box<dyn Asset> {
    Box::new(self.clone())
  }

  fn deep_equals(&self, other: &dyn Asset) -> bool {
    other.as_any().downcast_ref::<Self>().is_some_and(|o| o == self)
  }
}

impl AssetKind for IgnitionBundle {
  const ID: AssetId = AssetId("ignition-bundle");
}
