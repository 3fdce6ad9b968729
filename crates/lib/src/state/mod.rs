//! The state file: persisted asset outputs across invocations.
//!
//! A single versioned JSON document at a fixed relative path within the
//! working directory, mapping asset identity to the list of files that
//! asset last produced. `save` merges rather than replaces, so entries for
//! assets outside the supplied list survive. A missing file is an empty
//! state; a malformed file is fatal.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::asset::{Asset, AssetId};
use crate::fetch::StateFetcher;
use crate::file::File;

/// Fixed relative path of the state file within the working directory.
pub const STATE_FILE_NAME: &str = ".openshift_install_state.json";

/// The version written into new state files.
///
/// The field is opaque to the engine today; unknown or missing versions are
/// accepted and assumed current, and whatever was loaded is preserved on
/// save.
pub const STATE_FILE_VERSION: &str = "v1";

#[derive(Debug, Error)]
pub enum StateError {
  #[error("failed to read state file {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse state file {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("failed to serialize state file: {0}")]
  Serialize(#[source] serde_json::Error),

  #[error("failed to create directory {path}: {source}")]
  CreateDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to write state file {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
  #[serde(rename = "Version", default)]
  version: String,

  #[serde(rename = "Contents", default)]
  contents: BTreeMap<String, Vec<File>>,
}

impl Default for StateFile {
  fn default() -> Self {
    Self {
      version: STATE_FILE_VERSION.to_string(),
      contents: BTreeMap::new(),
    }
  }
}

impl StateFile {
  /// Load the state from `path`. An absent file is an empty state.
  pub fn load(path: &Path) -> Result<Self, StateError> {
    let raw = match std::fs::read(path) {
      Ok(raw) => raw,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
      Err(source) => {
        return Err(StateError::Read {
          path: path.to_path_buf(),
          source,
        });
      }
    };

    serde_json::from_slice(&raw).map_err(|source| StateError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }

  /// Whether the state file has an entry for the given identity.
  pub fn exists(&self, id: AssetId) -> bool {
    self.contents.contains_key(id.as_str())
  }

  /// The files last recorded for the given identity; empty if absent.
  pub fn files(&self, id: AssetId) -> &[File] {
    self.contents.get(id.as_str()).map_or(&[], Vec::as_slice)
  }

  /// A fetcher scoped to the given identity's recorded files.
  pub fn fetcher(&self, id: AssetId) -> StateFetcher {
    StateFetcher::new(self.files(id).to_vec())
  }

  /// Record the given assets' current files and write the state to `path`.
  ///
  /// Entries for assets not in the list are preserved. Parent directories
  /// are created as needed; the document is written as four-space-indented
  /// JSON.
  pub fn save(&mut self, path: &Path, assets: &[&dyn Asset]) -> Result<(), StateError> {
    for asset in assets {
      self.contents.insert(asset.id().as_str().to_string(), asset.files());
    }

    let raw = self.to_indented_json()?;
    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent).map_err(|source| StateError::CreateDir {
        path: parent.to_path_buf(),
        source,
      })?;
    }
    std::fs::write(path, raw).map_err(|source| StateError::Write {
      path: path.to_path_buf(),
      source,
    })
  }

  /// Drop the entry for the given identity, if any.
  pub fn remove(&mut self, id: AssetId) {
    self.contents.remove(id.as_str());
  }

  fn to_indented_json(&self) -> Result<Vec<u8>, StateError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    self.serialize(&mut serializer).map_err(StateError::Serialize)?;
    Ok(buf)
  }
}
