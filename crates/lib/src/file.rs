//! File records and their on-disk lifecycle.
//!
//! A [`File`] is the unit of asset I/O: a relative, forward-slash filename
//! plus an opaque byte payload. Assets expose their outputs as files, the
//! state file records them, and the helpers here write them under (and
//! remove them from) the working directory.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::asset::Asset;

/// A single output file of an asset.
///
/// Filenames are relative to the working directory, use `/` as the
/// separator, and never contain `..` segments. Two files produced by the
/// same asset must have distinct filenames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
  /// Relative path of the file within the working directory.
  #[serde(rename = "Filename")]
  pub filename: String,

  /// Raw contents, carried as base64 in the state file.
  #[serde(rename = "Data", with = "base64_bytes")]
  pub data: Vec<u8>,
}

impl File {
  pub fn new(filename: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
    Self {
      filename: filename.into(),
      data: data.into(),
    }
  }
}

/// Errors from writing or removing asset files.
#[derive(Debug, Error)]
pub enum FileError {
  #[error("failed to create directory {path}: {source}")]
  CreateDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to write {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to remove {path}: {source}")]
  Remove {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to read directory {path}: {source}")]
  ReadDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Write all of an asset's files under the working directory.
///
/// Parent directories are created as needed.
pub fn persist_asset(directory: &Path, asset: &dyn Asset) -> Result<(), FileError> {
  write_files(directory, &asset.files())
}

/// Write a list of files under the working directory.
pub fn write_files(directory: &Path, files: &[File]) -> Result<(), FileError> {
  for file in files {
    let path = directory.join(&file.filename);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).map_err(|source| FileError::CreateDir {
        path: parent.to_path_buf(),
        source,
      })?;
    }
    std::fs::write(&path, &file.data).map_err(|source| FileError::Write { path, source })?;
  }
  Ok(())
}

/// Remove an asset's files from the working directory.
///
/// Absent files are not an error. A parent directory left empty by a
/// removal is removed as well; the working directory itself is never
/// removed. Not safe for concurrent use on the same directory.
pub fn delete_from_disk(directory: &Path, files: &[File]) -> Result<(), FileError> {
  for file in files {
    let path = directory.join(&file.filename);
    debug!(file = %file.filename, "removing asset file from disk");
    match std::fs::remove_file(&path) {
      Ok(()) => {}
      Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
      Err(source) => return Err(FileError::Remove { path, source }),
    }

    if let Some(dir) = path.parent()
      && dir != directory
    {
      match is_dir_empty(dir) {
        Ok(true) => {
          std::fs::remove_dir(dir).map_err(|source| FileError::Remove {
            path: dir.to_path_buf(),
            source,
          })?;
        }
        Ok(false) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(source) => {
          return Err(FileError::ReadDir {
            path: dir.to_path_buf(),
            source,
          });
        }
      }
    }
  }
  Ok(())
}

fn is_dir_empty(dir: &Path) -> io::Result<bool> {
  Ok(std::fs::read_dir(dir)?.next().is_none())
}

mod base64_bytes {
  use base64::Engine as _;
  use base64::engine::general_purpose::STANDARD;
  use serde::{Deserialize, Deserializer, Serializer};

  pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(data))
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let encoded = String::deserialize(deserializer)?;
    STANDARD.decode(encoded.as_bytes()).map_err(serde::de::Error::custom)
  }
}
