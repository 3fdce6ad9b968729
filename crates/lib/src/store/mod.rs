//! The store: DAG evaluation with provenance tracking.
//!
//! The store resolves an asset's dependencies depth-first, decides for each
//! node whether to generate it, take it from the working directory, or
//! restore it from the state file, persists the state file once the whole
//! graph is evaluated, and finally purges consumed on-disk inputs.
//!
//! # Provenance and dirtiness
//!
//! A node loaded from the working directory overrides whatever was
//! generated or recorded before, and it dirties every transitive
//! descendant: their stored forms reflect the old parent and must be
//! regenerated. When the on-disk copy is deeply equal to the state-file
//! copy, the state-file source is preferred so no dirtiness cascades.
//!
//! Evaluation is single-threaded and synchronous; the store assumes
//! exclusive ownership of the working directory for the duration of a call.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::asset::{Asset, AssetId, DynError, GraphError, Parents, Registry};
use crate::fetch::DiskFetcher;
use crate::file::{self, FileError};
use crate::state::{STATE_FILE_NAME, StateError, StateFile};

/// Where a fetched asset's value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
  /// Generated from its parents during this run.
  Generated,
  /// Loaded from the user-provided working directory.
  OnDisk,
  /// Restored from the state file.
  StateFile,
}

#[derive(Debug, Error)]
pub enum StoreError {
  #[error(transparent)]
  Graph(#[from] GraphError),

  #[error(transparent)]
  State(#[from] StateError),

  #[error(transparent)]
  File(#[from] FileError),

  #[error("failed to fetch dependency of {name}: {source}")]
  Dependency {
    name: &'static str,
    #[source]
    source: Box<StoreError>,
  },

  #[error("failed to generate asset {name}: {source}")]
  Generate {
    name: &'static str,
    #[source]
    source: DynError,
  },

  #[error("failed to load asset {name}: {source}")]
  Load {
    name: &'static str,
    #[source]
    source: DynError,
  },

  #[error("failed to load asset {name} from state file: {source}")]
  LoadFromState {
    name: &'static str,
    #[source]
    source: DynError,
  },

  #[error("failed to purge consumed assets: {0}")]
  Purge(#[source] FileError),
}

// Per-identity evaluation state. `source == None` means unfetched; a
// fetched node always has `asset` populated.
struct AssetState {
  asset: Option<Box<dyn Asset>>,
  source: Option<Provenance>,
  any_parents_dirty: bool,
  present_on_disk: bool,
}

/// The asset engine over one working directory.
pub struct Store {
  directory: PathBuf,
  registry: Registry,
  assets: HashMap<AssetId, AssetState>,
  state_file: StateFile,
}

impl Store {
  /// Open a store over `directory` with the given asset registry.
  ///
  /// The registry is validated (closed and acyclic) and the state file is
  /// loaded eagerly; a malformed state file is fatal, a missing one is an
  /// empty state.
  pub fn new(directory: impl Into<PathBuf>, registry: Registry) -> Result<Self, StoreError> {
    let directory = directory.into();
    registry.verify()?;
    let state_file = StateFile::load(&directory.join(STATE_FILE_NAME))?;
    Ok(Self {
      directory,
      registry,
      assets: HashMap::new(),
      state_file,
    })
  }

  pub fn directory(&self) -> &Path {
    &self.directory
  }

  /// Where the given asset's current value came from, if it was fetched.
  pub fn provenance(&self, id: AssetId) -> Option<Provenance> {
    self.assets.get(&id).and_then(|state| state.source)
  }

  /// Evaluate `target` and everything it depends on.
  ///
  /// On success the state file records every evaluated node and any
  /// consumed on-disk input other than the target has been removed from
  /// the working directory. Returns the evaluated target.
  pub fn fetch(&mut self, target: AssetId) -> Result<Box<dyn Asset>, StoreError> {
    self.fetch_node(target)?;
    self.save()?;
    self.purge(target).map_err(StoreError::Purge)?;

    self
      .assets
      .get(&target)
      .and_then(|state| state.asset.as_ref())
      .map(|asset| asset.clone_asset())
      .ok_or(StoreError::Graph(GraphError::Unknown(target)))
  }

  /// Remove `target` from the engine, from disk, and from the state file.
  ///
  /// If the target was never fetched this run, its recorded files are
  /// loaded from the state file first so they can be deleted. An identity
  /// with no recorded state anywhere is a no-op.
  pub fn destroy(&mut self, target: AssetId) -> Result<(), StoreError> {
    let instance: Box<dyn Asset> = if let Some(state) = self.assets.get(&target)
      && let Some(asset) = state.asset.as_ref()
    {
      asset.clone_asset()
    } else if self.state_file.exists(target) {
      let mut asset = self.registry.instantiate(target)?;
      let name = asset.name();
      let fetcher = self.state_file.fetcher(target);
      asset
        .load(&fetcher)
        .map_err(|source| StoreError::LoadFromState { name, source })?;
      asset
    } else {
      // Nothing to do.
      return Ok(());
    };

    info!(asset = instance.name(), "destroying asset");
    file::delete_from_disk(&self.directory, &instance.files())?;
    self.assets.remove(&target);
    self.state_file.remove(target);
    self.save()
  }

  // Populate one node, generating it and its dependencies as needed.
  //
  // Depth-first: parents always finish before children, so a previously
  // fetched node is authoritative and is reused as-is.
  fn fetch_node(&mut self, id: AssetId) -> Result<(), StoreError> {
    if !self.assets.contains_key(&id) {
      self.load_node(id)?;
    }

    if let Some(state) = self.assets.get(&id)
      && state.source.is_some()
    {
      debug!(asset = %id, "reusing previously fetched asset");
      return Ok(());
    }

    let mut node = self.registry.instantiate(id)?;
    debug!(asset = node.name(), "fetching asset");

    let mut parents = Parents::new();
    for dep in node.dependencies() {
      self.fetch_node(dep).map_err(|source| StoreError::Dependency {
        name: node.name(),
        source: Box::new(source),
      })?;
      if let Some(parent) = self.assets.get(&dep).and_then(|state| state.asset.as_ref()) {
        parents.add(parent.clone_asset());
      }
    }

    debug!(asset = node.name(), "generating asset");
    let name = node.name();
    node
      .generate(&parents)
      .map_err(|source| StoreError::Generate { name, source })?;

    if let Some(state) = self.assets.get_mut(&id) {
      state.asset = Some(node);
      state.source = Some(Provenance::Generated);
    }
    Ok(())
  }

  // Load one node and all of its ancestors from the working directory and
  // the state file, reconciling the two against parent dirtiness.
  fn load_node(&mut self, id: AssetId) -> Result<(), StoreError> {
    if self.assets.contains_key(&id) {
      return Ok(());
    }

    let probe = self.registry.instantiate(id)?;
    let name = probe.name();
    debug!(asset = name, "loading asset");

    let mut any_parents_dirty = false;
    for dep in probe.dependencies() {
      self.load_node(dep)?;
      if let Some(dep_state) = self.assets.get(&dep)
        && (dep_state.any_parents_dirty || dep_state.source == Some(Provenance::OnDisk))
      {
        any_parents_dirty = true;
      }
    }

    let mut on_disk_asset = self.registry.instantiate(id)?;
    let found_on_disk = on_disk_asset
      .load(&DiskFetcher::new(&self.directory))
      .map_err(|source| StoreError::Load { name, source })?;

    // A dirty parent forces regeneration, so the state file is not even
    // consulted in that case.
    let mut state_file_asset: Option<Box<dyn Asset>> = None;
    let mut found_in_state_file = false;
    let mut on_disk_matches_state_file = false;
    if !any_parents_dirty {
      found_in_state_file = self.state_file.exists(id);
      if found_in_state_file {
        let mut restored = self.registry.instantiate(id)?;
        let fetcher = self.state_file.fetcher(id);
        restored
          .load(&fetcher)
          .map_err(|source| StoreError::LoadFromState { name, source })?;

        if found_on_disk {
          on_disk_matches_state_file = on_disk_asset.deep_equals(restored.as_ref());
          if on_disk_matches_state_file {
            debug!(asset = name, "on-disk asset matches the state file");
          }
        }
        state_file_asset = Some(restored);
      }
    }

    let (asset, source) = if any_parents_dirty {
      if found_on_disk {
        warn!(
          asset = name,
          "discarding the copy in the working directory: its dependencies changed and it must be regenerated"
        );
      }
      (None, None)
    } else if found_on_disk && !on_disk_matches_state_file {
      debug!(asset = name, "using asset from the working directory");
      (Some(on_disk_asset), Some(Provenance::OnDisk))
    } else if found_in_state_file {
      debug!(asset = name, "using asset from the state file");
      (state_file_asset, Some(Provenance::StateFile))
    } else {
      (None, None)
    };

    self.assets.insert(
      id,
      AssetState {
        asset,
        source,
        any_parents_dirty,
        present_on_disk: found_on_disk,
      },
    );
    Ok(())
  }

  // Write every fetched node's current files into the state file.
  fn save(&mut self) -> Result<(), StoreError> {
    let fetched: Vec<&dyn Asset> = self
      .assets
      .values()
      .filter(|state| state.source.is_some())
      .filter_map(|state| state.asset.as_deref())
      .collect();
    self.state_file.save(&self.directory.join(STATE_FILE_NAME), &fetched)?;
    Ok(())
  }

  // Delete consumed on-disk inputs, e.g. the install config after the
  // manifests that absorbed it were fetched. The target itself is kept.
  fn purge(&mut self, excluded: AssetId) -> Result<(), FileError> {
    for (id, state) in self.assets.iter_mut() {
      if !state.present_on_disk || *id == excluded {
        continue;
      }
      let Some(asset) = state.asset.as_deref() else {
        continue;
      };
      info!(asset = asset.name(), "consuming asset from the working directory");
      file::delete_from_disk(&self.directory, &asset.files())?;
      state.present_on_disk = false;
    }
    Ok(())
  }
}
