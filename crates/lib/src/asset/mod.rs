//! The asset contract: typed nodes of the installation DAG.
//!
//! An asset is a node that can be generated from its parents, loaded from
//! the working directory or the state file, and persisted as a list of
//! [`File`]s. The engine treats assets as opaque holders of mutable state;
//! callers must not read an asset's files before a successful fetch,
//! generate, or load.

mod graph;

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

pub use graph::{AssetFactory, GraphError, Registry};

use crate::fetch::FileFetcher;
use crate::file::File;

/// Open error alias for asset implementations.
///
/// Concrete assets live outside the engine and fail with their own error
/// types; `generate` and `load` carry them through this boxed form.
pub type DynError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Stable identity of an asset variant.
///
/// The identity is a statically-assigned string declared alongside the
/// variant. It keys the state file and the store's memoisation table, so it
/// must not change across invocations of the same binary version. Two
/// instances of the same variant share identity; the engine assumes at most
/// one logical instance per identity per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(pub &'static str);

impl AssetId {
  pub fn as_str(self) -> &'static str {
    self.0
  }
}

impl fmt::Display for AssetId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.0)
  }
}

/// A typed node in the installation DAG.
///
/// `load` is transactional: on error the instance must be left exactly as
/// it was on entry, so a failed state-file load followed by a disk load is
/// safe. Construct into a temporary and move into place only on success.
pub trait Asset: Any + fmt::Debug {
  /// Stable identity of this variant.
  fn id(&self) -> AssetId;

  /// Human-friendly name, for diagnostics only. Not an identity.
  fn name(&self) -> &'static str;

  /// Identities of the assets this asset directly depends on.
  ///
  /// Must be statically fixed per variant and acyclic across the graph.
  fn dependencies(&self) -> Vec<AssetId>;

  /// Populate this asset from the given parent states.
  fn generate(&mut self, parents: &Parents) -> Result<(), DynError>;

  /// The asset's current output files. May be empty.
  fn files(&self) -> Vec<File>;

  /// Attempt to rehydrate this asset from a fetcher.
  ///
  /// `Ok(false)` means the asset's files are absent, which is not an
  /// error. On `Err` this instance must be unchanged.
  fn load(&mut self, fetcher: &dyn FileFetcher) -> Result<bool, DynError>;

  fn as_any(&self) -> &dyn Any;

  fn clone_asset(&self) -> Box<dyn Asset>;

  /// Deep structural equality against another instance of the same variant.
  ///
  /// Used to decide whether an on-disk copy matches the state file.
  /// Instances of different variants are never equal.
  fn deep_equals(&self, other: &dyn Asset) -> bool;
}

/// An asset variant with a statically-known identity.
///
/// Implemented alongside [`Asset`] by every concrete variant; enables typed
/// lookup in [`Parents`] and registration in a [`Registry`].
pub trait AssetKind: Asset {
  const ID: AssetId;
}

/// The evaluated parents passed to [`Asset::generate`].
///
/// A type-indexed bundle of already-evaluated assets. Lookup by variant is
/// total within a generator's declared dependency set.
#[derive(Default)]
pub struct Parents {
  assets: HashMap<AssetId, Box<dyn Asset>>,
}

impl Parents {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add an evaluated asset, keyed by its identity.
  pub fn add(&mut self, asset: Box<dyn Asset>) {
    self.assets.insert(asset.id(), asset);
  }

  /// Typed lookup of a parent by variant.
  pub fn get<T: AssetKind>(&self) -> Option<&T> {
    self.assets.get(&T::ID)?.as_any().downcast_ref::<T>()
  }

  pub fn contains(&self, id: AssetId) -> bool {
    self.assets.contains_key(&id)
  }

  pub fn len(&self) -> usize {
    self.assets.len()
  }

  pub fn is_empty(&self) -> bool {
    self.assets.is_empty()
  }
}
