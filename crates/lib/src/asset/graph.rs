//! The asset registry: identity → factory, validated as a DAG.
//!
//! Dependencies are declared as identities, so the engine needs a table
//! that turns an identity back into a fresh node. Consumers register every
//! variant at startup; the store validates the graph (closed and acyclic)
//! before any evaluation.

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graph::DiGraph;
use thiserror::Error;

use super::{Asset, AssetId, AssetKind};

/// Produces a fresh, unpopulated instance of one asset variant.
pub type AssetFactory = fn() -> Box<dyn Asset>;

#[derive(Debug, Error)]
pub enum GraphError {
  #[error("asset {dependent} depends on unregistered asset {missing}")]
  MissingDependency { dependent: AssetId, missing: AssetId },

  #[error("dependency cycle detected in the asset graph")]
  CycleDetected,

  #[error("unknown asset {0}")]
  Unknown(AssetId),
}

/// The set of asset variants a store can instantiate.
#[derive(Default)]
pub struct Registry {
  factories: HashMap<AssetId, AssetFactory>,
}

impl Registry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a variant under its declared identity.
  ///
  /// Registering the same identity twice replaces the earlier factory.
  pub fn register<A: AssetKind + Default + 'static>(&mut self) {
    let factory: AssetFactory = || Box::new(A::default());
    self.factories.insert(A::ID, factory);
  }

  /// Construct a fresh instance of the given variant.
  pub fn instantiate(&self, id: AssetId) -> Result<Box<dyn Asset>, GraphError> {
    self.factories.get(&id).map(|f| f()).ok_or(GraphError::Unknown(id))
  }

  pub fn contains(&self, id: AssetId) -> bool {
    self.factories.contains_key(&id)
  }

  pub fn ids(&self) -> impl Iterator<Item = AssetId> + '_ {
    self.factories.keys().copied()
  }

  /// Verify the registered graph is closed and acyclic.
  ///
  /// Every declared dependency must itself be registered, and the edges
  /// from dependency to dependent must admit a topological order.
  pub fn verify(&self) -> Result<(), GraphError> {
    let mut graph = DiGraph::<AssetId, ()>::new();
    let mut nodes = HashMap::new();

    for &id in self.factories.keys() {
      nodes.insert(id, graph.add_node(id));
    }

    for (&id, factory) in &self.factories {
      let probe = factory();
      for dep in probe.dependencies() {
        let Some(&dep_idx) = nodes.get(&dep) else {
          return Err(GraphError::MissingDependency {
            dependent: id,
            missing: dep,
          });
        };
        graph.add_edge(dep_idx, nodes[&id], ());
      }
    }

    toposort(&graph, None).map_err(|_| GraphError::CycleDetected)?;
    Ok(())
  }
}
