//! kiln_lib: the asset engine behind kiln.
//!
//! This crate provides the machinery for materialising a
//! cluster-installation bundle from a DAG of assets:
//! - `asset`: the asset contract, identities, parents, and the registry
//! - `file`: file records and their on-disk lifecycle
//! - `fetch`: fetchers over the working directory and the state file
//! - `state`: the persisted state file
//! - `store`: DAG evaluation with provenance tracking and purging
//! - `encode`: the structural encoder feeding the disk persister
//!
//! Concrete asset implementations live with consumers (e.g. the `kiln`
//! binary); the engine is indifferent to their contents.

pub mod asset;
pub mod encode;
pub mod fetch;
pub mod file;
pub mod state;
pub mod store;
