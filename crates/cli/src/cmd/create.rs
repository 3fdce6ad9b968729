//! Implementation of the `kiln create` command.
//!
//! Evaluates the target asset's graph, writes the target's files into the
//! working directory, and reports what was produced. Inputs the user
//! supplied in the working directory are absorbed and consumed by the
//! engine during the fetch.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use kiln_lib::file;
use kiln_lib::store::Store;

use crate::assets::{self, Target};
use crate::output::{self, symbols};

/// Execute the create command.
pub fn cmd_create(target: Target, dir: &Path) -> Result<()> {
  let mut store = Store::new(dir, assets::registry()).context("failed to open the asset store")?;

  let asset = store
    .fetch(target.id())
    .with_context(|| format!("failed to fetch {}", target.id()))?;
  file::persist_asset(dir, asset.as_ref()).context("failed to write asset files")?;

  info!(asset = asset.name(), directory = %dir.display(), "create command completed");

  let files = asset.files();
  for written in &files {
    println!("  {} {}", symbols::PLUS, written.filename);
  }
  output::print_success(&format!("Created {} ({} file(s))", asset.name(), files.len()));
  Ok(())
}
