//! Implementation of the `kiln destroy` command.
//!
//! Removes the target asset from the state file and deletes its files
//! from the working directory. Destroying an asset with no recorded state
//! is a no-op.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use kiln_lib::state::{STATE_FILE_NAME, StateFile};
use kiln_lib::store::Store;

use crate::assets::{self, Target};
use crate::output;

/// Execute the destroy command.
pub fn cmd_destroy(target: Target, dir: &Path) -> Result<()> {
  let recorded = StateFile::load(&dir.join(STATE_FILE_NAME))
    .context("failed to read the state file")?
    .exists(target.id());

  let mut store = Store::new(dir, assets::registry()).context("failed to open the asset store")?;
  store
    .destroy(target.id())
    .with_context(|| format!("failed to destroy {}", target.id()))?;

  info!(asset = %target.id(), directory = %dir.display(), "destroy command completed");

  if recorded {
    output::print_success(&format!("Destroyed {}", target.id()));
  } else {
    println!("Nothing to destroy.");
  }
  Ok(())
}
