//! kiln-cli: command-line interface for kiln.
//!
//! Provides the `kiln` command with subcommands:
//! - `kiln create <target>` - materialise a target asset and its graph
//! - `kiln destroy <target>` - remove a target asset from state and disk

mod assets;
mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::assets::Target;

#[derive(Parser)]
#[command(name = "kiln")]
#[command(author, version, about = "Materialise cluster-installation bundles from an asset graph")]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Working directory holding the bundle and its state file
  #[arg(long, global = true, default_value = ".")]
  dir: PathBuf,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Materialise a target asset, generating its dependencies as needed
  Create {
    /// The asset to materialise
    target: Target,
  },

  /// Remove a target asset from the state file and the working directory
  Destroy {
    /// The asset to remove
    target: Target,
  },
}

fn main() {
  let cli = Cli::parse();

  let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
  FmtSubscriber::builder()
    .with_max_level(level)
    .with_target(false)
    .without_time()
    .init();

  let result: Result<()> = match cli.command {
    Commands::Create { target } => cmd::cmd_create(target, &cli.dir),
    Commands::Destroy { target } => cmd::cmd_destroy(target, &cli.dir),
  };

  if let Err(err) = result {
    output::print_error(&format!("{err:#}"));
    std::process::exit(1);
  }
}
