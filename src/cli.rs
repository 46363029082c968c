//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI parser for `pkgpatch`.
#[derive(Debug, Parser)]
#[command(name = "pkgpatch", version, about = "Resolve and apply patches to installed packages")]
pub struct Cli {
    /// Project directory holding project.json.
    #[arg(long, global = true, default_value = ".")]
    pub project_dir: PathBuf,

    /// Log at debug level.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print every resolved patch.
    Resolve,
    /// Find installed packages whose patches changed and uninstall them.
    Check {
        /// Report drift without uninstalling anything.
        #[arg(long)]
        dry_run: bool,
    },
    /// Apply resolved patches to installed packages.
    Apply {
        /// Only patch these packages.
        packages: Vec<String>,
    },
}
