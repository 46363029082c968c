//! Patch resolution, drift detection, and patch application for packages
//! installed by a dependency manager.
//!
//! A [`PatchSession`] resolves which patches target which packages, finds
//! installed packages whose applied patches no longer match, and applies
//! patches to freshly installed trees. The `pkgpatch` binary drives it
//! against a project directory.

pub mod adapters;
pub mod apply;
pub mod cassette;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod drift;
pub mod error;
pub mod patch;
pub mod ports;
pub mod project;
pub mod resolver;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use error::PatchError;
pub use session::PatchSession;

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "PKGPATCH_LOG";

/// Run the CLI with the provided arguments.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or command execution fails.
pub fn run<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = cli::Cli::try_parse_from(args).map_err(|err| err.to_string())?;
    init_tracing(cli.verbose);
    commands::dispatch(&cli.command, &cli.project_dir)
}

/// Installs the stderr log subscriber.
///
/// `PKGPATCH_LOG` takes precedence; otherwise `verbose` picks debug over
/// info. Only the first call has an effect.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "pkgpatch=debug" } else { "pkgpatch=info" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
