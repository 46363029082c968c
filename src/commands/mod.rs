//! Command dispatch and handlers.

pub mod apply;
pub mod check;
pub mod resolve;

use std::env;
use std::path::{Path, PathBuf};

use crate::cassette::session::RecordingSession;
use crate::cli::Command;
use crate::context::ServiceContext;

/// Environment variable naming a directory to record cassettes into.
pub const RECORD_ENV: &str = "PKGPATCH_RECORD";

/// Dispatch a parsed command to its handler.
///
/// When `PKGPATCH_RECORD` is set to a directory path, shell and fetch
/// interactions are recorded to per-port cassette files in that directory.
///
/// # Errors
///
/// Returns an error string if the selected command handler fails.
pub fn dispatch(command: &Command, project_dir: &Path) -> Result<(), String> {
    let (ctx, session) = if let Ok(path) = env::var(RECORD_ENV) {
        let (ctx, session) = ServiceContext::recording_at(PathBuf::from(path))?;
        (ctx, Some(session))
    } else {
        (ServiceContext::live(), None)
    };

    let result = dispatch_with_context(command, &ctx, project_dir);

    // Finish recording after command completes (even on error)
    if let Some(session) = session {
        // Drop context first to release Arc references
        drop(ctx);
        finish_recording(session)?;
    }

    result
}

/// Dispatch a command with the given service context.
///
/// # Errors
///
/// Returns an error string if the selected command handler fails.
pub fn dispatch_with_context(
    command: &Command,
    ctx: &ServiceContext,
    project_dir: &Path,
) -> Result<(), String> {
    match command {
        Command::Resolve => resolve::run(ctx, project_dir),
        Command::Check { dry_run } => check::run(ctx, project_dir, *dry_run),
        Command::Apply { packages } => apply::run(ctx, project_dir, packages),
    }
}

/// Finish a recording session and print the output directory.
fn finish_recording(session: RecordingSession) -> Result<(), String> {
    let output_dir = session.finish()?;
    eprintln!("Recording saved to: {}", output_dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemFs;

    #[test]
    fn dispatch_routes_to_resolve() {
        let fs = MemFs::new();
        fs.insert("/proj/project.json", r#"{"name": "acme/site"}"#);
        let ctx = ServiceContext::in_memory(fs);
        assert!(dispatch_with_context(&Command::Resolve, &ctx, Path::new("/proj")).is_ok());
    }

    #[test]
    fn dispatch_surfaces_handler_errors() {
        let ctx = ServiceContext::in_memory(MemFs::new());
        let err = dispatch_with_context(&Command::Check { dry_run: true }, &ctx, Path::new("/proj"))
            .unwrap_err();
        assert!(err.contains("project.json"), "{err}");
    }
}
