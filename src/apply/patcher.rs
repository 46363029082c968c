//! Drives the external `patch` tool across strip-levels.

use std::path::Path;

use crate::ports::ShellExecutor;

/// Program used to apply diffs.
pub const PATCH_PROGRAM: &str = "patch";

/// Quotes `value` for a POSIX shell.
#[must_use]
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Builds one `patch` invocation against `target_dir`.
#[must_use]
pub fn patch_command(level: &str, target_dir: &Path, patch_file: &Path, dry_run: bool) -> String {
    let mut command = format!("{PATCH_PROGRAM} {} --batch --forward --no-backup-if-mismatch", shell_quote(level));
    if dry_run {
        command.push_str(" --dry-run");
    }
    command.push_str(&format!(
        " -d {} -i {}",
        shell_quote(&target_dir.to_string_lossy()),
        shell_quote(&patch_file.to_string_lossy())
    ));
    command
}

/// Applies `patch_file` to `target_dir`, trying each level in order.
///
/// Every level is first checked with `--dry-run`; the tree is only touched
/// by the real run once the dry run succeeded. Returns the level that
/// applied, or `None` when every level failed. Levels after the first
/// success are never tried.
pub fn apply_with_levels<'l>(
    shell: &dyn ShellExecutor,
    target_dir: &Path,
    patch_file: &Path,
    levels: &'l [String],
) -> Option<&'l str> {
    levels.iter().map(String::as_str).find(|level| {
        run_ok(shell, &patch_command(level, target_dir, patch_file, true))
            && run_ok(shell, &patch_command(level, target_dir, patch_file, false))
    })
}

fn run_ok(shell: &dyn ShellExecutor, command: &str) -> bool {
    match shell.run(command) {
        Ok(output) if output.success() => true,
        Ok(output) => {
            tracing::debug!(command, exit_code = output.exit_code, stderr = %output.stderr.trim(), "patch attempt failed");
            false
        }
        Err(e) => {
            tracing::warn!(command, "could not run patch tool: {e}");
            false
        }
    }
}
