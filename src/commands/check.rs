//! `pkgpatch check` command.

use std::path::Path;

use crate::context::ServiceContext;
use crate::drift::format_drift_report;
use crate::project::ProjectStore;
use crate::session::PatchSession;

/// Execute the `check` command.
///
/// Reports installed packages whose resolved patches differ from the ones
/// recorded as applied. Unless `dry_run` is set, each drifted package is
/// removed from the installed repository and its install directory deleted,
/// so the next install puts back clean files.
///
/// # Errors
///
/// Returns an error string if host metadata, configuration, or resolution
/// fails, or if an install directory cannot be removed.
pub fn run(ctx: &ServiceContext, project_dir: &Path, dry_run: bool) -> Result<(), String> {
    let store = ProjectStore::new(ctx, project_dir);
    let mut session = PatchSession::open(ctx, &store).map_err(|e| e.to_string())?;
    let mut installed = store.load_installed().map_err(|e| e.to_string())?;

    let report = session.check_drift(&installed).map_err(|e| e.to_string())?;
    println!("{}", format_drift_report(&report));
    if report.is_clean() {
        return Ok(());
    }
    if dry_run {
        println!("Dry run: nothing was uninstalled.");
        return Ok(());
    }

    for instruction in report.uninstall_instructions() {
        let Some(package) = installed.remove(&instruction.package) else {
            continue;
        };
        let path = store.install_path(&package);
        ctx.fs
            .remove_dir_all(&path)
            .map_err(|e| format!("Failed to remove {}: {e}", path.display()))?;
        tracing::info!(package = %package.name, path = %path.display(), "uninstalled");
    }
    store.save_installed(&installed).map_err(|e| e.to_string())?;
    println!("Reinstall the listed packages, then run `pkgpatch apply`.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemFs;

    const PROJECT: &str = r#"{"name": "acme/site", "extra": {"patches": {"my/pkg": {"fix": "fix.patch"}}}}"#;
    const LOCK: &str = r#"{"packages": [{"name": "my/pkg", "version": "1.0.0"}, {"name": "other/pkg", "version": "2.0.0"}]}"#;
    const INSTALLED: &str = r#"{"packages": [{"name": "my/pkg", "version": "1.0.0"}, {"name": "other/pkg", "version": "2.0.0"}]}"#;

    fn project() -> MemFs {
        let fs = MemFs::new();
        fs.insert("/proj/project.json", PROJECT);
        fs.insert("/proj/project.lock", LOCK);
        fs.insert("/proj/vendor/installed.json", INSTALLED);
        fs.insert("/proj/vendor/my/pkg/src/lib.txt", "original");
        fs.insert("/proj/vendor/other/pkg/src/lib.txt", "original");
        fs
    }

    #[test]
    fn drifted_package_is_uninstalled() {
        let fs = project();
        let ctx = ServiceContext::in_memory(fs.clone());

        run(&ctx, Path::new("/proj"), false).unwrap();

        assert_eq!(fs.get("/proj/vendor/my/pkg/src/lib.txt"), None);
        assert!(fs.get("/proj/vendor/other/pkg/src/lib.txt").is_some());
        let installed = fs.get("/proj/vendor/installed.json").unwrap();
        assert!(!installed.contains("my/pkg"));
        assert!(installed.contains("other/pkg"));
    }

    #[test]
    fn dry_run_changes_nothing() {
        let fs = project();
        let ctx = ServiceContext::in_memory(fs.clone());

        run(&ctx, Path::new("/proj"), true).unwrap();

        assert!(fs.get("/proj/vendor/my/pkg/src/lib.txt").is_some());
        assert_eq!(fs.get("/proj/vendor/installed.json").as_deref(), Some(INSTALLED));
    }

    #[test]
    fn missing_project_file_is_an_error() {
        let ctx = ServiceContext::in_memory(MemFs::new());
        assert!(run(&ctx, Path::new("/proj"), true).is_err());
    }
}
