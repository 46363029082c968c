//! `pkgpatch apply` command.

use std::path::Path;

use crate::context::ServiceContext;
use crate::drift::{applied_set, classify, DriftKind};
use crate::error::PatchError;
use crate::project::{InstalledRepository, ProjectStore};
use crate::session::PatchSession;

/// Execute the `apply` command.
///
/// Patches every installed package (or only `packages`, when given) that
/// has resolved patches but no applied-patch record, then saves the
/// installed repository. Packages whose record no longer matches are left
/// alone; `pkgpatch check` has to reinstall them first.
///
/// # Errors
///
/// Returns an error string if host metadata is invalid, a named package is
/// not installed, or a patch fails while `exit-on-patch-failure` is set.
pub fn run(ctx: &ServiceContext, project_dir: &Path, packages: &[String]) -> Result<(), String> {
    let store = ProjectStore::new(ctx, project_dir);
    let mut session = PatchSession::open(ctx, &store).map_err(|e| e.to_string())?;
    let mut installed = store.load_installed().map_err(|e| e.to_string())?;

    if let Some(missing) = packages.iter().find(|name| installed.get(name).is_none()) {
        return Err(format!("Package {missing} is not installed."));
    }
    if session.config().disable_patching {
        println!("Patching is disabled.");
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start async runtime: {e}"))?;
    let result =
        runtime.block_on(apply_installed(ctx, &store, &mut session, &mut installed, packages));

    // Patches applied before a fatal failure keep their record, including
    // those of the package that failed.
    store.save_installed(&installed).map_err(|e| e.to_string())?;
    let summary = result.map_err(|e| e.to_string())?;
    println!("{summary}");
    Ok(())
}

async fn apply_installed(
    ctx: &ServiceContext,
    store: &ProjectStore<'_>,
    session: &mut PatchSession<'_>,
    installed: &mut InstalledRepository,
    selected: &[String],
) -> Result<String, PatchError> {
    let mut patched = 0;
    let mut failed = 0;
    for package in &mut installed.packages {
        if !selected.is_empty() && !selected.contains(&package.name) {
            continue;
        }

        let resolved = applied_set(session.resolve()?.patches_for(&package.name));
        match classify(package.patches_applied().as_ref(), &resolved) {
            None => {
                if !resolved.is_empty() {
                    tracing::debug!(package = %package.name, "already patched");
                }
                continue;
            }
            Some(DriftKind::NewlyPatched) => {}
            Some(kind) => {
                tracing::warn!(package = %package.name, ?kind, "applied patches are stale; run `pkgpatch check` first");
                continue;
            }
        }

        let install_path = store.install_path(package);
        if !ctx.fs.exists(&install_path) {
            tracing::warn!(package = %package.name, path = %install_path.display(), "install directory missing; skipping");
            continue;
        }

        let outcome = session.apply_to_package(package, &install_path).await?;
        patched += 1;
        failed += outcome.failed.len();
    }

    Ok(if failed == 0 {
        format!("Patched {patched} package(s).")
    } else {
        format!("Patched {patched} package(s); {failed} patch(es) failed.")
    })
}
