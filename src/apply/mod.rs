//! Patch application: fetches each resolved patch, applies it to a package's
//! installed tree, and records what was applied.

pub mod events;
pub mod patcher;

pub use events::{EventDispatcher, PatchEvent, PatchListener};

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::context::ServiceContext;
use crate::error::PatchError;
use crate::patch::Patch;
use crate::ports::FileSystem;
use crate::project::{AppliedPatches, Package};

/// Name of the per-package report written next to patched files.
pub const REPORT_FILE: &str = "PATCHES.txt";

/// What happened to one package's patches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// Patches that applied, `description -> url`.
    pub applied: AppliedPatches,
    /// Descriptions of patches that failed and were skipped.
    pub failed: Vec<String>,
}

/// Applies resolved patches to installed packages.
pub struct PatchApplier<'a> {
    ctx: &'a ServiceContext,
    config: &'a Config,
    project_dir: &'a Path,
    events: &'a EventDispatcher,
}

impl<'a> PatchApplier<'a> {
    /// Creates an applier; local patch paths resolve against `project_dir`.
    #[must_use]
    pub fn new(
        ctx: &'a ServiceContext,
        config: &'a Config,
        project_dir: &'a Path,
        events: &'a EventDispatcher,
    ) -> Self {
        Self { ctx, config, project_dir, events }
    }

    /// Applies `patches` to `package` in order, then records the ones that
    /// succeeded under the package's `patches_applied` metadata.
    ///
    /// A failing patch is logged and skipped unless `exit-on-patch-failure`
    /// is set, in which case the error is returned, no later patch is
    /// attempted, and the patches applied so far are still recorded.
    ///
    /// # Errors
    ///
    /// Returns the first [`PatchError::Fetch`] or [`PatchError::Application`]
    /// when `exit-on-patch-failure` is enabled.
    pub async fn apply_package(
        &self,
        package: &mut Package,
        install_path: &Path,
        patches: &[Patch],
    ) -> Result<ApplyOutcome, PatchError> {
        if patches.is_empty() {
            tracing::debug!(package = %package.name, "no patches to apply");
            return Ok(ApplyOutcome::default());
        }

        tracing::info!(package = %package.name, count = patches.len(), "applying patches");
        let mut outcome = ApplyOutcome::default();
        for patch in patches {
            self.events.dispatch(&PatchEvent::PreApply { patch });
            match self.apply_patch(patch, install_path).await {
                Ok(level) => {
                    tracing::info!(package = %patch.package, level, "applied '{}'", patch.description);
                    self.events.dispatch(&PatchEvent::PostApply { patch, level: &level });
                    outcome.applied.insert(patch.description.clone(), patch.url.clone());
                }
                Err(error) => {
                    tracing::error!(package = %patch.package, "{error}");
                    self.events.dispatch(&PatchEvent::ApplyFailed { patch, error: &error });
                    if self.config.exit_on_patch_failure {
                        self.record(package, install_path, patches, &outcome.applied);
                        return Err(error);
                    }
                    outcome.failed.push(patch.description.clone());
                }
            }
        }

        self.record(package, install_path, patches, &outcome.applied);
        Ok(outcome)
    }

    /// Stores what reached the tree, so the record matches the files even
    /// when the run aborts part way through a package.
    fn record(
        &self,
        package: &mut Package,
        install_path: &Path,
        patches: &[Patch],
        applied: &AppliedPatches,
    ) {
        package.set_patches_applied(applied);
        if !applied.is_empty() {
            self.write_report(install_path, patches, applied);
        }
    }

    async fn apply_patch(&self, patch: &Patch, install_path: &Path) -> Result<String, PatchError> {
        let file = self.materialize(patch).await?;
        let levels = &self.config.patch_levels;
        let level = patcher::apply_with_levels(
            self.ctx.shell.as_ref(),
            install_path,
            file.path(),
            levels,
        )
        .map(ToString::to_string);
        file.discard(self.ctx.fs.as_ref());

        level.ok_or_else(|| PatchError::Application {
            package: patch.package.clone(),
            description: patch.description.clone(),
            url: patch.url.clone(),
            levels: levels.join(" "),
        })
    }

    /// Makes the patch available as a file on disk.
    async fn materialize(&self, patch: &Patch) -> Result<PatchFile, PatchError> {
        let fetch_error = |message: String| PatchError::Fetch {
            package: patch.package.clone(),
            description: patch.description.clone(),
            url: patch.url.clone(),
            message,
        };

        if !patch.is_remote() {
            // The tool resolves `-i` after changing into the install dir.
            let path = std::path::absolute(self.project_dir.join(&patch.url))
                .map_err(|e| fetch_error(e.to_string()))?;
            if !self.ctx.fs.exists(&path) {
                return Err(fetch_error(format!("{} does not exist", path.display())));
            }
            return Ok(PatchFile::Local(path));
        }

        tracing::debug!(url = %patch.url, "downloading patch");
        let body = self.ctx.fetcher.fetch(&patch.url).await.map_err(|e| fetch_error(e.to_string()))?;
        let path = std::env::temp_dir().join(format!("pkgpatch-{}.patch", uuid::Uuid::new_v4()));
        self.ctx.fs.write(&path, &body).map_err(|e| fetch_error(e.to_string()))?;
        Ok(PatchFile::Downloaded(path))
    }

    fn write_report(&self, install_path: &Path, patches: &[Patch], applied: &AppliedPatches) {
        let mut report = String::from(
            "This file was automatically generated by pkgpatch.\nPatches applied to this directory:\n\n",
        );
        for patch in patches.iter().filter(|p| applied.contains_key(&p.description)) {
            report.push_str(&format!("{}\nSource: {}\n\n", patch.description, patch.url));
        }
        let path = install_path.join(REPORT_FILE);
        if let Err(e) = self.ctx.fs.write(&path, &report) {
            tracing::warn!(path = %path.display(), "could not write patch report: {e}");
        }
    }
}

enum PatchFile {
    Local(PathBuf),
    Downloaded(PathBuf),
}

impl PatchFile {
    fn path(&self) -> &Path {
        match self {
            Self::Local(path) | Self::Downloaded(path) => path,
        }
    }

    fn discard(self, fs: &dyn FileSystem) {
        if let Self::Downloaded(path) = self {
            if let Err(e) = fs.remove_file(&path) {
                tracing::debug!(path = %path.display(), "could not remove downloaded patch: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemFs, ScriptedShell, StubFetcher};
    use std::sync::{Arc, Mutex};

    struct Harness {
        fs: MemFs,
        shell: ScriptedShell,
        ctx: ServiceContext,
        events: EventDispatcher,
        seen: Arc<Mutex<Vec<String>>>,
    }

    fn harness(responder: impl Fn(&str) -> i32 + Send + Sync + 'static, remote: &[(&str, &str)]) -> Harness {
        let fs = MemFs::new();
        fs.insert("/proj/patches/one.patch", "--- a\n+++ b\n");
        fs.insert("/proj/patches/two.patch", "--- a\n+++ b\n");
        let shell = ScriptedShell::new(responder);
        let ctx = ServiceContext::new(
            Box::new(fs.clone()),
            Box::new(shell.clone()),
            Box::new(StubFetcher::with(remote)),
        );

        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut events = EventDispatcher::new();
        let sink = Arc::clone(&seen);
        events.add_listener(Box::new(move |event: &PatchEvent<'_>| {
            sink.lock().unwrap().push(format!("{}:{}", event.name(), event.patch().description));
        }));
        Harness { fs, shell, ctx, events, seen }
    }

    fn patches() -> Vec<Patch> {
        vec![
            Patch::new("my/pkg", "first fix", "patches/one.patch", "root-config"),
            Patch::new("my/pkg", "second fix", "patches/two.patch", "root-config"),
        ]
    }

    #[tokio::test]
    async fn falls_back_to_later_level() {
        let h = harness(|cmd| if cmd.contains("'-p0'") { 0 } else { 1 }, &[]);
        let config = Config::default();
        let applier = PatchApplier::new(&h.ctx, &config, Path::new("/proj"), &h.events);
        let mut package = Package::new("my/pkg", "1.0.0");

        let outcome =
            applier.apply_package(&mut package, Path::new("/proj/vendor/my/pkg"), &patches()[..1]).await.unwrap();

        assert_eq!(outcome.applied.get("first fix").map(String::as_str), Some("patches/one.patch"));
        assert!(h.shell.commands().iter().all(|c| !c.contains("'-p2'")));
        assert_eq!(package.patches_applied(), Some(outcome.applied));
        assert_eq!(
            *h.seen.lock().unwrap(),
            vec!["pre-patch-apply:first fix", "post-patch-apply:first fix"]
        );
    }

    #[tokio::test]
    async fn failure_is_skipped_when_not_fatal() {
        let h = harness(|cmd| i32::from(cmd.contains("one.patch")), &[]);
        let config = Config { exit_on_patch_failure: false, ..Config::default() };
        let applier = PatchApplier::new(&h.ctx, &config, Path::new("/proj"), &h.events);
        let mut package = Package::new("my/pkg", "1.0.0");

        let outcome =
            applier.apply_package(&mut package, Path::new("/proj/vendor/my/pkg"), &patches()).await.unwrap();

        assert_eq!(outcome.failed, vec!["first fix"]);
        let applied = package.patches_applied().unwrap();
        assert_eq!(applied.len(), 1);
        assert!(applied.contains_key("second fix"));
        assert!(h.seen.lock().unwrap().contains(&"patch-apply-failed:first fix".to_string()));

        // The next package is still patched.
        let mut other = Package::new("other/pkg", "1.0.0");
        let later = [Patch::new("other/pkg", "later fix", "patches/two.patch", "root-config")];
        let outcome =
            applier.apply_package(&mut other, Path::new("/proj/vendor/other/pkg"), &later).await.unwrap();
        assert!(outcome.applied.contains_key("later fix"));
        assert!(h.shell.commands().iter().any(|c| c.contains("vendor/other/pkg")));
    }

    #[tokio::test]
    async fn failure_aborts_when_fatal() {
        let h = harness(|cmd| i32::from(cmd.contains("one.patch")), &[]);
        let config = Config { exit_on_patch_failure: true, ..Config::default() };
        let applier = PatchApplier::new(&h.ctx, &config, Path::new("/proj"), &h.events);
        let mut package = Package::new("my/pkg", "1.0.0");

        let err = applier
            .apply_package(&mut package, Path::new("/proj/vendor/my/pkg"), &patches())
            .await
            .unwrap_err();

        assert!(matches!(err, PatchError::Application { ref description, .. } if description == "first fix"));
        assert!(h.shell.commands().iter().all(|c| !c.contains("two.patch")));
        assert!(package.patches_applied().unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn abort_keeps_record_of_earlier_patches() {
        let h = harness(|cmd| i32::from(cmd.contains("two.patch")), &[]);
        let config = Config::default();
        let applier = PatchApplier::new(&h.ctx, &config, Path::new("/proj"), &h.events);
        let mut package = Package::new("my/pkg", "1.0.0");

        let result =
            applier.apply_package(&mut package, Path::new("/proj/vendor/my/pkg"), &patches()).await;
        assert!(result.is_err());

        let applied = package.patches_applied().unwrap();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied.get("first fix").map(String::as_str), Some("patches/one.patch"));
        let report = h.fs.get("/proj/vendor/my/pkg/PATCHES.txt").unwrap();
        assert!(report.contains("first fix") && !report.contains("second fix"));
    }

    #[tokio::test]
    async fn local_patch_path_is_absolute_for_relative_project() {
        let cwd = std::env::current_dir().unwrap();
        let h = harness(|_| 0, &[]);
        h.fs.insert(cwd.join("rel-proj/patches/one.patch"), "--- a\n+++ b\n");
        let config = Config::default();
        let applier = PatchApplier::new(&h.ctx, &config, Path::new("rel-proj"), &h.events);
        let mut package = Package::new("my/pkg", "1.0.0");

        applier
            .apply_package(&mut package, Path::new("rel-proj/vendor/my/pkg"), &patches()[..1])
            .await
            .unwrap();

        let expected = cwd.join("rel-proj/patches/one.patch");
        let command = &h.shell.commands()[0];
        assert!(command.contains(&format!("-i '{}'", expected.display())), "{command}");
    }

    #[tokio::test]
    async fn missing_local_file_is_fetch_error() {
        let h = harness(|_| 0, &[]);
        let config = Config { exit_on_patch_failure: true, ..Config::default() };
        let applier = PatchApplier::new(&h.ctx, &config, Path::new("/proj"), &h.events);
        let mut package = Package::new("my/pkg", "1.0.0");
        let missing = [Patch::new("my/pkg", "gone", "patches/gone.patch", "root-config")];

        let err = applier.apply_package(&mut package, Path::new("/v"), &missing).await.unwrap_err();
        assert!(matches!(err, PatchError::Fetch { .. }));
        assert!(h.shell.commands().is_empty());
    }

    #[tokio::test]
    async fn remote_patch_is_downloaded_then_removed() {
        let url = "https://example.com/fix.patch";
        let h = harness(|_| 0, &[(url, "--- a\n+++ b\n")]);
        let config = Config::default();
        let applier = PatchApplier::new(&h.ctx, &config, Path::new("/proj"), &h.events);
        let mut package = Package::new("my/pkg", "1.0.0");
        let remote = [Patch::new("my/pkg", "upstream fix", url, "root-config")];

        let outcome = applier.apply_package(&mut package, Path::new("/v"), &remote).await.unwrap();
        assert!(outcome.failed.is_empty());

        let command = &h.shell.commands()[0];
        let start = command.rfind("-i '").unwrap() + 4;
        let temp = &command[start..command.len() - 1];
        assert!(temp.contains("pkgpatch-"));
        assert_eq!(h.fs.get(temp), None);
    }

    #[tokio::test]
    async fn report_lists_applied_patches() {
        let h = harness(|_| 0, &[]);
        let config = Config::default();
        let applier = PatchApplier::new(&h.ctx, &config, Path::new("/proj"), &h.events);
        let mut package = Package::new("my/pkg", "1.0.0");

        applier.apply_package(&mut package, Path::new("/proj/vendor/my/pkg"), &patches()).await.unwrap();

        let report = h.fs.get("/proj/vendor/my/pkg/PATCHES.txt").unwrap();
        assert!(report.contains("first fix\nSource: patches/one.patch"));
        assert!(report.contains("second fix\nSource: patches/two.patch"));
    }

    #[tokio::test]
    async fn empty_patch_list_leaves_package_alone() {
        let h = harness(|_| 0, &[]);
        let config = Config::default();
        let applier = PatchApplier::new(&h.ctx, &config, Path::new("/proj"), &h.events);
        let mut package = Package::new("my/pkg", "1.0.0");

        let outcome = applier.apply_package(&mut package, Path::new("/v"), &[]).await.unwrap();
        assert_eq!(outcome, ApplyOutcome::default());
        assert_eq!(package.patches_applied(), None);
        assert!(h.shell.commands().is_empty());
    }
}
