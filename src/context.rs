//! Service context bundling all port trait objects.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::adapters::live::fetch::LiveFetcher;
use crate::adapters::live::filesystem::LiveFileSystem;
use crate::adapters::live::shell::LiveShellExecutor;
use crate::adapters::recording::{RecordingFetcher, RecordingShellExecutor};
use crate::adapters::replaying::{ReplayingFetcher, ReplayingShellExecutor};
use crate::cassette::format::Cassette;
use crate::cassette::replayer::CassetteReplayer;
use crate::cassette::session::RecordingSession;
use crate::ports::fetch::PatchFetcher;
use crate::ports::filesystem::FileSystem;
use crate::ports::shell::ShellExecutor;

/// Bundles all port trait objects into a single context.
///
/// Each field provides access to one external boundary. Constructors
/// wire up different adapter implementations (live, replaying, recording).
pub struct ServiceContext {
    /// Filesystem for host metadata, local patches, and reports.
    pub fs: Box<dyn FileSystem>,
    /// Shell executor the patch tool runs through.
    pub shell: Box<dyn ShellExecutor>,
    /// Downloader for remote patches.
    pub fetcher: Box<dyn PatchFetcher>,
}

impl ServiceContext {
    /// Creates a context from explicit adapters.
    #[must_use]
    pub fn new(
        fs: Box<dyn FileSystem>,
        shell: Box<dyn ShellExecutor>,
        fetcher: Box<dyn PatchFetcher>,
    ) -> Self {
        Self { fs, shell, fetcher }
    }

    /// Creates a live context with real disk, `sh`, and HTTP adapters.
    #[must_use]
    pub fn live() -> Self {
        Self::new(Box::new(LiveFileSystem), Box::new(LiveShellExecutor), Box::new(LiveFetcher::new()))
    }

    /// Creates a live context whose shell and fetch calls are recorded into
    /// per-port cassettes under `dir`.
    ///
    /// Drop the context before calling [`RecordingSession::finish`].
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette directory cannot be created.
    pub fn recording_at(dir: PathBuf) -> Result<(Self, RecordingSession), String> {
        let session = RecordingSession::new(dir)?;
        let ctx = Self::new(
            Box::new(LiveFileSystem),
            Box::new(RecordingShellExecutor::new(
                Box::new(LiveShellExecutor),
                Arc::clone(&session.shell),
            )),
            Box::new(RecordingFetcher::new(Box::new(LiveFetcher::new()), Arc::clone(&session.fetch))),
        );
        Ok((ctx, session))
    }

    /// Creates a context that replays shell and fetch calls from a cassette
    /// file, or from a recording session directory, while using the real
    /// filesystem.
    ///
    /// Both ports share one replayer; each `port::method` pair keeps its own
    /// cursor.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette cannot be read or parsed.
    pub fn replaying(path: &Path) -> Result<Self, String> {
        let cassette = if path.is_dir() { Cassette::load_dir(path)? } else { Cassette::load(path)? };
        let replayer = Arc::new(Mutex::new(CassetteReplayer::new(&cassette)));
        Ok(Self::new(
            Box::new(LiveFileSystem),
            Box::new(ReplayingShellExecutor::new(Arc::clone(&replayer))),
            Box::new(ReplayingFetcher::new(replayer)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cassette::format::Interaction;
    use chrono::Utc;
    use serde_json::json;

    #[tokio::test]
    async fn replaying_context_serves_both_ports() {
        let dir = std::env::temp_dir().join("pkgpatch_ctx_test_replay");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("session.cassette.yaml");

        let cassette = Cassette {
            name: "test".into(),
            recorded_at: Utc::now(),
            tool_version: "0.1.0".into(),
            interactions: vec![
                Interaction {
                    seq: 0,
                    port: "fetch".into(),
                    method: "fetch".into(),
                    input: json!({"url": "https://example.com/a.patch"}),
                    output: json!({"ok": "diff body"}),
                },
                Interaction {
                    seq: 1,
                    port: "shell".into(),
                    method: "run".into(),
                    input: json!({"command": "patch -p1"}),
                    output: json!({"ok": {"exit_code": 0, "stdout": "", "stderr": ""}}),
                },
            ],
        };
        std::fs::write(&path, serde_yaml::to_string(&cassette).unwrap()).unwrap();

        let ctx = ServiceContext::replaying(&path).unwrap();
        assert_eq!(ctx.fetcher.fetch("https://example.com/a.patch").await.unwrap(), "diff body");
        assert!(ctx.shell.run("patch -p1").unwrap().success());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn replaying_missing_cassette_is_error() {
        let result = ServiceContext::replaying(Path::new("/no/such/cassette.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn recording_context_finishes_after_drop() {
        let base = std::env::temp_dir().join("pkgpatch_ctx_test_record");
        let _ = std::fs::remove_dir_all(&base);

        let (ctx, session) = ServiceContext::recording_at(base.clone()).unwrap();
        assert!(ctx.shell.run("true").unwrap().success());
        drop(ctx);

        let dir = session.finish().unwrap();
        let shell = Cassette::load(&dir.join("shell.cassette.yaml")).unwrap();
        assert_eq!(shell.interactions.len(), 1);

        let _ = std::fs::remove_dir_all(&base);
    }
}
