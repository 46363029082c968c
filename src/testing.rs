//! In-memory port fakes shared by unit tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::adapters::replaying::{ReplayingFetcher, ReplayingShellExecutor};
use crate::context::ServiceContext;
use crate::ports::{FetchFuture, FileSystem, PatchFetcher, ShellExecutor, ShellOutput};

/// In-memory filesystem; clones share the same files.
#[derive(Clone, Default)]
pub(crate) struct MemFs {
    files: Arc<Mutex<HashMap<PathBuf, String>>>,
}

impl MemFs {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&self, path: impl Into<PathBuf>, contents: &str) {
        self.files.lock().unwrap().insert(path.into(), contents.to_string());
    }

    pub(crate) fn get(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files.lock().unwrap().get(path.as_ref()).cloned()
    }
}

impl FileSystem for MemFs {
    fn read_to_string(
        &self,
        path: &Path,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        self.get(path).ok_or_else(|| format!("File not found: {}", path.display()).into())
    }

    fn write(
        &self,
        path: &Path,
        contents: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.insert(path, contents);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        let files = self.files.lock().unwrap();
        // Check exact path or if any file is "under" this directory.
        files.contains_key(path) || files.keys().any(|k| k.starts_with(path) && k != path)
    }

    fn remove_file(&self, path: &Path) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.files
            .lock()
            .unwrap()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| format!("File not found: {}", path.display()).into())
    }

    fn remove_dir_all(&self, path: &Path) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.files.lock().unwrap().retain(|k, _| !k.starts_with(path));
        Ok(())
    }
}

/// Shell fake that logs commands and answers with a scripted exit code.
#[derive(Clone)]
pub(crate) struct ScriptedShell {
    commands: Arc<Mutex<Vec<String>>>,
    responder: Arc<dyn Fn(&str) -> i32 + Send + Sync>,
}

impl ScriptedShell {
    pub(crate) fn new(responder: impl Fn(&str) -> i32 + Send + Sync + 'static) -> Self {
        Self { commands: Arc::default(), responder: Arc::new(responder) }
    }

    /// Every command run so far, in order.
    pub(crate) fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

impl ShellExecutor for ScriptedShell {
    fn run(&self, command: &str) -> Result<ShellOutput, Box<dyn std::error::Error + Send + Sync>> {
        self.commands.lock().unwrap().push(command.to_string());
        let exit_code = (self.responder)(command);
        Ok(ShellOutput {
            exit_code,
            stdout: String::new(),
            stderr: if exit_code == 0 { String::new() } else { "Hunk #1 FAILED".to_string() },
        })
    }
}

/// Fetcher fake serving fixed bodies; unknown urls fail like a 404.
#[derive(Clone, Default)]
pub(crate) struct StubFetcher {
    bodies: Arc<HashMap<String, String>>,
}

impl StubFetcher {
    pub(crate) fn with(bodies: &[(&str, &str)]) -> Self {
        Self {
            bodies: Arc::new(
                bodies.iter().map(|(url, body)| ((*url).to_string(), (*body).to_string())).collect(),
            ),
        }
    }
}

impl PatchFetcher for StubFetcher {
    fn fetch(&self, url: &str) -> FetchFuture<'_> {
        let result = self
            .bodies
            .get(url)
            .cloned()
            .ok_or_else(|| format!("{url} answered with HTTP 404").into());
        Box::pin(async move { result })
    }
}

impl ServiceContext {
    /// Context over an in-memory filesystem; shell and fetch panic if used.
    pub(crate) fn in_memory(fs: MemFs) -> Self {
        Self::new(
            Box::new(fs),
            Box::new(ReplayingShellExecutor::unconfigured()),
            Box::new(ReplayingFetcher::unconfigured()),
        )
    }
}
