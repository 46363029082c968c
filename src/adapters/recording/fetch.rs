//! Recording adapter for the `PatchFetcher` port.

use std::sync::{Arc, Mutex};

use serde::Serialize;

use super::record_result;
use crate::cassette::recorder::CassetteRecorder;
use crate::ports::{FetchFuture, PatchFetcher};

/// Records downloads while delegating to an inner fetcher.
pub struct RecordingFetcher {
    inner: Box<dyn PatchFetcher>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingFetcher {
    /// Creates a new recording fetcher wrapping the given implementation.
    pub fn new(inner: Box<dyn PatchFetcher>, recorder: Arc<Mutex<CassetteRecorder>>) -> Self {
        Self { inner, recorder }
    }
}

#[derive(Serialize)]
struct FetchInput {
    url: String,
}

impl PatchFetcher for RecordingFetcher {
    fn fetch(&self, url: &str) -> FetchFuture<'_> {
        let input = FetchInput { url: url.to_string() };

        Box::pin(async move {
            let result = self.inner.fetch(&input.url).await;
            record_result(&self.recorder, "fetch", "fetch", &input, &result);
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticFetcher;

    impl PatchFetcher for StaticFetcher {
        fn fetch(&self, url: &str) -> FetchFuture<'_> {
            let body = format!("--- a/{url}\n");
            Box::pin(async move { Ok(body) })
        }
    }

    #[tokio::test]
    async fn records_fetched_body() {
        let dir = std::env::temp_dir().join("pkgpatch_rec_fetch_test");
        std::fs::create_dir_all(&dir).unwrap();
        let cassette_path = dir.join("fetch.cassette.yaml");
        let recorder = Arc::new(Mutex::new(CassetteRecorder::new(&cassette_path, "test")));

        {
            let fetcher = RecordingFetcher::new(Box::new(StaticFetcher), Arc::clone(&recorder));
            let body = fetcher.fetch("x.patch").await.unwrap();
            assert_eq!(body, "--- a/x.patch\n");
        }

        let recorder = Arc::try_unwrap(recorder).unwrap().into_inner().unwrap();
        recorder.finish().unwrap();

        let content = std::fs::read_to_string(&cassette_path).unwrap();
        assert!(content.contains("x.patch"));
        assert!(content.contains("fetch"));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
