//! Replaying adapter for the `PatchFetcher` port.

use std::sync::{Arc, Mutex};

use super::{next_output, replay_result};
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::{FetchFuture, PatchFetcher};

/// Serves recorded downloads from a cassette.
pub struct ReplayingFetcher {
    replayer: Option<Arc<Mutex<CassetteReplayer>>>,
}

impl ReplayingFetcher {
    /// Create a replaying fetcher backed by the given replayer.
    #[must_use]
    pub fn new(replayer: Arc<Mutex<CassetteReplayer>>) -> Self {
        Self { replayer: Some(replayer) }
    }

    /// Create a replaying fetcher with no cassette. Panics when called.
    #[must_use]
    pub fn unconfigured() -> Self {
        Self { replayer: None }
    }
}

impl PatchFetcher for ReplayingFetcher {
    fn fetch(&self, _url: &str) -> FetchFuture<'_> {
        let output = next_output(self.replayer.as_ref(), "fetch", "fetch");
        Box::pin(async move { replay_result(output) })
    }
}
