//! Live adapter for the `PatchFetcher` port using HTTP.

use reqwest::Client;

use crate::ports::fetch::{FetchFuture, PatchFetcher};

const USER_AGENT: &str = concat!("pkgpatch/", env!("CARGO_PKG_VERSION"));

/// Live fetcher that downloads patches over HTTP(S).
pub struct LiveFetcher {
    client: Client,
}

impl LiveFetcher {
    /// Creates a new live fetcher.
    #[must_use]
    pub fn new() -> Self {
        Self { client: Client::new() }
    }
}

impl Default for LiveFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl PatchFetcher for LiveFetcher {
    fn fetch(&self, url: &str) -> FetchFuture<'_> {
        let url = url.to_string();

        Box::pin(async move {
            tracing::debug!(%url, "downloading patch");
            let response = self
                .client
                .get(&url)
                .header(reqwest::header::USER_AGENT, USER_AGENT)
                .send()
                .await
                .map_err(|e| -> Box<dyn std::error::Error + Send + Sync> {
                    format!("request to {url} failed: {e}").into()
                })?;

            let status = response.status();
            if !status.is_success() {
                return Err(format!("{url} answered with HTTP {}", status.as_u16()).into());
            }

            response.text().await.map_err(|e| -> Box<dyn std::error::Error + Send + Sync> {
                format!("failed to read body of {url}: {e}").into()
            })
        })
    }
}
