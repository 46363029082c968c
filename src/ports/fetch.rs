//! Fetcher port for downloading remote patch payloads.

use std::error::Error;
use std::future::Future;
use std::pin::Pin;

/// Boxed future type alias used by [`PatchFetcher`] to keep the trait dyn-compatible.
pub type FetchFuture<'a> =
    Pin<Box<dyn Future<Output = Result<String, Box<dyn Error + Send + Sync>>> + Send + 'a>>;

/// Downloads patch payloads from remote URLs.
///
/// Local patch paths never reach this port; they are read through the
/// filesystem port instead.
pub trait PatchFetcher: Send + Sync {
    /// Fetches the body at `url` as text.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server answers with a
    /// non-success status.
    fn fetch(&self, url: &str) -> FetchFuture<'_>;
}
