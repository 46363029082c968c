//! Replaying adapters that replay recorded interactions.

pub mod fetch;
pub mod shell;

pub use fetch::ReplayingFetcher;
pub use shell::ReplayingShellExecutor;

use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;

use crate::cassette::replayer::CassetteReplayer;

/// Pull the next recorded output for `port::method`.
///
/// # Panics
///
/// Panics when no replayer is configured or the cassette is exhausted; a
/// replay that diverges from its recording is a test bug, not a runtime
/// condition.
pub(crate) fn next_output(
    replayer: Option<&Arc<Mutex<CassetteReplayer>>>,
    port: &str,
    method: &str,
) -> serde_json::Value {
    let replayer = replayer.unwrap_or_else(|| {
        panic!("{port} port has no cassette loaded; cannot replay {port}::{method}")
    });
    let mut guard = replayer.lock().expect("replayer lock poisoned");
    guard.next_interaction(port, method).output
}

/// Decode an ok/err recorded output back into a `Result`.
///
/// Mirror of `recording::record_result`.
pub(crate) fn replay_result<T: DeserializeOwned>(
    output: serde_json::Value,
) -> Result<T, Box<dyn std::error::Error + Send + Sync>> {
    if let Some(err) = output.get("err") {
        let msg = err.as_str().unwrap_or("unknown error").to_string();
        return Err(msg.into());
    }
    let value = output.get("ok").cloned().unwrap_or(output);
    serde_json::from_value(value).map_err(|e| format!("malformed cassette output: {e}").into())
}
