//! Error taxonomy for the patching pipeline.

use std::path::PathBuf;

/// Errors raised while resolving, checking, or applying patches.
///
/// `Configuration` and `Resolver` errors always abort the run. `Fetch` and
/// `Application` errors are per patch; whether they abort depends on the
/// `exit-on-patch-failure` option.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    /// A manifest, patches file, or configuration value is malformed.
    #[error("invalid configuration in {source_name}: {message}")]
    Configuration {
        /// Where the bad value came from (file path, option name, package).
        source_name: String,
        /// What was wrong with it.
        message: String,
    },

    /// A registered resolver provider returned an unusable response.
    #[error("resolver provider '{provider}' returned an invalid response: {message}")]
    Resolver {
        /// Name of the offending provider.
        provider: String,
        /// What was wrong with the response.
        message: String,
    },

    /// A patch payload could not be retrieved.
    #[error("could not fetch patch '{description}' for {package} from {url}: {message}")]
    Fetch {
        /// Package the patch targets.
        package: String,
        /// Patch description.
        description: String,
        /// Remote URL or local path that failed.
        url: String,
        /// Underlying failure.
        message: String,
    },

    /// No configured strip-level could apply the patch.
    #[error("cannot apply patch '{description}' ({url}) to {package}: tried {levels}")]
    Application {
        /// Package the patch targets.
        package: String,
        /// Patch description.
        description: String,
        /// Remote URL or local path of the patch.
        url: String,
        /// The strip-levels that were attempted, space separated.
        levels: String,
    },

    /// Host metadata (project, lock, or installed repository) could not be
    /// read or written.
    #[error("failed to access {}: {message}", path.display())]
    Metadata {
        /// File that could not be accessed.
        path: PathBuf,
        /// Underlying failure.
        message: String,
    },
}

impl PatchError {
    /// Shorthand for building a [`PatchError::Configuration`].
    pub fn configuration(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration { source_name: source_name.into(), message: message.into() }
    }

    /// Returns `true` for errors scoped to a single patch (fetch or apply).
    #[must_use]
    pub fn is_per_patch(&self) -> bool {
        matches!(self, Self::Fetch { .. } | Self::Application { .. })
    }
}
