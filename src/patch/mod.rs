//! Patch entities and the per-session collection that indexes them.

pub mod collection;
pub mod manifest;

pub use collection::PatchCollection;
pub use manifest::{merge_manifests, parse_manifest, PatchManifest};

use serde::{Deserialize, Serialize};

/// A single source-level modification targeting one package.
///
/// Created by a resolver during resolution and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patch {
    /// Name of the package the patch applies to.
    pub package: String,
    /// Remote URL or local filesystem path of the diff.
    pub url: String,
    /// Human description; unique within one package's patch set.
    pub description: String,
    /// Id of the resolver that produced this patch.
    pub resolver: String,
}

impl Patch {
    /// Creates a patch for `package`.
    pub fn new(
        package: impl Into<String>,
        description: impl Into<String>,
        url: impl Into<String>,
        resolver: impl Into<String>,
    ) -> Self {
        Self {
            package: package.into(),
            url: url.into(),
            description: description.into(),
            resolver: resolver.into(),
        }
    }

    /// Returns `true` when the URL points at a remote resource rather than
    /// a local path.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        self.url.starts_with("http://") || self.url.starts_with("https://")
    }
}
