//! Resolver for an external patches file named by `patches-file`.

use serde_json::Value;

use super::{ResolveContext, Resolver};
use crate::error::PatchError;
use crate::patch::{parse_manifest, PatchCollection};

/// Loads a manifest from the configured patches file.
///
/// The file holds either the manifest itself or an object with the manifest
/// under a top-level `patches` key.
pub struct PatchesFileResolver;

impl PatchesFileResolver {
    /// Identifier used in `disable-resolvers`.
    pub const ID: &'static str = "patches-file";
}

impl Resolver for PatchesFileResolver {
    fn id(&self) -> &str {
        Self::ID
    }

    fn resolve(
        &self,
        collection: &mut PatchCollection,
        ctx: &ResolveContext<'_>,
    ) -> Result<(), PatchError> {
        let Some(file) = &ctx.config.patches_file else {
            return Ok(());
        };
        let path = ctx.project_dir.join(file);
        let source = path.display().to_string();

        let contents = ctx
            .fs
            .read_to_string(&path)
            .map_err(|e| PatchError::configuration(&source, format!("cannot read patches file: {e}")))?;
        let document: Value = serde_json::from_str(&contents)
            .map_err(|e| PatchError::configuration(&source, format!("invalid JSON: {e}")))?;

        let manifest = match document.get("patches") {
            Some(inner) => parse_manifest(inner, &source)?,
            None => parse_manifest(&document, &source)?,
        };
        manifest.add_to(collection, Self::ID);
        Ok(())
    }
}
