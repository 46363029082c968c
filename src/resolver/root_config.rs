//! Resolver for patches declared in the root project's `extra.patches`.

use super::{ResolveContext, Resolver};
use crate::error::PatchError;
use crate::patch::{parse_manifest, PatchCollection};
use crate::project::PROJECT_FILE;

/// Reads the root project's own patch manifest.
pub struct RootConfigResolver;

impl RootConfigResolver {
    /// Identifier used in `disable-resolvers`.
    pub const ID: &'static str = "root-config";
}

impl Resolver for RootConfigResolver {
    fn id(&self) -> &str {
        Self::ID
    }

    fn resolve(
        &self,
        collection: &mut PatchCollection,
        ctx: &ResolveContext<'_>,
    ) -> Result<(), PatchError> {
        let Some(declared) = ctx.root.declared_patches() else {
            return Ok(());
        };
        let manifest = parse_manifest(declared, &format!("{PROJECT_FILE} extra.patches"))?;
        manifest.add_to(collection, Self::ID);
        Ok(())
    }
}
