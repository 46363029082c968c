//! Resolver for patches that locked dependencies declare in their own
//! `extra.patches`.

use super::{ResolveContext, Resolver};
use crate::error::PatchError;
use crate::patch::{merge_manifests, parse_manifest, PatchCollection, PatchManifest};

/// Deep-merges every locked package's declared patches.
///
/// Packages are merged in lock order; a later package overrides an earlier
/// one only for the same target package and description. Packages listed in
/// `ignore-dependency-patches` are skipped.
pub struct DependenciesResolver;

impl DependenciesResolver {
    /// Identifier used in `disable-resolvers`.
    pub const ID: &'static str = "dependencies";
}

impl Resolver for DependenciesResolver {
    fn id(&self) -> &str {
        Self::ID
    }

    fn resolve(
        &self,
        collection: &mut PatchCollection,
        ctx: &ResolveContext<'_>,
    ) -> Result<(), PatchError> {
        let mut merged = PatchManifest::new();
        for package in ctx.locked {
            let Some(declared) = package.declared_patches() else {
                continue;
            };
            if ctx.config.ignore_dependency_patches.iter().any(|name| *name == package.name) {
                tracing::debug!(package = %package.name, "ignoring patches declared by dependency");
                continue;
            }
            let manifest = parse_manifest(declared, &format!("{} extra.patches", package.name))?;
            merged = merge_manifests(merged, &manifest);
        }
        merged.add_to(collection, Self::ID);
        Ok(())
    }
}
