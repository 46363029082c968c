//! Patch resolution: discovering which patches apply to which packages.
//!
//! Each [`Resolver`] inspects one provenance source and adds what it finds
//! to the session's [`PatchCollection`]. Built-in resolvers cover the root
//! project, locked dependencies, and an external patches file; embedding
//! tools contribute more through [`ResolverProvider`]s.

pub mod dependencies;
pub mod patches_file;
pub mod root_config;

pub use dependencies::DependenciesResolver;
pub use patches_file::PatchesFileResolver;
pub use root_config::RootConfigResolver;

use std::collections::HashSet;
use std::path::Path;

use crate::config::Config;
use crate::error::PatchError;
use crate::patch::PatchCollection;
use crate::ports::FileSystem;
use crate::project::{Package, RootPackage};

/// Everything a resolver may inspect.
pub struct ResolveContext<'a> {
    /// The root project.
    pub root: &'a RootPackage,
    /// Packages of the lock state being installed.
    pub locked: &'a [Package],
    /// Session configuration.
    pub config: &'a Config,
    /// Project root; relative paths resolve against it.
    pub project_dir: &'a Path,
    /// Filesystem for reading manifests.
    pub fs: &'a dyn FileSystem,
}

/// Discovers patches from one provenance source.
pub trait Resolver {
    /// Stable identifier, matched against `disable-resolvers`.
    fn id(&self) -> &str;

    /// Adds every patch this source declares to `collection`.
    ///
    /// Finding nothing is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`PatchError::Configuration`] when the source is malformed.
    fn resolve(
        &self,
        collection: &mut PatchCollection,
        ctx: &ResolveContext<'_>,
    ) -> Result<(), PatchError>;
}

/// Supplies additional resolvers at resolution time.
pub trait ResolverProvider {
    /// Name used in error messages.
    fn name(&self) -> &str;

    /// Returns the resolvers this provider contributes.
    ///
    /// # Errors
    ///
    /// Any error is reported as a [`PatchError::Resolver`] naming this
    /// provider.
    fn resolvers(&self, ctx: &ResolveContext<'_>) -> Result<Vec<Box<dyn Resolver>>, PatchError>;
}

/// Built-in resolvers in execution order.
///
/// The root project runs last so its declarations override same-description
/// patches declared by dependencies or the patches file.
#[must_use]
pub fn builtin_resolvers() -> Vec<Box<dyn Resolver>> {
    vec![
        Box::new(DependenciesResolver),
        Box::new(PatchesFileResolver),
        Box::new(RootConfigResolver),
    ]
}

/// Ordered set of resolvers and providers for one session.
#[derive(Default)]
pub struct ResolverRegistry {
    resolvers: Vec<Box<dyn Resolver>>,
    providers: Vec<Box<dyn ResolverProvider>>,
}

impl ResolverRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in resolvers.
    #[must_use]
    pub fn with_builtins() -> Self {
        Self { resolvers: builtin_resolvers(), providers: Vec::new() }
    }

    /// Registers a resolver after those already present.
    ///
    /// # Errors
    ///
    /// Returns [`PatchError::Configuration`] if the id is empty or taken.
    pub fn register(&mut self, resolver: Box<dyn Resolver>) -> Result<(), PatchError> {
        let id = resolver.id();
        if id.trim().is_empty() {
            return Err(PatchError::configuration("resolvers", "resolver id must not be empty"));
        }
        if self.resolvers.iter().any(|r| r.id() == id) {
            return Err(PatchError::configuration(
                "resolvers",
                format!("resolver '{id}' is already registered"),
            ));
        }
        self.resolvers.push(resolver);
        Ok(())
    }

    /// Registers a provider; its resolvers run after all registered ones.
    pub fn register_provider(&mut self, provider: Box<dyn ResolverProvider>) {
        self.providers.push(provider);
    }

    /// Ids of directly registered resolvers, in order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.resolvers.iter().map(|r| r.id())
    }

    /// Runs every enabled resolver, then every provider's resolvers.
    ///
    /// # Errors
    ///
    /// Stops at the first resolver or provider error.
    pub fn resolve_all(
        &self,
        collection: &mut PatchCollection,
        ctx: &ResolveContext<'_>,
    ) -> Result<(), PatchError> {
        let mut seen: HashSet<String> = HashSet::new();
        for resolver in &self.resolvers {
            seen.insert(resolver.id().to_string());
            run_resolver(resolver.as_ref(), collection, ctx)?;
        }

        for provider in &self.providers {
            let name = provider.name();
            let resolvers = provider.resolvers(ctx).map_err(|e| PatchError::Resolver {
                provider: name.to_string(),
                message: e.to_string(),
            })?;
            validate_provided(name, &resolvers, &mut seen)?;
            tracing::debug!(provider = name, count = resolvers.len(), "provider supplied resolvers");
            for resolver in &resolvers {
                run_resolver(resolver.as_ref(), collection, ctx)?;
            }
        }
        Ok(())
    }
}

fn run_resolver(
    resolver: &dyn Resolver,
    collection: &mut PatchCollection,
    ctx: &ResolveContext<'_>,
) -> Result<(), PatchError> {
    let id = resolver.id();
    if ctx.config.is_resolver_disabled(id) {
        tracing::debug!(resolver = id, "resolver disabled; skipping");
        return Ok(());
    }
    let before = collection.len();
    resolver.resolve(collection, ctx)?;
    tracing::debug!(resolver = id, total = collection.len(), before, "resolver finished");
    Ok(())
}

fn validate_provided(
    provider: &str,
    resolvers: &[Box<dyn Resolver>],
    seen: &mut HashSet<String>,
) -> Result<(), PatchError> {
    for resolver in resolvers {
        let id = resolver.id();
        if id.trim().is_empty() {
            return Err(PatchError::Resolver {
                provider: provider.to_string(),
                message: "returned a resolver with an empty id".to_string(),
            });
        }
        if !seen.insert(id.to_string()) {
            return Err(PatchError::Resolver {
                provider: provider.to_string(),
                message: format!("returned resolver '{id}', which is already registered"),
            });
        }
    }
    Ok(())
}
