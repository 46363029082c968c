//! The patching session: one resolution shared by the pre-install drift
//! check and the post-install application stage.

use std::path::{Path, PathBuf};

use crate::apply::{ApplyOutcome, EventDispatcher, PatchApplier, PatchListener};
use crate::config::Config;
use crate::context::ServiceContext;
use crate::drift::{detect_drift, DriftReport};
use crate::error::PatchError;
use crate::patch::PatchCollection;
use crate::project::{InstalledRepository, Lockfile, Package, ProjectStore, RootPackage};
use crate::resolver::{ResolveContext, Resolver, ResolverProvider, ResolverRegistry};

/// Orchestrates resolution, drift detection, and application for one run.
///
/// Resolution happens at most once; both stages see the same collection.
pub struct PatchSession<'a> {
    ctx: &'a ServiceContext,
    project_dir: PathBuf,
    root: RootPackage,
    lock: Option<Lockfile>,
    config: Config,
    registry: ResolverRegistry,
    events: EventDispatcher,
    collection: PatchCollection,
    resolved: bool,
}

impl<'a> PatchSession<'a> {
    /// Creates a session with the built-in resolvers registered.
    #[must_use]
    pub fn new(
        ctx: &'a ServiceContext,
        project_dir: &Path,
        root: RootPackage,
        lock: Option<Lockfile>,
        config: Config,
    ) -> Self {
        Self {
            ctx,
            project_dir: project_dir.to_path_buf(),
            root,
            lock,
            config,
            registry: ResolverRegistry::with_builtins(),
            events: EventDispatcher::new(),
            collection: PatchCollection::new(),
            resolved: false,
        }
    }

    /// Loads the root package, lock, and configuration from `store`.
    ///
    /// # Errors
    ///
    /// Returns [`PatchError::Metadata`] for unreadable host files and
    /// [`PatchError::Configuration`] for invalid options.
    pub fn open(ctx: &'a ServiceContext, store: &ProjectStore<'_>) -> Result<Self, PatchError> {
        let root = store.load_root()?;
        let lock = store.load_lock()?;
        let config = Config::load(root.patching_options())?;
        Ok(Self::new(ctx, store.root(), root, lock, config))
    }

    /// Session configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Adds a resolver after the built-ins.
    ///
    /// # Errors
    ///
    /// Returns [`PatchError::Configuration`] if the id is empty or taken.
    pub fn register_resolver(&mut self, resolver: Box<dyn Resolver>) -> Result<(), PatchError> {
        self.registry.register(resolver)
    }

    /// Adds a provider consulted at resolution time.
    pub fn register_provider(&mut self, provider: Box<dyn ResolverProvider>) {
        self.registry.register_provider(provider);
    }

    /// Subscribes `listener` to patch lifecycle events.
    pub fn add_listener(&mut self, listener: Box<dyn PatchListener>) {
        self.events.add_listener(listener);
    }

    /// Resolves every patch once and returns the collection.
    ///
    /// Later calls return the cached result. With `disable-patching` the
    /// collection stays empty and no resolver runs.
    ///
    /// # Errors
    ///
    /// Returns the first resolver or provider error.
    pub fn resolve(&mut self) -> Result<&PatchCollection, PatchError> {
        if self.resolved {
            return Ok(&self.collection);
        }
        if self.config.disable_patching {
            tracing::debug!("patching disabled; skipping resolution");
            self.resolved = true;
            return Ok(&self.collection);
        }

        let locked = self.lock.as_ref().map_or(&[][..], |lock| lock.packages.as_slice());
        let ctx = ResolveContext {
            root: &self.root,
            locked,
            config: &self.config,
            project_dir: &self.project_dir,
            fs: self.ctx.fs.as_ref(),
        };
        let mut collection = PatchCollection::new();
        self.registry.resolve_all(&mut collection, &ctx)?;
        tracing::info!(patches = collection.len(), "resolved patches");

        self.collection = collection;
        self.resolved = true;
        Ok(&self.collection)
    }

    /// Compares `installed` against the resolved patches.
    ///
    /// Without lock state there is nothing to compare against and the report
    /// is empty.
    ///
    /// # Errors
    ///
    /// Propagates resolution errors.
    pub fn check_drift(
        &mut self,
        installed: &InstalledRepository,
    ) -> Result<DriftReport, PatchError> {
        if self.config.disable_patching {
            return Ok(DriftReport::default());
        }
        if self.lock.is_none() {
            tracing::debug!("no lock state; skipping drift check");
            return Ok(DriftReport::default());
        }
        let collection = self.resolve()?;
        let report = detect_drift(installed, collection);
        for entry in &report.entries {
            tracing::info!(package = %entry.package, kind = ?entry.kind, "patches changed; package will be reinstalled");
        }
        Ok(report)
    }

    /// Applies the resolved patches for `package`, installed at
    /// `install_path`, and records the result in its metadata.
    ///
    /// # Errors
    ///
    /// Propagates resolution errors, and fetch or application errors when
    /// `exit-on-patch-failure` is enabled.
    pub async fn apply_to_package(
        &mut self,
        package: &mut Package,
        install_path: &Path,
    ) -> Result<ApplyOutcome, PatchError> {
        if self.config.disable_patching {
            return Ok(ApplyOutcome::default());
        }
        self.resolve()?;
        let patches = self.collection.patches_for(&package.name);
        let applier = PatchApplier::new(self.ctx, &self.config, &self.project_dir, &self.events);
        applier.apply_package(package, install_path, patches).await
    }
}
