//! Host project model: the root package, its lock file, and the installed
//! package repository.
//!
//! All I/O goes through `ctx.fs`. Directory layout:
//!
//! ```text
//! <root>/
//!   ├── project.json
//!   ├── project.lock
//!   └── vendor/
//!       ├── installed.json
//!       └── <vendor>/<package>/
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::context::ServiceContext;
use crate::error::PatchError;

/// File name of the root package manifest.
pub const PROJECT_FILE: &str = "project.json";
/// File name of the lock file.
pub const LOCK_FILE: &str = "project.lock";
/// Directory packages are installed into.
pub const VENDOR_DIR: &str = "vendor";
/// File name of the installed repository inside [`VENDOR_DIR`].
pub const INSTALLED_FILE: &str = "installed.json";

/// Key in a package's `extra` holding its declared patches.
pub const PATCHES_KEY: &str = "patches";
/// Key in an installed package's `extra` holding applied patches.
pub const PATCHES_APPLIED_KEY: &str = "patches_applied";

/// Applied patches for one package: description to url.
pub type AppliedPatches = BTreeMap<String, String>;

/// The project being installed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RootPackage {
    /// Project name.
    #[serde(default)]
    pub name: String,
    /// Free-form extra metadata.
    #[serde(default)]
    pub extra: Map<String, Value>,
}

impl RootPackage {
    /// The root project's declared patch manifest, if any.
    #[must_use]
    pub fn declared_patches(&self) -> Option<&Value> {
        self.extra.get(PATCHES_KEY)
    }

    /// The root project's patching options, if any.
    #[must_use]
    pub fn patching_options(&self) -> Option<&Value> {
        self.extra.get(crate::config::EXTRA_KEY)
    }
}

/// A locked or installed package.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Package {
    /// Package name, e.g. `vendor/name`.
    pub name: String,
    /// Locked version.
    #[serde(default)]
    pub version: String,
    /// Install directory relative to the project root, when not the default.
    #[serde(rename = "install-path", default, skip_serializing_if = "Option::is_none")]
    pub install_path: Option<PathBuf>,
    /// Free-form extra metadata.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl Package {
    /// Creates a package with empty metadata.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self { name: name.into(), version: version.into(), ..Self::default() }
    }

    /// The patches this package declares for other packages, if any.
    #[must_use]
    pub fn declared_patches(&self) -> Option<&Value> {
        self.extra.get(PATCHES_KEY)
    }

    /// Patches recorded as applied by a previous session.
    ///
    /// A malformed record is reported and treated as absent, which makes a
    /// patched package look dirty and forces a clean reinstall.
    #[must_use]
    pub fn patches_applied(&self) -> Option<AppliedPatches> {
        let value = self.extra.get(PATCHES_APPLIED_KEY)?;
        match serde_json::from_value(value.clone()) {
            Ok(applied) => Some(applied),
            Err(e) => {
                tracing::warn!(package = %self.name, "ignoring malformed {PATCHES_APPLIED_KEY}: {e}");
                None
            }
        }
    }

    /// Records `applied` as this package's applied patches.
    pub fn set_patches_applied(&mut self, applied: &AppliedPatches) {
        let value = applied
            .iter()
            .map(|(description, url)| (description.clone(), Value::String(url.clone())))
            .collect::<Map<String, Value>>();
        self.extra.insert(PATCHES_APPLIED_KEY.to_string(), Value::Object(value));
    }
}

/// The lock file: the package set the install will produce.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lockfile {
    /// Locked packages, in lock order.
    #[serde(default)]
    pub packages: Vec<Package>,
}

/// Packages currently on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstalledRepository {
    /// Installed packages.
    #[serde(default)]
    pub packages: Vec<Package>,
}

impl InstalledRepository {
    /// Looks up an installed package by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Package> {
        self.packages.iter().find(|p| p.name == name)
    }

    /// Looks up an installed package by name, mutably.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Package> {
        self.packages.iter_mut().find(|p| p.name == name)
    }

    /// Removes a package, returning it if it was installed.
    pub fn remove(&mut self, name: &str) -> Option<Package> {
        let index = self.packages.iter().position(|p| p.name == name)?;
        Some(self.packages.remove(index))
    }
}

/// Reads and writes host metadata for one project directory.
pub struct ProjectStore<'a> {
    ctx: &'a ServiceContext,
    root: PathBuf,
}

impl<'a> ProjectStore<'a> {
    /// Creates a store for the project at `root`.
    #[must_use]
    pub fn new(ctx: &'a ServiceContext, root: &Path) -> Self {
        Self { ctx, root: root.to_path_buf() }
    }

    /// Project root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Loads `project.json`.
    ///
    /// # Errors
    ///
    /// Returns [`PatchError::Metadata`] if the file is missing or invalid.
    pub fn load_root(&self) -> Result<RootPackage, PatchError> {
        self.read_json(&self.root.join(PROJECT_FILE))
    }

    /// Loads `project.lock`, or `None` when there is no lock yet.
    ///
    /// # Errors
    ///
    /// Returns [`PatchError::Metadata`] if the file exists but is invalid.
    pub fn load_lock(&self) -> Result<Option<Lockfile>, PatchError> {
        let path = self.root.join(LOCK_FILE);
        if !self.ctx.fs.exists(&path) {
            return Ok(None);
        }
        self.read_json(&path).map(Some)
    }

    /// Loads the installed repository; empty when nothing is installed.
    ///
    /// # Errors
    ///
    /// Returns [`PatchError::Metadata`] if the file exists but is invalid.
    pub fn load_installed(&self) -> Result<InstalledRepository, PatchError> {
        let path = self.installed_path();
        if !self.ctx.fs.exists(&path) {
            return Ok(InstalledRepository::default());
        }
        self.read_json(&path)
    }

    /// Writes the installed repository back to disk.
    ///
    /// # Errors
    ///
    /// Returns [`PatchError::Metadata`] if serialization or writing fails.
    pub fn save_installed(&self, installed: &InstalledRepository) -> Result<(), PatchError> {
        let path = self.installed_path();
        let json = serde_json::to_string_pretty(installed)
            .map_err(|e| PatchError::Metadata { path: path.clone(), message: e.to_string() })?;
        self.ctx
            .fs
            .write(&path, &format!("{json}\n"))
            .map_err(|e| PatchError::Metadata { path, message: e.to_string() })
    }

    /// Absolute install directory of `package`.
    #[must_use]
    pub fn install_path(&self, package: &Package) -> PathBuf {
        match &package.install_path {
            Some(path) => self.root.join(path),
            None => self.root.join(VENDOR_DIR).join(&package.name),
        }
    }

    fn installed_path(&self) -> PathBuf {
        self.root.join(VENDOR_DIR).join(INSTALLED_FILE)
    }

    fn read_json<T: serde::de::DeserializeOwned>(&self, path: &Path) -> Result<T, PatchError> {
        let contents = self
            .ctx
            .fs
            .read_to_string(path)
            .map_err(|e| PatchError::Metadata { path: path.to_path_buf(), message: e.to_string() })?;
        serde_json::from_str(&contents)
            .map_err(|e| PatchError::Metadata { path: path.to_path_buf(), message: e.to_string() })
    }
}
