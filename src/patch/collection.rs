//! Per-package, description-deduplicated patch index.

use std::collections::HashMap;

use super::Patch;

/// Patches for one package, in insertion order, indexed by description.
#[derive(Debug, Default, Clone)]
struct PackagePatches {
    ordered: Vec<Patch>,
    by_description: HashMap<String, usize>,
}

/// Mapping from package name to its ordered, deduplicated patches.
///
/// Re-adding a patch with an existing `(package, description)` replaces the
/// earlier entry in place, so application order stays the order in which
/// descriptions were first declared.
#[derive(Debug, Default, Clone)]
pub struct PatchCollection {
    packages: HashMap<String, PackagePatches>,
    package_order: Vec<String>,
}

impl PatchCollection {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `patch`, replacing any patch with the same package and
    /// description.
    pub fn add_patch(&mut self, patch: Patch) {
        if !self.packages.contains_key(&patch.package) {
            self.package_order.push(patch.package.clone());
        }
        let entry = self.packages.entry(patch.package.clone()).or_default();
        if let Some(&index) = entry.by_description.get(&patch.description) {
            entry.ordered[index] = patch;
        } else {
            entry.by_description.insert(patch.description.clone(), entry.ordered.len());
            entry.ordered.push(patch);
        }
    }

    /// Returns the patches for `package`, or an empty slice.
    #[must_use]
    pub fn patches_for(&self, package: &str) -> &[Patch] {
        self.packages.get(package).map_or(&[], |p| p.ordered.as_slice())
    }

    /// Package names that have at least one patch, in first-seen order.
    pub fn packages(&self) -> impl Iterator<Item = &str> {
        self.package_order.iter().map(String::as_str)
    }

    /// Total number of patches across all packages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.values().map(|p| p.ordered.len()).sum()
    }

    /// Returns `true` when no patches have been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}
