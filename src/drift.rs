//! Drift detection: finds installed packages whose resolved patch set no
//! longer matches the patches recorded as applied to them.
//!
//! A drifted package cannot be patched in place (its tree may already carry
//! the old patches), so it is uninstalled and the host's normal install step
//! puts back clean files for the application engine to patch.

use crate::patch::{Patch, PatchCollection};
use crate::project::{AppliedPatches, InstalledRepository};

/// How a package's patch set changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftKind {
    /// No patches were applied before; some are resolved now.
    NewlyPatched,
    /// Patches were applied before; none are resolved now.
    NoLongerPatched,
    /// Both sides have patches but they differ.
    Changed,
}

/// A single package's drift information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriftEntry {
    /// The drifted package.
    pub package: String,
    /// Classification of the change.
    pub kind: DriftKind,
    /// Descriptions resolved now but not applied before.
    pub added: Vec<String>,
    /// Descriptions applied before but no longer resolved.
    pub removed: Vec<String>,
    /// Descriptions present on both sides with different urls.
    pub changed: Vec<String>,
}

/// Instruction for the host to uninstall a package before installing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UninstallInstruction {
    /// Package to remove from the installed set.
    pub package: String,
}

/// Aggregated drift report across the installed packages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriftReport {
    /// Per-package drift entries (only includes drifted packages).
    pub entries: Vec<DriftEntry>,
    /// Number of installed packages compared.
    pub checked: usize,
}

impl DriftReport {
    /// Returns `true` if no package has drifted.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of drifted packages.
    #[must_use]
    pub fn affected_count(&self) -> usize {
        self.entries.len()
    }

    /// One uninstall instruction per drifted package, in report order.
    #[must_use]
    pub fn uninstall_instructions(&self) -> Vec<UninstallInstruction> {
        self.entries.iter().map(|e| UninstallInstruction { package: e.package.clone() }).collect()
    }
}

/// The `description -> url` view of a resolved patch list.
#[must_use]
pub fn applied_set(patches: &[Patch]) -> AppliedPatches {
    patches.iter().map(|p| (p.description.clone(), p.url.clone())).collect()
}

/// Classifies a package by comparing what was applied with what resolves now.
///
/// An absent record and an empty record are equivalent. Returns `None` when
/// the package is clean.
#[must_use]
pub fn classify(prior: Option<&AppliedPatches>, resolved: &AppliedPatches) -> Option<DriftKind> {
    let prior_empty = prior.map_or(true, AppliedPatches::is_empty);
    match (prior_empty, resolved.is_empty()) {
        (true, true) => None,
        (true, false) => Some(DriftKind::NewlyPatched),
        (false, true) => Some(DriftKind::NoLongerPatched),
        (false, false) => (prior != Some(resolved)).then_some(DriftKind::Changed),
    }
}

/// Detects drift for every installed package against `collection`.
#[must_use]
pub fn detect_drift(installed: &InstalledRepository, collection: &PatchCollection) -> DriftReport {
    let entries = installed
        .packages
        .iter()
        .filter_map(|package| {
            let prior = package.patches_applied();
            let resolved = applied_set(collection.patches_for(&package.name));
            let kind = classify(prior.as_ref(), &resolved)?;
            Some(diff_entry(&package.name, kind, prior.unwrap_or_default(), &resolved))
        })
        .collect();

    DriftReport { entries, checked: installed.packages.len() }
}

fn diff_entry(
    package: &str,
    kind: DriftKind,
    prior: AppliedPatches,
    resolved: &AppliedPatches,
) -> DriftEntry {
    let added = resolved.keys().filter(|d| !prior.contains_key(*d)).cloned().collect();
    let removed = prior.keys().filter(|d| !resolved.contains_key(*d)).cloned().collect();
    let changed = prior
        .iter()
        .filter(|(d, url)| resolved.get(*d).is_some_and(|new_url| new_url != *url))
        .map(|(d, _)| d.clone())
        .collect();
    DriftEntry { package: package.to_string(), kind, added, removed, changed }
}

/// Formats a drift report as a human-readable string.
#[must_use]
pub fn format_drift_report(report: &DriftReport) -> String {
    if report.is_clean() {
        return format!("No patch drift across {} installed packages.", report.checked);
    }

    let mut lines = vec!["Patch drift detected:".to_string(), String::new()];
    for entry in &report.entries {
        let kind = match entry.kind {
            DriftKind::NewlyPatched => "newly patched",
            DriftKind::NoLongerPatched => "no longer patched",
            DriftKind::Changed => "patches changed",
        };
        lines.push(format!("  {} ({kind})", entry.package));
        for description in &entry.added {
            lines.push(format!("    [ADDED] {description}"));
        }
        for description in &entry.removed {
            lines.push(format!("    [REMOVED] {description}"));
        }
        for description in &entry.changed {
            lines.push(format!("    [CHANGED] {description}"));
        }
    }
    lines.push(String::new());

    let total = report.affected_count();
    lines.push(format!(
        "{total} package{} will be reinstalled.",
        if total == 1 { "" } else { "s" }
    ));
    lines.join("\n")
}
