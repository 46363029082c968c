//! Patch manifests: `package -> description -> url` maps declared by the
//! root project, by dependencies, or by an external patches file.
//!
//! Two shapes are accepted for a package's patch list:
//!
//! ```json
//! { "vendor/pkg": { "Fix header": "patches/fix.patch" } }
//! { "vendor/pkg": [ { "description": "Fix header", "url": "patches/fix.patch" } ] }
//! ```

use serde_json::Value;

use super::{Patch, PatchCollection};
use crate::error::PatchError;

/// An ordered two-level map of declared patches.
///
/// Package order and description order follow declaration order; inserting
/// an existing `(package, description)` overrides the url in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchManifest {
    packages: Vec<(String, Vec<(String, String)>)>,
}

impl PatchManifest {
    /// Creates an empty manifest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `url` for `(package, description)`, overriding any earlier value.
    pub fn insert(
        &mut self,
        package: impl Into<String>,
        description: impl Into<String>,
        url: impl Into<String>,
    ) {
        let package = package.into();
        let description = description.into();
        let url = url.into();

        let index = if let Some(i) = self.packages.iter().position(|(name, _)| *name == package) {
            i
        } else {
            self.packages.push((package, Vec::new()));
            self.packages.len() - 1
        };
        let entries = &mut self.packages[index].1;
        match entries.iter_mut().find(|(d, _)| *d == description) {
            Some(entry) => entry.1 = url,
            None => entries.push((description, url)),
        }
    }

    /// Iterates packages with their `(description, url)` entries.
    pub fn packages(&self) -> impl Iterator<Item = (&str, &[(String, String)])> {
        self.packages.iter().map(|(name, entries)| (name.as_str(), entries.as_slice()))
    }

    /// Returns the url declared for `(package, description)`, if any.
    #[must_use]
    pub fn get(&self, package: &str, description: &str) -> Option<&str> {
        self.packages
            .iter()
            .find(|(name, _)| name == package)
            .and_then(|(_, entries)| entries.iter().find(|(d, _)| d == description))
            .map(|(_, url)| url.as_str())
    }

    /// Returns `true` when no patches are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.iter().all(|(_, entries)| entries.is_empty())
    }

    /// Adds every declared patch to `collection`, attributed to `resolver`.
    pub fn add_to(&self, collection: &mut PatchCollection, resolver: &str) {
        for (package, entries) in &self.packages {
            for (description, url) in entries {
                collection.add_patch(Patch::new(package, description, url, resolver));
            }
        }
    }
}

/// Deep-merges `overlay` on top of `base`.
///
/// Packages present only in one side are kept untouched. For packages in
/// both, description entries are merged and `overlay` wins on conflicts.
#[must_use]
pub fn merge_manifests(base: PatchManifest, overlay: &PatchManifest) -> PatchManifest {
    let mut merged = base;
    for (package, entries) in overlay.packages() {
        for (description, url) in entries {
            merged.insert(package, description.as_str(), url.as_str());
        }
    }
    merged
}

/// Parses a manifest from JSON.
///
/// `null` yields an empty manifest. `source` names the origin of the value
/// in error messages.
///
/// # Errors
///
/// Returns [`PatchError::Configuration`] when the value is not shaped like a
/// manifest.
pub fn parse_manifest(value: &Value, source: &str) -> Result<PatchManifest, PatchError> {
    let mut manifest = PatchManifest::new();
    let packages = match value {
        Value::Null => return Ok(manifest),
        Value::Object(map) => map,
        other => {
            return Err(PatchError::configuration(
                source,
                format!("expected an object of packages, found {}", type_name(other)),
            ))
        }
    };

    for (package, patches) in packages {
        if package.trim().is_empty() {
            return Err(PatchError::configuration(source, "package name must not be empty"));
        }
        match patches {
            Value::Object(entries) => {
                for (description, url) in entries {
                    let url = url.as_str().ok_or_else(|| {
                        PatchError::configuration(
                            source,
                            format!(
                                "patch '{description}' for {package} must have a string url, found {}",
                                type_name(url)
                            ),
                        )
                    })?;
                    manifest.insert(package.as_str(), description.as_str(), url);
                }
            }
            Value::Array(entries) => {
                for entry in entries {
                    let (description, url) = expanded_entry(entry).ok_or_else(|| {
                        PatchError::configuration(
                            source,
                            format!(
                                "patch entries for {package} need string 'description' and 'url' fields"
                            ),
                        )
                    })?;
                    manifest.insert(package.as_str(), description, url);
                }
            }
            other => {
                return Err(PatchError::configuration(
                    source,
                    format!("patches for {package} must be an object or a list, found {}", type_name(other)),
                ))
            }
        }
    }

    Ok(manifest)
}

fn expanded_entry(entry: &Value) -> Option<(&str, &str)> {
    let description = entry.get("description")?.as_str()?;
    let url = entry.get("url")?.as_str()?;
    Some((description, url))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
