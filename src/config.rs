//! Session configuration.
//!
//! Options are layered: built-in defaults, then the root project's
//! `extra.patching` object, then `PKGPATCH_<OPTION>` environment variables.
//! The result is immutable for the rest of the session.

use std::path::PathBuf;

use serde_json::Value;

use crate::error::PatchError;

/// Key in the root project's `extra` holding patching options.
pub const EXTRA_KEY: &str = "patching";

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "PKGPATCH_";

/// Strip-levels tried when none are configured.
pub const DEFAULT_PATCH_LEVELS: [&str; 4] = ["-p1", "-p0", "-p2", "-p4"];

/// Immutable patching options for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Abort the whole run on the first failed patch.
    pub exit_on_patch_failure: bool,
    /// Skip the entire pipeline.
    pub disable_patching: bool,
    /// Resolver ids that must not run.
    pub disable_resolvers: Vec<String>,
    /// Strip-level arguments, tried in order.
    pub patch_levels: Vec<String>,
    /// External patch manifest, relative to the project root.
    pub patches_file: Option<PathBuf>,
    /// Packages whose own declared patches are ignored.
    pub ignore_dependency_patches: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exit_on_patch_failure: true,
            disable_patching: false,
            disable_resolvers: Vec::new(),
            patch_levels: DEFAULT_PATCH_LEVELS.iter().map(ToString::to_string).collect(),
            patches_file: None,
            ignore_dependency_patches: Vec::new(),
        }
    }
}

impl Config {
    /// Loads configuration from the project's options and the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`PatchError::Configuration`] when an option has the wrong type.
    pub fn load(project: Option<&Value>) -> Result<Self, PatchError> {
        Self::load_with(project, |key| std::env::var(key).ok())
    }

    /// Loads configuration with an explicit environment lookup.
    ///
    /// # Errors
    ///
    /// Returns [`PatchError::Configuration`] when an option has the wrong type.
    pub fn load_with<F>(project: Option<&Value>, env: F) -> Result<Self, PatchError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        match project {
            None | Some(Value::Null) => {}
            Some(Value::Object(options)) => {
                for (name, value) in options {
                    config.set_json(name, value)?;
                }
            }
            Some(_) => {
                return Err(PatchError::configuration(
                    format!("extra.{EXTRA_KEY}"),
                    "expected an object of options",
                ))
            }
        }

        for name in OPTION_NAMES {
            let key = env_key(name);
            // Set but empty counts as unset.
            if let Some(raw) = env(&key).filter(|raw| !raw.trim().is_empty()) {
                config.set_env(name, &key, &raw)?;
            }
        }

        if config.patch_levels.is_empty() {
            return Err(PatchError::configuration("patch-levels", "at least one level is required"));
        }

        Ok(config)
    }

    /// Returns `true` when `resolver` is listed in `disable-resolvers`.
    #[must_use]
    pub fn is_resolver_disabled(&self, resolver: &str) -> bool {
        self.disable_resolvers.iter().any(|r| r == resolver)
    }

    fn set_json(&mut self, name: &str, value: &Value) -> Result<(), PatchError> {
        let source = format!("extra.{EXTRA_KEY}.{name}");
        match name {
            "exit-on-patch-failure" => self.exit_on_patch_failure = json_bool(&source, value)?,
            "disable-patching" => self.disable_patching = json_bool(&source, value)?,
            "disable-resolvers" => self.disable_resolvers = json_list(&source, value)?,
            "patch-levels" => self.patch_levels = json_list(&source, value)?,
            "ignore-dependency-patches" => {
                self.ignore_dependency_patches = json_list(&source, value)?;
            }
            "patches-file" => {
                let path = value
                    .as_str()
                    .ok_or_else(|| PatchError::configuration(&source, "expected a string"))?;
                self.patches_file = (!path.is_empty()).then(|| PathBuf::from(path));
            }
            _ => tracing::warn!(option = name, "ignoring unknown patching option"),
        }
        Ok(())
    }

    fn set_env(&mut self, name: &str, key: &str, raw: &str) -> Result<(), PatchError> {
        match name {
            "exit-on-patch-failure" => self.exit_on_patch_failure = env_bool(key, raw)?,
            "disable-patching" => self.disable_patching = env_bool(key, raw)?,
            "disable-resolvers" => self.disable_resolvers = env_list(raw),
            "patch-levels" => self.patch_levels = env_list(raw),
            "ignore-dependency-patches" => self.ignore_dependency_patches = env_list(raw),
            "patches-file" => {
                let raw = raw.trim();
                self.patches_file = (!raw.is_empty()).then(|| PathBuf::from(raw));
            }
            _ => {}
        }
        Ok(())
    }
}

const OPTION_NAMES: [&str; 6] = [
    "exit-on-patch-failure",
    "disable-patching",
    "disable-resolvers",
    "patch-levels",
    "patches-file",
    "ignore-dependency-patches",
];

/// Environment variable name for an option, e.g. `PKGPATCH_PATCH_LEVELS`.
#[must_use]
pub fn env_key(option: &str) -> String {
    format!("{ENV_PREFIX}{}", option.to_uppercase().replace('-', "_"))
}

fn json_bool(source: &str, value: &Value) -> Result<bool, PatchError> {
    value.as_bool().ok_or_else(|| PatchError::configuration(source, "expected a boolean"))
}

fn json_list(source: &str, value: &Value) -> Result<Vec<String>, PatchError> {
    let items = value
        .as_array()
        .ok_or_else(|| PatchError::configuration(source, "expected a list of strings"))?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(String::from)
                .ok_or_else(|| PatchError::configuration(source, "expected a list of strings"))
        })
        .collect()
}

fn env_bool(key: &str, raw: &str) -> Result<bool, PatchError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(PatchError::configuration(key, format!("'{other}' is not a boolean"))),
    }
}

fn env_list(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect()
}
