//! Rendering options: defaults, an optional YAML file, then `DXU_*`
//! environment overrides.

use core::str::FromStr;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

/// Whether fields marked `internal` are part of an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InternalPolicy {
    Include,
    Exclude,
}

impl InternalPolicy {
    pub fn admits(self, internal: bool) -> bool {
        !internal || self == InternalPolicy::Include
    }
}

impl FromStr for InternalPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "include" => Ok(InternalPolicy::Include),
            "exclude" => Ok(InternalPolicy::Exclude),
            other => Err(Error::config(
                "internal policy",
                format!("expected include or exclude, got {other:?}"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Internal fields in documentation output.
    pub internal_docs: InternalPolicy,
    /// Internal fields in FITS templates.
    pub internal_fits: InternalPolicy,
    /// Value enumerations up to this length are listed inline.
    pub max_inline_values: usize,
    /// Insert zero-width spaces after `;` in UCDs and `.` in units.
    pub soft_breaks: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            internal_docs: InternalPolicy::Include,
            internal_fits: InternalPolicy::Exclude,
            max_inline_values: 3,
            soft_breaks: true,
        }
    }
}

const ENV_KEYS: [&str; 4] = [
    "DXU_INTERNAL_DOCS",
    "DXU_INTERNAL_FITS",
    "DXU_MAX_INLINE_VALUES",
    "DXU_SOFT_BREAKS",
];

impl Config {
    pub fn from_yaml_str(text: &str) -> Result<Config> {
        if text.trim().is_empty() {
            return Ok(Config::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Defaults, overlaid by `path` if given, overlaid by the process
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let mut config = match path {
            Some(path) => {
                debug!(path = %path.display(), "reading config");
                Self::from_yaml_str(&std::fs::read_to_string(path)?)?
            }
            None => Config::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `DXU_*` overrides from `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        for key in ENV_KEYS {
            if let Some(raw) = lookup(key) {
                self.set(key.trim_start_matches("DXU_"), &raw)?;
            }
        }
        Ok(())
    }

    /// Set one option by name (case-insensitive), as given on a command
    /// line or in the environment.
    pub fn set(&mut self, key: &str, raw: &str) -> Result<()> {
        let invalid = |reason: String| Error::config(key, reason);
        match key.to_ascii_lowercase().as_str() {
            "internal_docs" => self.internal_docs = raw.parse()?,
            "internal_fits" => self.internal_fits = raw.parse()?,
            "max_inline_values" => {
                self.max_inline_values = raw
                    .trim()
                    .parse()
                    .map_err(|e| invalid(format!("{raw:?}: {e}")))?
            }
            "soft_breaks" => {
                self.soft_breaks = match raw.trim().to_ascii_lowercase().as_str() {
                    "1" | "true" | "yes" | "on" => true,
                    "0" | "false" | "no" | "off" => false,
                    other => return Err(invalid(format!("{other:?} is not a boolean"))),
                }
            }
            _ => return Err(invalid(String::from("unknown option"))),
        }
        debug!(key, value = raw, "config override");
        Ok(())
    }
}
