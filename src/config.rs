//! Hintline configuration
//!
//! Config is a YAML file (by default `hintline.yaml` in the working directory).
//!
//! ## Priority Order (highest to lowest)
//!
//! 1. CLI flags (applied by the binary)
//! 2. Environment variables (`HINTLINE_ENCLOSURE_START`, `HINTLINE_ENCLOSURE_END`, `HINTLINE_BASE_DIR`)
//! 3. Config file
//! 4. Defaults
//!
//! ```yaml
//! enclosure:
//!   start: "<<"
//!   end: ">>"
//! base_dir: ./fixtures
//! modules:
//!   "@acme/settings":
//!     jsonStr: { prop: jsonStr }
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{HintError, Result};

pub const DEFAULT_CONFIG_FILE: &str = "hintline.yaml";

pub const ENV_ENCLOSURE_START: &str = "HINTLINE_ENCLOSURE_START";
pub const ENV_ENCLOSURE_END: &str = "HINTLINE_ENCLOSURE_END";
pub const ENV_BASE_DIR: &str = "HINTLINE_BASE_DIR";

/// Delimiters around a directive, `<<` / `>>` unless overridden
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Enclosure {
    pub start: String,
    pub end: String,
}

impl Default for Enclosure {
    fn default() -> Self {
        Self {
            start: "<<".to_string(),
            end: ">>".to_string(),
        }
    }
}

impl Enclosure {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HintsConfig {
    #[serde(default)]
    pub enclosure: Enclosure,

    /// Directory that `require:<path>.json` resources are relative to
    #[serde(default)]
    pub base_dir: Option<PathBuf>,

    /// Module name -> exported properties
    #[serde(default)]
    pub modules: HashMap<String, Value>,
}

impl HintsConfig {
    /// Load configuration from file
    ///
    /// Returns default config if the file doesn't exist.
    /// Returns error if the file exists but is malformed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(start) = lookup(ENV_ENCLOSURE_START) {
            self.enclosure.start = start;
        }
        if let Some(end) = lookup(ENV_ENCLOSURE_END) {
            self.enclosure.end = end;
        }
        if let Some(dir) = lookup(ENV_BASE_DIR) {
            self.base_dir = Some(PathBuf::from(dir));
        }
        self
    }

    /// Base directory for JSON resources (current directory when unset)
    pub fn base_dir(&self) -> PathBuf {
        self.base_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Reject configurations that can never match a directive
    pub fn validate(&self) -> Result<()> {
        if self.enclosure.start.is_empty() || self.enclosure.end.is_empty() {
            return Err(HintError::Config {
                reason: "enclosure start and end must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
