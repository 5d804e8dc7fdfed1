//! Session configuration

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Settings from which [`CollectSession::from_config`](crate::CollectSession::from_config)
/// builds the default policies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Request context for requests that don't set their own
    pub request_context: String,
    /// Scopes dropped below the direct dependencies
    pub transitive_excluded_scopes: Vec<String>,
    pub include_optional_transitives: bool,
    /// Context value the context refiner extends with a classpath suffix
    pub classpath_context: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            request_context: "project".to_string(),
            transitive_excluded_scopes: vec!["test".to_string(), "provided".to_string()],
            include_optional_transitives: false,
            classpath_context: "project".to_string(),
        }
    }
}

impl SessionConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| "Failed to parse session configuration")
    }

    /// Load from a TOML file; a missing file yields the defaults
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No session configuration at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read session configuration from {:?}", path))?;
        Self::from_toml_str(&content)
    }
}
