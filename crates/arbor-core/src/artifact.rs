//! Artifact coordinates

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub const SNAPSHOT: &str = "SNAPSHOT";

/// Artifact property marking a jar that bundles its own dependencies
pub const PROPERTY_INCLUDES_DEPENDENCIES: &str = "includesDependencies";

fn snapshot_timestamp() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(.*-)?([0-9]{8}\.[0-9]{6}-[0-9]+)$").expect("snapshot pattern is valid")
    })
}

/// An immutable artifact coordinate, optionally bound to a local file
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Artifact {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    #[serde(default)]
    pub classifier: String,
    #[serde(default = "default_extension")]
    pub extension: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

fn default_extension() -> String {
    "jar".to_string()
}

impl Artifact {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        extension: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
            classifier: String::new(),
            extension: extension.into(),
            file: None,
            properties: BTreeMap::new(),
        }
    }

    /// Parse `group:artifact[:extension[:classifier]]:version`
    pub fn parse(coords: &str) -> Result<Self, CoreError> {
        let parts: Vec<&str> = coords.trim().split(':').collect();
        let invalid = || CoreError::InvalidCoordinates(coords.to_string());

        let (group_id, artifact_id, extension, classifier, version) = match parts.as_slice() {
            [g, a, v] => (*g, *a, "jar", "", *v),
            [g, a, e, v] => (*g, *a, *e, "", *v),
            [g, a, e, c, v] => (*g, *a, *e, *c, *v),
            _ => return Err(invalid()),
        };

        if group_id.is_empty() || artifact_id.is_empty() || version.is_empty() {
            return Err(invalid());
        }

        let extension = if extension.is_empty() { "jar" } else { extension };
        Ok(Self::new(group_id, artifact_id, extension, version).with_classifier(classifier))
    }

    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = classifier.into();
        self
    }

    pub fn with_version(&self, version: impl Into<String>) -> Self {
        let version = version.into();
        if version == self.version {
            return self.clone();
        }
        Self {
            version,
            ..self.clone()
        }
    }

    pub fn with_file(&self, file: Option<PathBuf>) -> Self {
        Self {
            file,
            ..self.clone()
        }
    }

    pub fn with_properties(&self, properties: BTreeMap<String, String>) -> Self {
        Self {
            properties,
            ..self.clone()
        }
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// The version with a timestamped snapshot collapsed to `SNAPSHOT`
    pub fn base_version(&self) -> String {
        match snapshot_timestamp().captures(&self.version) {
            Some(caps) => {
                let prefix = caps.get(1).map(|m| m.as_str()).unwrap_or("");
                format!("{}{}", prefix, SNAPSHOT)
            }
            None => self.version.clone(),
        }
    }

    pub fn is_snapshot(&self) -> bool {
        self.version.ends_with(SNAPSHOT) || snapshot_timestamp().is_match(&self.version)
    }

    /// Version-less key used for management and conflict grouping
    pub fn key(&self) -> ArtifactKey {
        ArtifactKey {
            group_id: self.group_id.clone(),
            artifact_id: self.artifact_id.clone(),
            extension: self.extension.clone(),
            classifier: self.classifier.clone(),
        }
    }

    /// Identity used to detect an artifact repeating along an ancestor chain
    pub fn identity(&self) -> ArtifactIdentity {
        ArtifactIdentity {
            group_id: self.group_id.clone(),
            artifact_id: self.artifact_id.clone(),
            base_version: self.base_version(),
            extension: self.extension.clone(),
            classifier: self.classifier.clone(),
        }
    }
}

impl FromStr for Artifact {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.extension)?;
        if !self.classifier.is_empty() {
            write!(f, ":{}", self.classifier)?;
        }
        write!(f, ":{}", self.version)
    }
}

/// Coordinates without the version: `group:artifact:extension[:classifier]`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactKey {
    pub group_id: String,
    pub artifact_id: String,
    pub extension: String,
    pub classifier: String,
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.extension)?;
        if !self.classifier.is_empty() {
            write!(f, ":{}", self.classifier)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactIdentity {
    pub group_id: String,
    pub artifact_id: String,
    pub base_version: String,
    pub extension: String,
    pub classifier: String,
}
