//! Dependencies, exclusions and dependency management

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::artifact::{Artifact, ArtifactKey};
use crate::error::CoreError;

pub mod scopes {
    pub const COMPILE: &str = "compile";
    pub const PROVIDED: &str = "provided";
    pub const RUNTIME: &str = "runtime";
    pub const TEST: &str = "test";
    pub const SYSTEM: &str = "system";
}

const WILDCARD: &str = "*";

/// Pattern excluding artifacts from a dependency's subtree; `*` matches any value
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Exclusion {
    pub group_id: String,
    pub artifact_id: String,
    pub extension: String,
    pub classifier: String,
}

impl Exclusion {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        extension: impl Into<String>,
        classifier: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            extension: extension.into(),
            classifier: classifier.into(),
        }
    }

    /// Parse `group:artifact[:extension[:classifier]]`; omitted parts match anything
    pub fn parse(pattern: &str) -> Result<Self, CoreError> {
        let parts: Vec<&str> = pattern.trim().split(':').collect();
        match parts.as_slice() {
            [g, a] => Ok(Self::new(*g, *a, WILDCARD, WILDCARD)),
            [g, a, e] => Ok(Self::new(*g, *a, *e, WILDCARD)),
            [g, a, e, c] => Ok(Self::new(*g, *a, *e, *c)),
            _ => Err(CoreError::InvalidExclusion(pattern.to_string())),
        }
    }

    pub fn matches(&self, artifact: &Artifact) -> bool {
        fn field(pattern: &str, value: &str) -> bool {
            pattern == WILDCARD || pattern == value
        }

        field(&self.group_id, &artifact.group_id)
            && field(&self.artifact_id, &artifact.artifact_id)
            && field(&self.extension, &artifact.extension)
            && field(&self.classifier, &artifact.classifier)
    }
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.group_id, self.artifact_id, self.extension, self.classifier
        )
    }
}

/// An artifact reference together with scope, optionality and exclusions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    pub artifact: Artifact,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub exclusions: BTreeSet<Exclusion>,
}

impl Dependency {
    pub fn new(artifact: Artifact, scope: impl Into<String>) -> Self {
        Self {
            artifact,
            scope: scope.into(),
            optional: false,
            exclusions: BTreeSet::new(),
        }
    }

    pub fn with_artifact(&self, artifact: Artifact) -> Self {
        if artifact == self.artifact {
            return self.clone();
        }
        Self {
            artifact,
            ..self.clone()
        }
    }

    pub fn with_scope(&self, scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            ..self.clone()
        }
    }

    pub fn with_optional(&self, optional: bool) -> Self {
        Self {
            optional,
            ..self.clone()
        }
    }

    pub fn with_exclusions(&self, exclusions: impl IntoIterator<Item = Exclusion>) -> Self {
        Self {
            exclusions: exclusions.into_iter().collect(),
            ..self.clone()
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}", self.artifact, self.scope)?;
        if self.optional {
            write!(f, "?")?;
        }
        write!(f, ")")
    }
}

/// Overrides a dependency manager applies; `None` leaves that aspect untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyManagement {
    pub version: Option<String>,
    pub scope: Option<String>,
    /// Replaces the dependency's own exclusions
    pub exclusions: Option<BTreeSet<Exclusion>>,
    pub properties: Option<BTreeMap<String, String>>,
}

impl DependencyManagement {
    pub fn is_empty(&self) -> bool {
        self.version.is_none()
            && self.scope.is_none()
            && self.exclusions.is_none()
            && self.properties.is_none()
    }
}

/// Merge two dependency lists, dropping recessive entries whose key the dominant side declares
pub fn merge_dependencies(dominant: &[Dependency], recessive: &[Dependency]) -> Vec<Dependency> {
    if dominant.is_empty() {
        return recessive.to_vec();
    }
    if recessive.is_empty() {
        return dominant.to_vec();
    }

    let keys: HashSet<ArtifactKey> = dominant.iter().map(|d| d.artifact.key()).collect();
    let mut merged = dominant.to_vec();
    merged.extend(
        recessive
            .iter()
            .filter(|d| !keys.contains(&d.artifact.key()))
            .cloned(),
    );
    merged
}
