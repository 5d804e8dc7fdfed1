//! Contracts of the collaborators the collector consumes
//!
//! Descriptor reading and version range resolution live outside this crate.
//! Implementations report failures as `anyhow::Error`; the collector turns
//! them into [`CollectError`](crate::CollectError) entries.

use std::collections::HashMap;

use anyhow::Result;
use arbor_core::{Artifact, ArtifactRepository, Dependency, RemoteRepository, Version, VersionConstraint};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionRangeRequest {
    pub artifact: Artifact,
    pub repositories: Vec<RemoteRepository>,
    pub request_context: String,
}

impl VersionRangeRequest {
    pub fn new(
        artifact: Artifact,
        repositories: Vec<RemoteRepository>,
        request_context: impl Into<String>,
    ) -> Self {
        Self {
            artifact,
            repositories,
            request_context: request_context.into(),
        }
    }
}

/// Matching versions in ascending order, each with the repository it came from
#[derive(Debug, Clone)]
pub struct VersionRangeResult {
    pub constraint: VersionConstraint,
    pub versions: Vec<Version>,
    repositories: HashMap<Version, ArtifactRepository>,
}

impl VersionRangeResult {
    pub fn new(constraint: VersionConstraint) -> Self {
        Self {
            constraint,
            versions: Vec::new(),
            repositories: HashMap::new(),
        }
    }

    pub fn add_version(&mut self, version: Version, repository: Option<ArtifactRepository>) {
        if let Some(repository) = repository {
            self.repositories.insert(version.clone(), repository);
        }
        self.versions.push(version);
    }

    pub fn with_version(mut self, version: Version, repository: Option<ArtifactRepository>) -> Self {
        self.add_version(version, repository);
        self
    }

    pub fn repository(&self, version: &Version) -> Option<&ArtifactRepository> {
        self.repositories.get(version)
    }

    pub fn highest_version(&self) -> Option<&Version> {
        self.versions.iter().max()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DescriptorRequest {
    pub artifact: Artifact,
    pub repositories: Vec<RemoteRepository>,
    pub request_context: String,
}

impl DescriptorRequest {
    pub fn new(
        artifact: Artifact,
        repositories: Vec<RemoteRepository>,
        request_context: impl Into<String>,
    ) -> Self {
        Self {
            artifact,
            repositories,
            request_context: request_context.into(),
        }
    }
}

/// What a descriptor (a POM, in Maven terms) says about an artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDescriptor {
    /// The artifact after following relocations
    pub artifact: Artifact,
    pub relocations: Vec<Artifact>,
    pub aliases: Vec<Artifact>,
    pub dependencies: Vec<Dependency>,
    pub managed_dependencies: Vec<Dependency>,
    pub repositories: Vec<RemoteRepository>,
}

impl ArtifactDescriptor {
    /// A descriptor declaring nothing
    pub fn new(artifact: Artifact) -> Self {
        Self {
            artifact,
            relocations: Vec::new(),
            aliases: Vec::new(),
            dependencies: Vec::new(),
            managed_dependencies: Vec::new(),
            repositories: Vec::new(),
        }
    }
}

pub trait ArtifactDescriptorReader: Send + Sync {
    fn read_artifact_descriptor(&self, request: &DescriptorRequest) -> Result<ArtifactDescriptor>;
}

pub trait VersionRangeResolver: Send + Sync {
    fn resolve_version_range(&self, request: &VersionRangeRequest) -> Result<VersionRangeResult>;
}
