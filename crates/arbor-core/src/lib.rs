//! Artifact, dependency, version and graph model for the arbor dependency collector

pub mod artifact;
pub mod dependency;
pub mod dump;
pub mod error;
pub mod graph;
pub mod repository;
pub mod version;

pub use artifact::{Artifact, ArtifactIdentity, ArtifactKey, PROPERTY_INCLUDES_DEPENDENCIES};
pub use dependency::{merge_dependencies, scopes, Dependency, DependencyManagement, Exclusion};
pub use error::CoreError;
pub use graph::{ConflictId, DependencyGraph, DependencyNode, NodeId};
pub use repository::{aggregate_repositories, ArtifactRepository, LocalRepository, RemoteRepository};
pub use version::{Bound, Version, VersionConstraint, VersionRange};
