use arbor_core::{Artifact, ArtifactKey, CoreError, VersionConstraint};
use thiserror::Error;

use crate::collector::CollectResult;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollectError {
    #[error("Failed to read artifact descriptor for {artifact}: {reason}")]
    ArtifactDescriptor { artifact: Artifact, reason: String },

    #[error("Failed to resolve version range for {artifact}: {reason}")]
    VersionRangeResolution { artifact: Artifact, reason: String },

    #[error("No versions available for {artifact} within {constraint}")]
    EmptyVersionRange { artifact: Artifact, constraint: String },

    #[error(
        "Could not resolve version conflict for {key}: no version satisfies {}",
        join_constraints(.constraints)
    )]
    UnsolvableVersionConflict {
        key: ArtifactKey,
        constraints: Vec<VersionConstraint>,
    },

    #[error(transparent)]
    Core(#[from] CoreError),
}

fn join_constraints(constraints: &[VersionConstraint]) -> String {
    constraints
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(" and ")
}

/// Returned when collection recorded at least one error.
///
/// The partial result is kept so callers can decide whether a best-effort
/// graph is good enough.
#[derive(Error, Debug)]
#[error("Failed to collect dependencies at {root}: {summary}")]
pub struct DependencyCollectionError {
    pub root: String,
    pub summary: String,
    pub result: Box<CollectResult>,
}

impl DependencyCollectionError {
    pub fn new(result: CollectResult) -> Self {
        let root = result.graph[result.graph.root()]
            .artifact()
            .map(|a| a.to_string())
            .unwrap_or_else(|| "(root)".to_string());

        let summary = match result.errors.as_slice() {
            [] => "no errors recorded".to_string(),
            [only] => only.to_string(),
            [first, rest @ ..] => format!("{} (and {} more)", first, rest.len()),
        };

        Self {
            root,
            summary,
            result: Box::new(result),
        }
    }

    pub fn errors(&self) -> &[CollectError] {
        &self.result.errors
    }

    pub fn into_result(self) -> CollectResult {
        *self.result
    }
}
