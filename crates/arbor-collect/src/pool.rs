//! Memoization for a single collection run

use std::collections::HashMap;
use std::sync::Arc;

use arbor_core::{Artifact, NodeId, RemoteRepository};

use crate::policy::Policies;
use crate::services::{ArtifactDescriptor, DescriptorRequest, VersionRangeRequest, VersionRangeResult};

/// Identifies the children collected below an artifact. They can be reused
/// wherever the artifact is expanded again with the same repositories under
/// equal policies.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeKey {
    artifact: Artifact,
    repositories: Vec<RemoteRepository>,
    policies: Policies,
}

impl NodeKey {
    /// `repositories` and `policies` are the ones in effect for the children
    pub fn new(artifact: &Artifact, repositories: &[RemoteRepository], policies: &Policies) -> Self {
        Self {
            artifact: artifact.clone(),
            repositories: repositories.to_vec(),
            policies: policies.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum CachedDescriptor {
    Found(Arc<ArtifactDescriptor>),
    /// Reading failed before; the error was already recorded
    Failed,
}

#[derive(Debug, Default)]
pub struct DataPool {
    ranges: HashMap<VersionRangeRequest, Arc<VersionRangeResult>>,
    descriptors: HashMap<DescriptorRequest, CachedDescriptor>,
    nodes: HashMap<NodeKey, NodeId>,
}

impl DataPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn range(&self, request: &VersionRangeRequest) -> Option<Arc<VersionRangeResult>> {
        self.ranges.get(request).cloned()
    }

    pub fn put_range(&mut self, request: VersionRangeRequest, result: Arc<VersionRangeResult>) {
        self.ranges.entry(request).or_insert(result);
    }

    pub fn descriptor(&self, request: &DescriptorRequest) -> Option<CachedDescriptor> {
        self.descriptors.get(request).cloned()
    }

    pub fn put_descriptor(&mut self, request: DescriptorRequest, descriptor: CachedDescriptor) {
        self.descriptors.entry(request).or_insert(descriptor);
    }

    pub fn node(&self, key: &NodeKey) -> Option<NodeId> {
        self.nodes.get(key).copied()
    }

    pub fn put_node(&mut self, key: NodeKey, node: NodeId) {
        self.nodes.entry(key).or_insert(node);
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}
