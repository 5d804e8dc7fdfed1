//! Arena-backed dependency graph
//!
//! Nodes are stored in a single vector and refer to each other by [`NodeId`].
//! The parent link is only used to walk the ancestor chain; ownership of a
//! node lies with the arena, never with its parent.

use std::fmt;
use std::ops::{Index, IndexMut};

use crate::artifact::{Artifact, ArtifactKey};
use crate::dependency::Dependency;
use crate::repository::RemoteRepository;
use crate::version::{Version, VersionConstraint};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity of the conflict group a node was assigned to
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConflictId(pub ArtifactKey);

impl fmt::Display for ConflictId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DependencyNode {
    /// `None` only for a synthetic root
    pub dependency: Option<Dependency>,
    /// Label for a root without a dependency
    pub root_artifact: Option<Artifact>,
    pub version: Option<Version>,
    pub version_constraint: Option<VersionConstraint>,
    pub conflict_id: Option<ConflictId>,
    pub premanaged_version: Option<String>,
    pub premanaged_scope: Option<String>,
    /// Artifacts that were relocated to reach this node's artifact
    pub relocations: Vec<Artifact>,
    pub aliases: Vec<Artifact>,
    pub repositories: Vec<RemoteRepository>,
    pub request_context: String,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
    depth: usize,
}

impl DependencyNode {
    pub fn new(dependency: Dependency) -> Self {
        Self {
            dependency: Some(dependency),
            ..Default::default()
        }
    }

    pub fn root(artifact: Option<Artifact>) -> Self {
        Self {
            root_artifact: artifact,
            ..Default::default()
        }
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        self.dependency
            .as_ref()
            .map(|d| &d.artifact)
            .or(self.root_artifact.as_ref())
    }

    pub fn scope(&self) -> &str {
        self.dependency.as_ref().map(|d| d.scope.as_str()).unwrap_or("")
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}

#[derive(Debug, Clone)]
pub struct DependencyGraph {
    nodes: Vec<DependencyNode>,
    root: NodeId,
}

impl DependencyGraph {
    pub fn new(mut root: DependencyNode) -> Self {
        root.parent = None;
        root.depth = 0;
        root.children.clear();
        Self {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn get(&self, id: NodeId) -> Option<&DependencyNode> {
        self.nodes.get(id.0)
    }

    /// Attach `node` as the last child of `parent`
    pub fn add_child(&mut self, parent: NodeId, mut node: DependencyNode) -> NodeId {
        node.parent = Some(parent);
        node.depth = self[parent].depth + 1;
        node.children.clear();

        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        self[parent].children.push(id);
        id
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self[id].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self[id].parent
    }

    pub fn depth(&self, id: NodeId) -> usize {
        self[id].depth
    }

    /// Parents of `id`, nearest first
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            graph: self,
            next: self[id].parent,
        }
    }

    /// Find `from` or one of its ancestors carrying the same artifact identity
    pub fn find_duplicate(&self, from: NodeId, artifact: &Artifact) -> Option<NodeId> {
        let identity = artifact.identity();
        std::iter::once(from)
            .chain(self.ancestors(from))
            .find(|id| {
                self[*id]
                    .artifact()
                    .is_some_and(|a| a.identity() == identity)
            })
    }

    /// Deep-copy the subtree at `source` under `parent`.
    ///
    /// The copy gets fresh child lists, parent links and depths. Nodes whose
    /// artifact already occurs on the ancestor chain at the new position are
    /// left out, and `None` is returned if that applies to `source` itself.
    pub fn clone_subtree(&mut self, source: NodeId, parent: NodeId) -> Option<NodeId> {
        if let Some(artifact) = self[source].artifact() {
            if self.find_duplicate(parent, artifact).is_some() {
                return None;
            }
        }

        let copy = self[source].clone();
        let source_children = copy.children.clone();
        let id = self.add_child(parent, copy);
        for child in source_children {
            self.clone_subtree(child, id);
        }
        Some(id)
    }

    /// Keep only the children of `id` accepted by `keep`, preserving their order
    pub fn retain_children(&mut self, id: NodeId, mut keep: impl FnMut(NodeId) -> bool) {
        let children = std::mem::take(&mut self[id].children);
        let mut kept = Vec::with_capacity(children.len());
        for child in children {
            if keep(child) {
                kept.push(child);
            } else {
                self[child].parent = None;
            }
        }
        self[id].children = kept;
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        self.retain_children(parent, |c| c != child);
    }

    /// Nodes reachable from the root in pre-order
    pub fn preorder(&self) -> Vec<NodeId> {
        self.preorder_from(self.root)
    }

    pub fn preorder_from(&self, start: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self[id].children.iter().rev().copied());
        }
        order
    }

    /// Number of nodes reachable from the root
    pub fn node_count(&self) -> usize {
        self.preorder().len()
    }

    /// Artifacts of all reachable non-root nodes in pre-order, i.e. classpath order
    pub fn artifacts(&self) -> Vec<&Artifact> {
        self.preorder()
            .into_iter()
            .filter(|id| *id != self.root)
            .filter_map(|id| self[id].artifact())
            .collect()
    }

    /// Reachable nodes whose artifact has the given group and artifact id
    pub fn find_nodes(&self, group_id: &str, artifact_id: &str) -> Vec<NodeId> {
        self.preorder()
            .into_iter()
            .filter(|id| {
                self[*id]
                    .artifact()
                    .is_some_and(|a| a.group_id == group_id && a.artifact_id == artifact_id)
            })
            .collect()
    }
}

impl Index<NodeId> for DependencyGraph {
    type Output = DependencyNode;

    fn index(&self, id: NodeId) -> &Self::Output {
        &self.nodes[id.0]
    }
}

impl IndexMut<NodeId> for DependencyGraph {
    fn index_mut(&mut self, id: NodeId) -> &mut Self::Output {
        &mut self.nodes[id.0]
    }
}

pub struct Ancestors<'a> {
    graph: &'a DependencyGraph,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.graph[current].parent;
        Some(current)
    }
}
