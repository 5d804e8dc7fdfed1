//! Nearest-wins version conflict resolution
//!
//! For every conflict group the node closest to the root decides the
//! version, as long as that version satisfies every range requested for the
//! group anywhere in the graph. Once the winners are known, every other
//! member of a group is cut from the tree together with its subtree.

use arbor_core::{ConflictId, DependencyGraph, NodeId, Version, VersionConstraint};
use indexmap::IndexMap;
use tracing::{debug, trace};

use super::{ConflictMarker, DependencyGraphTransformer, TransformationContext};
use crate::error::CollectError;

#[derive(Debug, Clone)]
struct Candidate {
    version: Version,
    depth: usize,
    parent: Option<NodeId>,
}

#[derive(Debug, Default)]
struct ConflictGroup {
    /// Ranges every candidate has to satisfy
    ranges: Vec<VersionConstraint>,
    /// Every constraint requested for the group, reported when it can't be solved
    requested: Vec<VersionConstraint>,
    candidates: Vec<Candidate>,
    winner: Option<Candidate>,
    pruned: bool,
}

impl ConflictGroup {
    fn accepts(&self, version: &Version) -> bool {
        self.ranges.iter().all(|range| range.contains_version(version))
    }

    fn request(&mut self, constraint: VersionConstraint) {
        if !self.requested.contains(&constraint) {
            self.requested.push(constraint);
        }
    }

    fn add_range(&mut self, constraint: &VersionConstraint) {
        if self.ranges.contains(constraint) {
            return;
        }
        self.ranges.push(constraint.clone());

        let ranges = &self.ranges;
        self.candidates
            .retain(|c| ranges.iter().all(|r| r.contains_version(&c.version)));

        if self
            .winner
            .as_ref()
            .is_some_and(|winner| !self.accepts(&winner.version))
        {
            self.winner = self.reselect();
        }
    }

    fn offer(&mut self, candidate: Candidate) {
        if !self.accepts(&candidate.version) {
            return;
        }

        let wins = match &self.winner {
            None => true,
            Some(winner) => {
                candidate.depth < winner.depth
                    || (candidate.depth == winner.depth
                        && candidate.parent == winner.parent
                        && candidate.version > winner.version)
            }
        };
        if wins {
            self.winner = Some(candidate.clone());
        }
        self.candidates.push(candidate);
    }

    /// The nearest remaining candidate, the highest version among equally near ones
    fn reselect(&self) -> Option<Candidate> {
        self.candidates
            .iter()
            .min_by(|a, b| a.depth.cmp(&b.depth).then_with(|| b.version.cmp(&a.version)))
            .cloned()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NearestVersionConflictResolver {
    marker: ConflictMarker,
}

impl NearestVersionConflictResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick a winner per conflict group and cut all other members from the tree
    pub fn resolve(&self, graph: &mut DependencyGraph) -> Result<(), CollectError> {
        let mut groups = self.solve(graph)?;

        let root = graph.root();
        if let Some(id) = &graph[root].conflict_id {
            if let Some(group) = groups.get_mut(id) {
                group.pruned = true;
            }
        }

        let before = graph.node_count();
        self.prune(graph, &mut groups, root);
        debug!(
            "Resolved {} conflict groups, removed {} nodes",
            groups.len(),
            before - graph.node_count()
        );
        Ok(())
    }

    /// The version each conflict group settles on, without touching the tree shape
    pub fn winners(
        &self,
        graph: &mut DependencyGraph,
    ) -> Result<IndexMap<ConflictId, Version>, CollectError> {
        Ok(self
            .solve(graph)?
            .into_iter()
            .filter_map(|(id, group)| group.winner.map(|winner| (id, winner.version)))
            .collect())
    }

    fn solve(
        &self,
        graph: &mut DependencyGraph,
    ) -> Result<IndexMap<ConflictId, ConflictGroup>, CollectError> {
        let unmarked = graph
            .preorder()
            .into_iter()
            .any(|id| graph[id].dependency.is_some() && graph[id].conflict_id.is_none());
        if unmarked {
            self.marker.mark(graph);
        }

        let groups = self.analyze(graph);
        if let Some((id, group)) = groups.iter().find(|(_, group)| group.winner.is_none()) {
            return Err(CollectError::UnsolvableVersionConflict {
                key: id.0.clone(),
                constraints: group.requested.clone(),
            });
        }
        Ok(groups)
    }

    fn analyze(&self, graph: &DependencyGraph) -> IndexMap<ConflictId, ConflictGroup> {
        let mut groups: IndexMap<ConflictId, ConflictGroup> = IndexMap::new();

        for id in graph.preorder() {
            let node = &graph[id];
            let (Some(conflict_id), Some(version)) = (&node.conflict_id, node_version(graph, id)) else {
                continue;
            };

            let group = groups.entry(conflict_id.clone()).or_default();
            let constraint = node
                .version_constraint
                .clone()
                .unwrap_or_else(|| VersionConstraint::from_version(version.clone()));
            if constraint.is_range() {
                group.add_range(&constraint);
            }
            group.request(constraint);

            trace!("Offering {} at depth {} for {}", version, node.depth(), conflict_id);
            group.offer(Candidate {
                version,
                depth: node.depth(),
                parent: node.parent(),
            });
        }

        groups
    }

    fn prune(
        &self,
        graph: &mut DependencyGraph,
        groups: &mut IndexMap<ConflictId, ConflictGroup>,
        id: NodeId,
    ) {
        let mut kept: Vec<NodeId> = Vec::new();

        for child in graph.children(id).to_vec() {
            let keep = match (&graph[child].conflict_id, node_version(graph, child)) {
                (Some(conflict_id), Some(version)) => match groups.get_mut(conflict_id) {
                    Some(group) => {
                        let chosen = !group.pruned
                            && group.winner.as_ref().is_some_and(|winner| {
                                winner.depth == graph.depth(child) && winner.version == version
                            });
                        if chosen {
                            group.pruned = true;
                        }
                        chosen
                    }
                    None => true,
                },
                _ => true,
            };

            if keep {
                kept.push(child);
                self.prune(graph, groups, child);
            }
        }

        graph.retain_children(id, |child| kept.contains(&child));
    }
}

/// The resolved version, falling back to the declared one for hand-built graphs
fn node_version(graph: &DependencyGraph, id: NodeId) -> Option<Version> {
    let node = &graph[id];
    let dependency = node.dependency.as_ref()?;
    node.version
        .clone()
        .or_else(|| Version::parse(&dependency.artifact.version).ok())
}

impl DependencyGraphTransformer for NearestVersionConflictResolver {
    fn transform_graph(
        &self,
        graph: &mut DependencyGraph,
        _context: &mut TransformationContext,
    ) -> Result<(), CollectError> {
        self.resolve(graph)
    }
}
