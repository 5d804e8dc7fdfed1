//! Conflict group assignment
//!
//! Two nodes conflict when their artifacts share group, artifact id,
//! extension and classifier. Relocations and aliases widen that: a node is
//! also in conflict with anything matching one of the artifacts it was
//! relocated from or is known as. The relation is closed transitively with a
//! union-find over the keys.

use arbor_core::{ArtifactKey, ConflictId, DependencyGraph, NodeId};
use indexmap::IndexSet;
use petgraph::unionfind::UnionFind;
use tracing::debug;

use super::{DependencyGraphTransformer, TransformationContext};
use crate::error::CollectError;

#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictMarker;

impl ConflictMarker {
    pub fn new() -> Self {
        Self
    }

    /// Set `conflict_id` on every reachable node that has a dependency
    pub fn mark(&self, graph: &mut DependencyGraph) {
        let mut keys: IndexSet<ArtifactKey> = IndexSet::new();
        let mut own_keys: Vec<(NodeId, usize)> = Vec::new();
        let mut links: Vec<(usize, usize)> = Vec::new();

        for id in graph.preorder() {
            let node = &graph[id];
            let Some(dependency) = &node.dependency else {
                continue;
            };

            let (own, _) = keys.insert_full(dependency.artifact.key());
            own_keys.push((id, own));

            for other in node.relocations.iter().chain(&node.aliases) {
                let (index, _) = keys.insert_full(other.key());
                links.push((own, index));
            }
        }

        let mut sets = UnionFind::<usize>::new(keys.len());
        for (a, b) in links {
            sets.union(a, b);
        }

        // the first key seen in pre-order names its set
        let mut names = vec![None; keys.len()];
        for index in 0..keys.len() {
            let set = sets.find(index);
            if names[set].is_none() {
                names[set] = Some(index);
            }
        }

        for (id, own) in own_keys {
            let name = names[sets.find(own)].unwrap_or(own);
            graph[id].conflict_id = Some(ConflictId(keys[name].clone()));
        }

        debug!("Marked {} conflict keys", keys.len());
    }
}

impl DependencyGraphTransformer for ConflictMarker {
    fn transform_graph(
        &self,
        graph: &mut DependencyGraph,
        _context: &mut TransformationContext,
    ) -> Result<(), CollectError> {
        self.mark(graph);
        Ok(())
    }
}
