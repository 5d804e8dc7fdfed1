use arbor_core::{scopes, DependencyGraph};

use super::{DependencyGraphTransformer, TransformationContext};
use crate::error::CollectError;

/// Narrows a generic request context to the classpath a node belongs on,
/// e.g. `project` becomes `project/runtime` for a runtime dependency.
///
/// Contexts starting with the marker are refined unless they already carry
/// a `/` suffix after it, so running the refiner again leaves the graph
/// unchanged.
#[derive(Debug, Clone)]
pub struct ContextRefiner {
    marker: String,
}

impl Default for ContextRefiner {
    fn default() -> Self {
        Self::new("project")
    }
}

impl ContextRefiner {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    pub fn refine(&self, graph: &mut DependencyGraph) {
        for id in graph.preorder() {
            let node = &mut graph[id];
            let unrefined = node
                .request_context
                .strip_prefix(self.marker.as_str())
                .is_some_and(|rest| !rest.contains('/'));
            if !unrefined {
                continue;
            }

            let classpath = match node.scope() {
                scopes::COMPILE | scopes::PROVIDED | scopes::SYSTEM => "compile",
                scopes::RUNTIME => "runtime",
                scopes::TEST => "test",
                _ => continue,
            };
            node.request_context = format!("{}/{}", node.request_context, classpath);
        }
    }
}

impl DependencyGraphTransformer for ContextRefiner {
    fn transform_graph(
        &self,
        graph: &mut DependencyGraph,
        _context: &mut TransformationContext,
    ) -> Result<(), CollectError> {
        self.refine(graph);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::{Artifact, Dependency, DependencyNode, NodeId};
    use pretty_assertions::assert_eq;

    fn contexts(graph: &DependencyGraph) -> Vec<String> {
        graph
            .preorder()
            .into_iter()
            .map(|id: NodeId| graph[id].request_context.clone())
            .collect()
    }

    fn build() -> DependencyGraph {
        let mut root = DependencyNode::root(None);
        root.request_context = "project".to_string();
        let mut graph = DependencyGraph::new(root);
        for (coords, scope, context) in [
            ("g:a:1.0", scopes::COMPILE, "project"),
            ("g:b:1.0", scopes::PROVIDED, "project"),
            ("g:c:1.0", scopes::RUNTIME, "project"),
            ("g:d:1.0", scopes::TEST, "project"),
            ("g:e:1.0", "import", "project"),
            ("g:f:1.0", scopes::RUNTIME, "plugin"),
            ("g:g:1.0", scopes::RUNTIME, "project-site"),
            ("g:h:1.0", scopes::TEST, "project/compile"),
        ] {
            let mut node = DependencyNode::new(Dependency::new(Artifact::parse(coords).unwrap(), scope));
            node.request_context = context.to_string();
            graph.add_child(graph.root(), node);
        }
        graph
    }

    #[test]
    fn test_refines_project_contexts_by_scope() {
        let mut graph = build();
        ContextRefiner::default().refine(&mut graph);

        assert_eq!(
            contexts(&graph),
            vec![
                "project",
                "project/compile",
                "project/compile",
                "project/runtime",
                "project/test",
                "project",
                "plugin",
                "project-site/runtime",
                "project/compile",
            ]
        );
    }

    #[test]
    fn test_refining_twice_changes_nothing() {
        let mut graph = build();
        let refiner = ContextRefiner::default();
        refiner.refine(&mut graph);
        let once = contexts(&graph);
        refiner.refine(&mut graph);

        assert_eq!(contexts(&graph), once);
        assert_eq!(graph.node_count(), 9);
    }
}
