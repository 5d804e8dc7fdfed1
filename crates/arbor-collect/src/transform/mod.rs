//! Passes run over the collected graph

pub mod conflict_marker;
pub mod conflict_resolver;
pub mod context_refiner;

use std::fmt;
use std::sync::Arc;

use arbor_core::DependencyGraph;
use tracing::warn;

use crate::error::CollectError;

pub use conflict_marker::ConflictMarker;
pub use conflict_resolver::NearestVersionConflictResolver;
pub use context_refiner::ContextRefiner;

/// State shared by the transformers of one collection
#[derive(Debug, Default)]
pub struct TransformationContext {
    errors: Vec<CollectError>,
}

impl TransformationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_error(&mut self, error: CollectError) {
        self.errors.push(error);
    }

    pub fn errors(&self) -> &[CollectError] {
        &self.errors
    }

    pub fn take_errors(&mut self) -> Vec<CollectError> {
        std::mem::take(&mut self.errors)
    }
}

pub trait DependencyGraphTransformer: fmt::Debug + Send + Sync {
    fn transform_graph(
        &self,
        graph: &mut DependencyGraph,
        context: &mut TransformationContext,
    ) -> Result<(), CollectError>;
}

/// Runs its members in order; a failing member is recorded and the rest still run
#[derive(Debug, Clone, Default)]
pub struct ChainedDependencyGraphTransformer {
    transformers: Vec<Arc<dyn DependencyGraphTransformer>>,
}

impl ChainedDependencyGraphTransformer {
    pub fn new(transformers: Vec<Arc<dyn DependencyGraphTransformer>>) -> Self {
        Self { transformers }
    }

    pub fn then(mut self, transformer: Arc<dyn DependencyGraphTransformer>) -> Self {
        self.transformers.push(transformer);
        self
    }
}

impl DependencyGraphTransformer for ChainedDependencyGraphTransformer {
    fn transform_graph(
        &self,
        graph: &mut DependencyGraph,
        context: &mut TransformationContext,
    ) -> Result<(), CollectError> {
        for transformer in &self.transformers {
            if let Err(e) = transformer.transform_graph(graph, context) {
                warn!("Graph transformer {:?} failed: {}", transformer, e);
                context.record_error(e);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::{Artifact, ArtifactKey, DependencyNode};

    #[derive(Debug)]
    struct Failing;

    impl DependencyGraphTransformer for Failing {
        fn transform_graph(
            &self,
            _graph: &mut DependencyGraph,
            _context: &mut TransformationContext,
        ) -> Result<(), CollectError> {
            Err(CollectError::UnsolvableVersionConflict {
                key: Artifact::parse("g:a:1.0").unwrap().key(),
                constraints: Vec::new(),
            })
        }
    }

    #[derive(Debug)]
    struct Relabel;

    impl DependencyGraphTransformer for Relabel {
        fn transform_graph(
            &self,
            graph: &mut DependencyGraph,
            _context: &mut TransformationContext,
        ) -> Result<(), CollectError> {
            let root = graph.root();
            graph[root].request_context = "relabelled".to_string();
            Ok(())
        }
    }

    #[test]
    fn test_chain_records_errors_and_continues() {
        let mut graph = DependencyGraph::new(DependencyNode::root(None));
        let mut context = TransformationContext::new();
        let chain = ChainedDependencyGraphTransformer::default()
            .then(Arc::new(Failing))
            .then(Arc::new(Relabel));

        chain.transform_graph(&mut graph, &mut context).unwrap();

        assert_eq!(graph[graph.root()].request_context, "relabelled");
        assert_eq!(context.errors().len(), 1);
        let expected_key: ArtifactKey = Artifact::parse("g:a:1.0").unwrap().key();
        assert!(matches!(
            &context.errors()[0],
            CollectError::UnsolvableVersionConflict { key, .. } if *key == expected_key
        ));
        assert_eq!(context.take_errors().len(), 1);
        assert!(context.errors().is_empty());
    }
}
