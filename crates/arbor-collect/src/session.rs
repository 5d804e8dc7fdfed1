//! Policies and settings for collection requests

use std::sync::Arc;

use crate::config::SessionConfig;
use crate::policy::{
    AndDependencySelector, ClassicDependencyManager, DependencyManager, DependencySelector,
    DependencyTraverser, ExclusionDependencySelector, FatArtifactTraverser,
    OptionalDependencySelector, Policies, ScopeDependencySelector,
};
use crate::transform::{
    ChainedDependencyGraphTransformer, ConflictMarker, ContextRefiner, DependencyGraphTransformer,
    NearestVersionConflictResolver,
};

/// Read-only input to [`DependencyCollector::collect`](crate::DependencyCollector::collect).
///
/// A session can serve any number of requests, also from several threads at
/// once; all per-request state lives in the collector.
#[derive(Debug, Clone)]
pub struct CollectSession {
    config: SessionConfig,
    selector: Arc<dyn DependencySelector>,
    manager: Arc<dyn DependencyManager>,
    traverser: Arc<dyn DependencyTraverser>,
    transformer: Arc<dyn DependencyGraphTransformer>,
}

impl Default for CollectSession {
    fn default() -> Self {
        Self::from_config(SessionConfig::default())
    }
}

impl CollectSession {
    /// Maven-like defaults: scope, optional and exclusion filtering, classic
    /// management, no traversal into fat artifacts, then conflict marking,
    /// nearest-wins resolution and context refinement.
    pub fn from_config(config: SessionConfig) -> Self {
        let mut selectors: Vec<Arc<dyn DependencySelector>> = vec![Arc::new(
            ScopeDependencySelector::excluding(config.transitive_excluded_scopes.iter().cloned()),
        )];
        if !config.include_optional_transitives {
            selectors.push(Arc::new(OptionalDependencySelector::new()));
        }
        selectors.push(Arc::new(ExclusionDependencySelector::new()));

        let transformer = ChainedDependencyGraphTransformer::default()
            .then(Arc::new(ConflictMarker::new()))
            .then(Arc::new(NearestVersionConflictResolver::new()))
            .then(Arc::new(ContextRefiner::new(config.classpath_context.clone())));

        Self {
            selector: Arc::new(AndDependencySelector::new(selectors)),
            manager: Arc::new(ClassicDependencyManager::new()),
            traverser: Arc::new(FatArtifactTraverser),
            transformer: Arc::new(transformer),
            config,
        }
    }

    pub fn with_selector(mut self, selector: Arc<dyn DependencySelector>) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_manager(mut self, manager: Arc<dyn DependencyManager>) -> Self {
        self.manager = manager;
        self
    }

    pub fn with_traverser(mut self, traverser: Arc<dyn DependencyTraverser>) -> Self {
        self.traverser = traverser;
        self
    }

    pub fn with_transformer(mut self, transformer: Arc<dyn DependencyGraphTransformer>) -> Self {
        self.transformer = transformer;
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn selector(&self) -> &Arc<dyn DependencySelector> {
        &self.selector
    }

    pub fn manager(&self) -> &Arc<dyn DependencyManager> {
        &self.manager
    }

    pub fn traverser(&self) -> &Arc<dyn DependencyTraverser> {
        &self.traverser
    }

    pub fn transformer(&self) -> &Arc<dyn DependencyGraphTransformer> {
        &self.transformer
    }

    pub(crate) fn policies(&self) -> Policies {
        Policies {
            selector: Arc::clone(&self.selector),
            manager: Arc::clone(&self.manager),
            traverser: Arc::clone(&self.traverser),
        }
    }

    /// The context used when a request doesn't name one
    pub fn request_context(&self) -> &str {
        &self.config.request_context
    }
}
