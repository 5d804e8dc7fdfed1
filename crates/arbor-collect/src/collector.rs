//! Recursive dependency graph collection
//!
//! Starting from the root, every declared dependency is run through the
//! session's selector and manager, its version constraint is resolved and a
//! node is created per matching version. Descriptors of those versions supply
//! the next level. The children collected below an artifact are memoized per
//! run, and an artifact expanded again under identical conditions gets a copy
//! of them instead of having them collected twice.

use std::sync::Arc;

use arbor_core::{
    aggregate_repositories, merge_dependencies, Artifact, ArtifactRepository, Dependency,
    DependencyGraph, DependencyNode, NodeId, RemoteRepository,
};
use tracing::{debug, info, trace, warn};

use crate::error::{CollectError, DependencyCollectionError};
use crate::policy::{CollectionContext, Policies};
use crate::pool::{CachedDescriptor, DataPool, NodeKey};
use crate::services::{
    ArtifactDescriptor, ArtifactDescriptorReader, DescriptorRequest, VersionRangeRequest,
    VersionRangeResolver, VersionRangeResult,
};
use crate::session::CollectSession;
use crate::transform::TransformationContext;

/// What to collect.
///
/// With a root dependency, its descriptor contributes dependencies, managed
/// dependencies and repositories; entries given here win over those. Without
/// one, `dependencies` are collected below an anonymous root, optionally
/// labelled by `root_artifact`.
#[derive(Debug, Clone, Default)]
pub struct CollectRequest {
    pub root: Option<Dependency>,
    pub root_artifact: Option<Artifact>,
    pub dependencies: Vec<Dependency>,
    pub managed_dependencies: Vec<Dependency>,
    pub repositories: Vec<RemoteRepository>,
    /// Overrides the session's request context
    pub request_context: Option<String>,
}

impl CollectRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_root(root: Dependency) -> Self {
        Self {
            root: Some(root),
            ..Default::default()
        }
    }

    pub fn with_root_artifact(mut self, artifact: Artifact) -> Self {
        self.root_artifact = Some(artifact);
        self
    }

    pub fn with_dependency(mut self, dependency: Dependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    pub fn with_dependencies(mut self, dependencies: impl IntoIterator<Item = Dependency>) -> Self {
        self.dependencies.extend(dependencies);
        self
    }

    pub fn with_managed_dependencies(
        mut self,
        managed: impl IntoIterator<Item = Dependency>,
    ) -> Self {
        self.managed_dependencies.extend(managed);
        self
    }

    pub fn with_repository(mut self, repository: RemoteRepository) -> Self {
        self.repositories.push(repository);
        self
    }

    pub fn with_request_context(mut self, context: impl Into<String>) -> Self {
        self.request_context = Some(context.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct CollectResult {
    pub graph: DependencyGraph,
    pub errors: Vec<CollectError>,
    /// How many nodes got copies of previously collected children
    pub reused_subtrees: usize,
}

impl CollectResult {
    pub fn root(&self) -> NodeId {
        self.graph.root()
    }
}

pub struct DependencyCollector<'a> {
    descriptor_reader: &'a dyn ArtifactDescriptorReader,
    range_resolver: &'a dyn VersionRangeResolver,
}

impl<'a> DependencyCollector<'a> {
    pub fn new(
        descriptor_reader: &'a dyn ArtifactDescriptorReader,
        range_resolver: &'a dyn VersionRangeResolver,
    ) -> Self {
        Self {
            descriptor_reader,
            range_resolver,
        }
    }

    /// Collect the graph for `request` and run the session's transformer over it.
    ///
    /// Failing to resolve or read the root aborts at once. Failures below the
    /// root only drop the affected dependency. Either way an error carries the
    /// partial result with every recorded error.
    pub fn collect(
        &self,
        session: &CollectSession,
        request: CollectRequest,
    ) -> Result<CollectResult, DependencyCollectionError> {
        let request_context = request
            .request_context
            .clone()
            .unwrap_or_else(|| session.request_context().to_string());

        let (mut root_node, dependencies, managed, repositories) = match &request.root {
            Some(root) => {
                info!("Collecting dependencies for {}", root.artifact);
                match self.resolve_root(root, &request.repositories, &request_context) {
                    Ok((node, descriptor)) => (
                        node,
                        merge_dependencies(&request.dependencies, &descriptor.dependencies),
                        merge_dependencies(
                            &request.managed_dependencies,
                            &descriptor.managed_dependencies,
                        ),
                        aggregate_repositories(&request.repositories, &descriptor.repositories),
                    ),
                    Err(error) => {
                        warn!("Failed to resolve root {}: {}", root.artifact, error);
                        let mut node = DependencyNode::new(root.clone());
                        node.repositories = request.repositories.clone();
                        node.request_context = request_context;
                        return Err(DependencyCollectionError::new(CollectResult {
                            graph: DependencyGraph::new(node),
                            errors: vec![error],
                            reused_subtrees: 0,
                        }));
                    }
                }
            }
            None => {
                info!(
                    "Collecting {} dependencies without a root dependency",
                    request.dependencies.len()
                );
                (
                    DependencyNode::root(request.root_artifact.clone()),
                    request.dependencies.clone(),
                    request.managed_dependencies.clone(),
                    request.repositories.clone(),
                )
            }
        };
        root_node.repositories = request.repositories.clone();
        root_node.request_context = request_context.clone();

        let mut run = CollectionRun {
            descriptor_reader: self.descriptor_reader,
            range_resolver: self.range_resolver,
            session,
            request_context,
            pool: DataPool::new(),
            reused_subtrees: 0,
            errors: Vec::new(),
            graph: DependencyGraph::new(root_node),
        };

        let root = run.graph.root();
        let root_dependency = run.graph[root].dependency.clone();
        let traverse = root_dependency
            .as_ref()
            .map_or(true, |d| session.traverser().traverse_dependency(d));

        if traverse && !dependencies.is_empty() {
            let context = CollectionContext {
                config: session.config(),
                dependency: root_dependency.as_ref(),
                managed_dependencies: &managed,
            };
            let policies = session.policies().derive(&context);
            run.process(root, &dependencies, &repositories, &policies);
        } else {
            debug!("Nothing to expand below the root");
        }

        let CollectionRun {
            mut graph,
            mut errors,
            pool,
            reused_subtrees,
            ..
        } = run;
        debug!(
            "Pooled {} subtrees, reused {} times",
            pool.node_count(),
            reused_subtrees
        );

        let mut transformation = TransformationContext::new();
        if let Err(error) = session
            .transformer()
            .transform_graph(&mut graph, &mut transformation)
        {
            warn!("Failed to transform dependency graph: {}", error);
            errors.push(error);
        }
        errors.extend(transformation.take_errors());

        info!(
            "Collected {} nodes with {} errors",
            graph.node_count(),
            errors.len()
        );

        let result = CollectResult {
            graph,
            errors,
            reused_subtrees,
        };
        if result.errors.is_empty() {
            Ok(result)
        } else {
            Err(DependencyCollectionError::new(result))
        }
    }

    /// Resolve the root to its highest available version and read its descriptor
    fn resolve_root(
        &self,
        root: &Dependency,
        repositories: &[RemoteRepository],
        request_context: &str,
    ) -> Result<(DependencyNode, ArtifactDescriptor), CollectError> {
        let range_request =
            VersionRangeRequest::new(root.artifact.clone(), repositories.to_vec(), request_context);
        let range = self
            .range_resolver
            .resolve_version_range(&range_request)
            .map_err(|e| CollectError::VersionRangeResolution {
                artifact: root.artifact.clone(),
                reason: format!("{:#}", e),
            })?;

        let version = range
            .highest_version()
            .cloned()
            .ok_or_else(|| CollectError::EmptyVersionRange {
                artifact: root.artifact.clone(),
                constraint: range.constraint.to_string(),
            })?;

        let artifact = root.artifact.with_version(version.as_str());
        let descriptor_request =
            DescriptorRequest::new(artifact.clone(), repositories.to_vec(), request_context);
        let descriptor = self
            .descriptor_reader
            .read_artifact_descriptor(&descriptor_request)
            .map_err(|e| CollectError::ArtifactDescriptor {
                artifact,
                reason: format!("{:#}", e),
            })?;

        let mut node = DependencyNode::new(root.with_artifact(descriptor.artifact.clone()));
        node.version = Some(version);
        node.version_constraint = Some(range.constraint.clone());
        node.relocations = descriptor.relocations.clone();
        node.aliases = descriptor.aliases.clone();
        Ok((node, descriptor))
    }
}

/// State of one `collect` call
struct CollectionRun<'c, 's> {
    descriptor_reader: &'c dyn ArtifactDescriptorReader,
    range_resolver: &'c dyn VersionRangeResolver,
    session: &'s CollectSession,
    request_context: String,
    pool: DataPool,
    reused_subtrees: usize,
    errors: Vec<CollectError>,
    graph: DependencyGraph,
}

impl CollectionRun<'_, '_> {
    fn process(
        &mut self,
        parent: NodeId,
        dependencies: &[Dependency],
        repositories: &[RemoteRepository],
        policies: &Policies,
    ) {
        for dependency in dependencies {
            self.process_dependency(parent, dependency, repositories, policies);
        }
    }

    fn process_dependency(
        &mut self,
        parent: NodeId,
        declared: &Dependency,
        repositories: &[RemoteRepository],
        policies: &Policies,
    ) {
        if !policies.selector.select_dependency(declared) {
            trace!("Dependency {} not selected", declared);
            return;
        }

        let mut dependency = declared.clone();
        let mut relocations: Vec<Artifact> = Vec::new();
        let mut disable_version_management = false;

        'dependency: loop {
            let mut premanaged_version = None;
            let mut premanaged_scope = None;

            if let Some(management) = policies.manager.manage_dependency(&dependency) {
                if let Some(version) = management.version.filter(|_| !disable_version_management) {
                    premanaged_version = Some(dependency.artifact.version.clone());
                    dependency = dependency.with_artifact(dependency.artifact.with_version(version));
                }
                if let Some(properties) = management.properties {
                    dependency =
                        dependency.with_artifact(dependency.artifact.with_properties(properties));
                }
                if let Some(scope) = management.scope {
                    premanaged_scope = Some(dependency.scope.clone());
                    dependency = dependency.with_scope(scope);
                }
                if let Some(exclusions) = management.exclusions {
                    dependency = dependency.with_exclusions(exclusions);
                }
            }
            disable_version_management = false;

            // a dependency that already points at a file is a leaf
            let system = dependency.artifact.file().is_some();

            let Some(range) = self.resolve_range(&dependency, repositories) else {
                return;
            };

            for version in &range.versions {
                let candidate =
                    dependency.with_artifact(dependency.artifact.with_version(version.as_str()));

                let descriptor = if system {
                    Arc::new(ArtifactDescriptor::new(candidate.artifact.clone()))
                } else {
                    match self.read_descriptor(&candidate, repositories) {
                        Some(descriptor) => descriptor,
                        None => continue,
                    }
                };

                if self.graph.find_duplicate(parent, &descriptor.artifact).is_some() {
                    debug!("Cycle at {}, not descending again", descriptor.artifact);
                    continue;
                }

                if !descriptor.relocations.is_empty() {
                    if relocations.contains(&descriptor.artifact) {
                        warn!("Relocation loop at {}, ignoring", descriptor.artifact);
                        continue;
                    }
                    debug!("{} relocated to {}", candidate.artifact, descriptor.artifact);
                    relocations.extend(descriptor.relocations.iter().cloned());
                    disable_version_management = candidate.artifact.group_id
                        == descriptor.artifact.group_id
                        && candidate.artifact.artifact_id == descriptor.artifact.artifact_id;
                    dependency = candidate.with_artifact(descriptor.artifact.clone());
                    continue 'dependency;
                }

                let mut node = DependencyNode::new(candidate.clone());
                node.version = Some(version.clone());
                node.version_constraint = Some(range.constraint.clone());
                node.premanaged_version = premanaged_version.clone();
                node.premanaged_scope = premanaged_scope.clone();
                node.relocations = relocations.clone();
                node.aliases = descriptor.aliases.clone();
                node.repositories = match range.repository(version) {
                    Some(ArtifactRepository::Remote(repository)) => vec![repository.clone()],
                    Some(ArtifactRepository::Local(_)) => Vec::new(),
                    None => repositories.to_vec(),
                };
                node.request_context = self.request_context.clone();
                let id = self.graph.add_child(parent, node);

                if system
                    || descriptor.dependencies.is_empty()
                    || !policies.traverser.traverse_dependency(&candidate)
                {
                    continue;
                }

                let context = CollectionContext {
                    config: self.session.config(),
                    dependency: Some(&candidate),
                    managed_dependencies: &descriptor.managed_dependencies,
                };
                let child_policies = policies.derive(&context);
                let child_repositories = aggregate_repositories(repositories, &descriptor.repositories);

                let key = NodeKey::new(&descriptor.artifact, &child_repositories, &child_policies);
                match self.pool.node(&key) {
                    Some(cached) => {
                        trace!("Reusing dependencies collected below {}", descriptor.artifact);
                        self.reuse_children(cached, id);
                    }
                    None => {
                        self.process(id, &descriptor.dependencies, &child_repositories, &child_policies);
                        self.pool.put_node(key, id);
                    }
                }
            }

            break;
        }
    }

    /// Copy the children collected below `cached` to `target`
    fn reuse_children(&mut self, cached: NodeId, target: NodeId) {
        self.reused_subtrees += 1;
        for child in self.graph.children(cached).to_vec() {
            if self.graph.clone_subtree(child, target).is_none() {
                debug!("Not copying a dependency that is also an ancestor of its new parent");
            }
        }
    }

    fn resolve_range(
        &mut self,
        dependency: &Dependency,
        repositories: &[RemoteRepository],
    ) -> Option<Arc<VersionRangeResult>> {
        let request = VersionRangeRequest::new(
            dependency.artifact.clone(),
            repositories.to_vec(),
            self.request_context.clone(),
        );
        if let Some(cached) = self.pool.range(&request) {
            return Some(cached);
        }

        let result = match self.range_resolver.resolve_version_range(&request) {
            Ok(result) => result,
            Err(e) => {
                self.record(CollectError::VersionRangeResolution {
                    artifact: dependency.artifact.clone(),
                    reason: format!("{:#}", e),
                });
                return None;
            }
        };

        if result.versions.is_empty() {
            self.record(CollectError::EmptyVersionRange {
                artifact: dependency.artifact.clone(),
                constraint: result.constraint.to_string(),
            });
            return None;
        }

        let result = Arc::new(result);
        self.pool.put_range(request, Arc::clone(&result));
        Some(result)
    }

    fn read_descriptor(
        &mut self,
        dependency: &Dependency,
        repositories: &[RemoteRepository],
    ) -> Option<Arc<ArtifactDescriptor>> {
        let request = DescriptorRequest::new(
            dependency.artifact.clone(),
            repositories.to_vec(),
            self.request_context.clone(),
        );
        match self.pool.descriptor(&request) {
            Some(CachedDescriptor::Found(descriptor)) => return Some(descriptor),
            Some(CachedDescriptor::Failed) => return None,
            None => {}
        }

        match self.descriptor_reader.read_artifact_descriptor(&request) {
            Ok(descriptor) => {
                let descriptor = Arc::new(descriptor);
                self.pool
                    .put_descriptor(request, CachedDescriptor::Found(Arc::clone(&descriptor)));
                Some(descriptor)
            }
            Err(e) => {
                self.record(CollectError::ArtifactDescriptor {
                    artifact: dependency.artifact.clone(),
                    reason: format!("{:#}", e),
                });
                self.pool.put_descriptor(request, CachedDescriptor::Failed);
                None
            }
        }
    }

    fn record(&mut self, error: CollectError) {
        warn!("{}", error);
        self.errors.push(error);
    }
}
