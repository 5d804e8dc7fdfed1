//! Helpers shared by the collector integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arbor_collect::{
    ChainedDependencyGraphTransformer, CollectRequest, CollectResult, CollectSession,
    DependencyCollectionError, DependencyCollector,
};
use arbor_core::{scopes, Artifact, Dependency, DependencyGraph};
use arbor_test_fixtures::StubRepository;

pub fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Load `tests/fixtures/<name>.yaml`
pub fn fixture(name: &str) -> StubRepository {
    arbor_test_fixtures::init_tracing();
    let path = fixture_path(&format!("{}.yaml", name));
    StubRepository::load_from_path(&path)
        .unwrap_or_else(|e| panic!("failed to load fixture {}: {:#}", name, e))
}

pub fn dependency(coords: &str) -> Dependency {
    Dependency::new(Artifact::parse(coords).unwrap(), scopes::COMPILE)
}

/// Request rooted at `coords`, served from the stub's repository
pub fn request(stub: &StubRepository, coords: &str) -> CollectRequest {
    CollectRequest::for_root(dependency(coords)).with_repository(stub.repository().clone())
}

pub fn collect(
    stub: &StubRepository,
    session: &CollectSession,
    request: CollectRequest,
) -> Result<CollectResult, DependencyCollectionError> {
    DependencyCollector::new(stub, stub).collect(session, request)
}

/// Session that leaves the collected graph untouched
pub fn raw_session() -> CollectSession {
    CollectSession::default().with_transformer(Arc::new(ChainedDependencyGraphTransformer::default()))
}

/// Versions of every reachable `org.example:<artifact_id>` node, in pre-order
pub fn versions_of(graph: &DependencyGraph, artifact_id: &str) -> Vec<String> {
    graph
        .find_nodes("org.example", artifact_id)
        .into_iter()
        .filter_map(|id| graph[id].artifact().map(|a| a.version.clone()))
        .collect()
}
