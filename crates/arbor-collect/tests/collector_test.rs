//! Collector behavior around errors, memoization, management and repositories

mod common;

use std::io::Write;
use std::path::PathBuf;

use arbor_collect::{CollectError, CollectRequest, CollectSession, SessionConfig};
use arbor_core::{scopes, Artifact, Dependency, PROPERTY_INCLUDES_DEPENDENCIES};
use arbor_test_fixtures::{DependencySpec, StubArtifact, StubRepository};
use common::{collect, dependency, fixture, raw_session, request, versions_of};
use insta::assert_snapshot;
use pretty_assertions::assert_eq;

#[test]
fn test_failures_below_root_are_recorded_and_skipped() {
    let stub = fixture("failures");
    let err = collect(&stub, &CollectSession::default(), request(&stub, "org.example:app:1.0"))
        .unwrap_err();

    let kinds: Vec<(&str, String)> = err
        .errors()
        .iter()
        .map(|error| match error {
            CollectError::ArtifactDescriptor { artifact, .. } => ("descriptor", artifact.artifact_id.clone()),
            CollectError::EmptyVersionRange { artifact, .. } => ("empty", artifact.artifact_id.clone()),
            CollectError::VersionRangeResolution { artifact, .. } => ("range", artifact.artifact_id.clone()),
            other => panic!("unexpected error: {}", other),
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            ("descriptor", "corrupt".to_string()),
            ("descriptor", "ghost".to_string()),
            ("empty", "c".to_string()),
            ("range", "flaky".to_string()),
        ]
    );
    assert!(err.to_string().contains("(and 3 more)"));

    // a failed descriptor is read once even though two parents ask for it
    assert_eq!(stub.descriptor_reads_of("org.example:corrupt:1.0"), 1);

    let result = err.into_result();
    assert_snapshot!(result.graph.dump().to_string(), @r"
    org.example:app:jar:1.0 [compile]
    +- org.example:a:jar:1.0 [compile]
    |  \- org.example:ok:jar:1.0 [compile]
    \- org.example:b:jar:1.0 [compile]
    ");
}

#[test]
fn test_unreadable_root_aborts_collection() {
    let stub = fixture("failures");

    for (coords, reason) in [
        ("org.example:broken-root:1.0", "not a descriptor"),
        ("org.example:nowhere:1.0", "Could not find artifact"),
    ] {
        let err = collect(&stub, &CollectSession::default(), request(&stub, coords)).unwrap_err();
        assert_eq!(err.errors().len(), 1);
        assert!(
            matches!(&err.errors()[0], CollectError::ArtifactDescriptor { reason: r, .. } if r.contains(reason)),
            "{}",
            err
        );

        let result = err.into_result();
        assert_eq!(result.graph.node_count(), 1);
        assert_eq!(
            result.graph[result.root()].artifact().map(|a| a.to_string()),
            Some(Artifact::parse(coords).unwrap().to_string())
        );
    }
    assert_eq!(stub.descriptor_reads(), 2);
}

#[test]
fn test_unresolvable_root_version_aborts_collection() {
    let stub = fixture("failures");

    let err = collect(&stub, &CollectSession::default(), request(&stub, "org.example:flaky:1.0"))
        .unwrap_err();
    assert!(matches!(&err.errors()[0], CollectError::VersionRangeResolution { .. }));

    let err = collect(&stub, &CollectSession::default(), request(&stub, "org.example:c:[2.0,)"))
        .unwrap_err();
    assert!(matches!(&err.errors()[0], CollectError::EmptyVersionRange { constraint, .. } if constraint == "[2.0,)"));
    assert_eq!(stub.descriptor_reads(), 0);
}

#[test]
fn test_root_range_resolves_to_highest_version() -> Result<(), Box<dyn std::error::Error>> {
    let stub = fixture("nearest_wins");
    let result = collect(&stub, &CollectSession::default(), request(&stub, "org.example:c:[1.0,)"))?;

    let root = &result.graph[result.root()];
    assert_eq!(root.artifact().map(|a| a.version.as_str()), Some("2.0"));
    assert_eq!(
        root.version_constraint.as_ref().map(|c| c.to_string()),
        Some("[1.0,)".to_string())
    );
    assert_eq!(result.graph.node_count(), 1);
    Ok(())
}

#[test]
fn test_identical_subtrees_are_collected_once() -> Result<(), Box<dyn std::error::Error>> {
    let stub = fixture("shared");
    let result = collect(&stub, &raw_session(), request(&stub, "org.example:app:1.0"))?;

    // app, a, x, d, e, y: the second d and everything below it is copied
    assert_eq!(stub.descriptor_reads(), 6);
    assert_eq!(stub.range_resolutions(), 6);
    assert_eq!(stub.descriptor_reads_of("org.example:d:1.0"), 1);
    assert_eq!(result.reused_subtrees, 1);

    // e -> a closes a cycle and is not followed
    assert_snapshot!(result.graph.dump().to_string(), @r"
    org.example:app:jar:1.0 [compile]
    \- org.example:a:jar:1.0 [compile]
       +- org.example:x:jar:1.0 [compile]
       |  \- org.example:d:jar:1.0 [compile]
       |     \- org.example:e:jar:1.0 [compile]
       \- org.example:y:jar:1.0 [compile]
          \- org.example:d:jar:1.0 [compile]
             \- org.example:e:jar:1.0 [compile]
    ");

    for id in result.graph.preorder() {
        if let Some(parent) = result.graph.parent(id) {
            assert_eq!(result.graph.depth(id), result.graph.depth(parent) + 1);
            assert!(result.graph.children(parent).contains(&id));
        }
    }
    Ok(())
}

#[test]
fn test_shared_subtree_resolves_to_single_copy() -> Result<(), Box<dyn std::error::Error>> {
    let stub = fixture("shared");
    let result = collect(&stub, &CollectSession::default(), request(&stub, "org.example:app:1.0"))?;

    assert_eq!(versions_of(&result.graph, "d"), vec!["1.0"]);
    assert_eq!(versions_of(&result.graph, "e"), vec!["1.0"]);
    let y = result.graph.find_nodes("org.example", "y")[0];
    assert!(result.graph.children(y).is_empty());
    Ok(())
}

#[test]
fn test_diamond_below_direct_dependencies_is_copied() -> Result<(), Box<dyn std::error::Error>> {
    let stub = fixture("diamond");

    let raw = collect(&stub, &raw_session(), request(&stub, "org.example:app:1.0"))?;
    assert_eq!(raw.reused_subtrees, 1);
    assert_eq!(stub.descriptor_reads(), 5);
    assert_eq!(stub.descriptor_reads_of("org.example:d:1.0"), 1);
    assert_snapshot!(raw.graph.dump().to_string(), @r"
    org.example:app:jar:1.0 [compile]
    +- org.example:a:jar:1.0 [compile]
    |  \- org.example:c:jar:1.0 [compile]
    |     \- org.example:d:jar:1.0 [compile]
    \- org.example:b:jar:1.0 [compile]
       \- org.example:c:jar:1.0 [compile]
          \- org.example:d:jar:1.0 [compile]
    ");

    let resolved = collect(&stub, &CollectSession::default(), request(&stub, "org.example:app:1.0"))?;
    assert_eq!(resolved.reused_subtrees, 1);
    assert_snapshot!(resolved.graph.dump().to_string(), @r"
    org.example:app:jar:1.0 [compile]
    +- org.example:a:jar:1.0 [compile]
    |  \- org.example:c:jar:1.0 [compile]
    |     \- org.example:d:jar:1.0 [compile]
    \- org.example:b:jar:1.0 [compile]
    ");
    Ok(())
}

#[test]
fn test_copied_children_get_a_node_of_their_own() -> Result<(), Box<dyn std::error::Error>> {
    let stub = StubRepository::default()
        .with(
            StubArtifact::new("org.example:app:1.0")
                .depends_on("org.example:a:1.0")
                .depends_on("org.example:b:1.0"),
        )
        .with(StubArtifact::new("org.example:a:1.0").depends_on("org.example:old:1.0"))
        .with(StubArtifact::new("org.example:b:1.0").depends_on("org.example:x:2.0"))
        .with(StubArtifact::new("org.example:old:1.0").relocated_to("org.example:x:2.0"))
        .with(StubArtifact::new("org.example:x:2.0").depends_on("org.example:y:1.0"))
        .with(StubArtifact::new("org.example:y:1.0"));
    let result = collect(&stub, &raw_session(), request(&stub, "org.example:app:1.0"))?;

    // only the path through the relocation reports it
    assert_eq!(result.reused_subtrees, 1);
    assert_snapshot!(result.graph.dump().to_string(), @r"
    org.example:app:jar:1.0 [compile]
    +- org.example:a:jar:1.0 [compile]
    |  \- org.example:x:jar:2.0 [compile] (relocated from org.example:old:jar:1.0)
    |     \- org.example:y:jar:1.0 [compile]
    \- org.example:b:jar:1.0 [compile]
       \- org.example:x:jar:2.0 [compile]
          \- org.example:y:jar:1.0 [compile]
    ");

    let direct = result.graph.find_nodes("org.example", "x")[1];
    assert!(result.graph[direct].relocations.is_empty());
    assert_eq!(
        result.graph[direct].version_constraint.as_ref().map(|c| c.to_string()),
        Some("2.0".to_string())
    );
    Ok(())
}

#[test]
fn test_management_applies_from_second_level() -> Result<(), Box<dyn std::error::Error>> {
    let stub = fixture("management");
    let result = collect(&stub, &CollectSession::default(), request(&stub, "org.example:app:1.0"))?;

    // the managed exclusion keeps e out from below d
    assert_snapshot!(result.graph.dump().to_string(), @r"
    org.example:app:jar:1.0 [compile]
    \- org.example:a:jar:1.0 [compile]
       +- org.example:c:jar:2.0 [runtime] (version managed from 1.0) (scope managed from compile)
       \- org.example:d:jar:3.0 [compile] (version managed from 2.0)
          \- org.example:f:jar:1.0 [compile]
    ");

    let c = result.graph.find_nodes("org.example", "c")[0];
    assert_eq!(result.graph[c].premanaged_scope.as_deref(), Some(scopes::COMPILE));
    assert_eq!(result.graph[c].request_context, "project/runtime");
    assert_eq!(result.graph[result.root()].request_context, "project/compile");
    Ok(())
}

#[test]
fn test_request_management_wins_over_descriptor() -> Result<(), Box<dyn std::error::Error>> {
    let stub = fixture("management");
    let request = request(&stub, "org.example:app:1.0")
        .with_managed_dependencies(vec![Dependency::new(Artifact::parse("org.example:c:1.0")?, "")]);
    let result = collect(&stub, &CollectSession::default(), request)?;

    // the request's entry replaces the descriptor's one as a whole
    let c = &result.graph[result.graph.find_nodes("org.example", "c")[0]];
    assert_eq!(c.artifact().map(|a| a.version.as_str()), Some("1.0"));
    assert_eq!(c.premanaged_version.as_deref(), Some("1.0"));
    assert_eq!(c.scope(), scopes::COMPILE);
    assert_eq!(c.premanaged_scope, None);
    Ok(())
}

#[test]
fn test_dependencies_without_root() -> Result<(), Box<dyn std::error::Error>> {
    let stub = fixture("optional");
    let request = CollectRequest::new()
        .with_root_artifact(Artifact::parse("org.example:app:1.0")?)
        .with_dependency(dependency("org.example:a:1.0").with_scope(scopes::TEST))
        .with_repository(stub.repository().clone());
    let result = collect(&stub, &CollectSession::default(), request)?;

    // direct dependencies keep test scope when there is no root dependency
    assert_snapshot!(result.graph.dump().to_string(), @r"
    org.example:app:jar:1.0
    \- org.example:a:jar:1.0 [test]
       \- org.example:c:jar:1.0 [compile]
    ");

    let anonymous = collect(
        &stub,
        &CollectSession::default(),
        CollectRequest::new().with_repository(stub.repository().clone()),
    )?;
    assert_eq!(anonymous.graph.dump().to_string(), "(root)\n");
    Ok(())
}

#[test]
fn test_transitive_scopes_are_filtered() -> Result<(), Box<dyn std::error::Error>> {
    let stub = StubRepository::default()
        .with(
            StubArtifact::new("org.example:app:1.0")
                .depends_on("org.example:lib:1.0")
                .depends_on(DependencySpec::new("org.example:junit:4.0").scope(scopes::TEST)),
        )
        .with(
            StubArtifact::new("org.example:lib:1.0")
                .depends_on(DependencySpec::new("org.example:servlet:3.0").scope(scopes::PROVIDED))
                .depends_on(DependencySpec::new("org.example:driver:1.0").scope(scopes::RUNTIME)),
        )
        .with(StubArtifact::new("org.example:junit:4.0"))
        .with(StubArtifact::new("org.example:servlet:3.0"))
        .with(StubArtifact::new("org.example:driver:1.0"));
    let result = collect(&stub, &CollectSession::default(), request(&stub, "org.example:app:1.0"))?;

    assert_snapshot!(result.graph.dump().to_string(), @r"
    org.example:app:jar:1.0 [compile]
    \- org.example:lib:jar:1.0 [compile]
       \- org.example:driver:jar:1.0 [runtime]
    ");
    Ok(())
}

#[test]
fn test_system_dependency_is_a_leaf() -> Result<(), Box<dyn std::error::Error>> {
    let stub = StubRepository::default();
    let tools = Artifact::parse("com.sun:tools:1.8")?.with_file(Some(PathBuf::from("/opt/jdk/lib/tools.jar")));
    let request = CollectRequest::new()
        .with_root_artifact(Artifact::parse("org.example:app:1.0")?)
        .with_dependency(Dependency::new(tools, scopes::SYSTEM))
        .with_repository(stub.repository().clone());
    let result = collect(&stub, &CollectSession::default(), request)?;

    assert_eq!(stub.descriptor_reads(), 0);
    let node = &result.graph[result.graph.children(result.root())[0]];
    assert_eq!(
        node.artifact().and_then(|a| a.file()),
        Some(PathBuf::from("/opt/jdk/lib/tools.jar").as_path())
    );
    assert_eq!(node.request_context, "project/compile");
    Ok(())
}

#[test]
fn test_node_repositories_follow_where_versions_were_found() -> Result<(), Box<dyn std::error::Error>>
{
    let stub = StubRepository::default()
        .with(
            StubArtifact::new("org.example:app:1.0")
                .depends_on("org.example:lib:1.0")
                .depends_on("org.example:cached:1.0"),
        )
        .with(StubArtifact::new("org.example:lib:1.0"))
        .with(StubArtifact::new("org.example:cached:1.0").local());
    let result = collect(&stub, &CollectSession::default(), request(&stub, "org.example:app:1.0"))?;

    let lib = result.graph.find_nodes("org.example", "lib")[0];
    let cached = result.graph.find_nodes("org.example", "cached")[0];
    assert_eq!(result.graph[lib].repositories, vec![stub.repository().clone()]);
    assert!(result.graph[cached].repositories.is_empty());
    Ok(())
}

#[test]
fn test_fat_artifacts_are_not_traversed() -> Result<(), Box<dyn std::error::Error>> {
    let stub = StubRepository::default()
        .with(
            StubArtifact::new("org.example:app:1.0").depends_on(
                DependencySpec::new("org.example:fat:1.0").property(PROPERTY_INCLUDES_DEPENDENCIES, "true"),
            ),
        )
        .with(StubArtifact::new("org.example:fat:1.0").depends_on("org.example:inner:1.0"))
        .with(StubArtifact::new("org.example:inner:1.0"));
    let result = collect(&stub, &CollectSession::default(), request(&stub, "org.example:app:1.0"))?;

    let fat = result.graph.find_nodes("org.example", "fat")[0];
    assert!(result.graph.children(fat).is_empty());
    assert_eq!(stub.descriptor_reads_of("org.example:inner:1.0"), 0);
    Ok(())
}

#[test]
fn test_explicit_request_context_is_not_refined() -> Result<(), Box<dyn std::error::Error>> {
    let stub = fixture("nearest_wins");
    let result = collect(
        &stub,
        &CollectSession::default(),
        request(&stub, "org.example:app:1.0").with_request_context("plugin"),
    )?;

    for id in result.graph.preorder() {
        assert_eq!(result.graph[id].request_context, "plugin");
    }
    Ok(())
}

#[test]
fn test_session_from_config_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
    writeln!(file, "transitive_excluded_scopes = []")?;
    writeln!(file, "include_optional_transitives = true")?;
    writeln!(file, "classpath_context = \"build\"")?;
    let config = SessionConfig::load_from_path(file.path())?;

    let stub = StubRepository::default()
        .with(StubArtifact::new("org.example:app:1.0").depends_on("org.example:lib:1.0"))
        .with(
            StubArtifact::new("org.example:lib:1.0")
                .depends_on(DependencySpec::new("org.example:junit:4.0").scope(scopes::TEST).optional()),
        )
        .with(StubArtifact::new("org.example:junit:4.0"));
    let session = CollectSession::from_config(config);
    let result = collect(&stub, &session, request(&stub, "org.example:app:1.0"))?;

    assert_eq!(versions_of(&result.graph, "junit"), vec!["4.0"]);
    // only the configured marker is refined
    assert_eq!(result.graph[result.root()].request_context, "project");
    Ok(())
}

#[test]
fn test_fixture_loaded_from_json_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile()?;
    write!(
        file,
        r#"{{"artifacts": [
            {{"coords": "org.example:app:1.0", "dependencies": ["org.example:lib:1.0"]}},
            {{"coords": "org.example:lib:1.0"}}
        ]}}"#
    )?;
    let stub = StubRepository::load_from_path(file.path())?;
    let result = collect(&stub, &CollectSession::default(), request(&stub, "org.example:app:1.0"))?;

    assert_eq!(versions_of(&result.graph, "lib"), vec!["1.0"]);
    Ok(())
}
