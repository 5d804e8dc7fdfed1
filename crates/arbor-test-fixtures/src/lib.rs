//! Test fixtures for the arbor dependency collector
//!
//! [`StubRepository`] serves artifact descriptors and version ranges from an
//! in-memory set of artifacts, described in YAML/JSON fixtures or assembled
//! with [`StubArtifact`]. It counts the requests it answers so tests can check
//! what the collector memoized.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, bail, Context, Result};
use arbor_collect::{
    ArtifactDescriptor, ArtifactDescriptorReader, DescriptorRequest, VersionRangeRequest,
    VersionRangeResolver, VersionRangeResult,
};
use arbor_core::{
    scopes, Artifact, ArtifactRepository, Dependency, Exclusion, LocalRepository,
    RemoteRepository, Version, VersionConstraint,
};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

/// Install a test-friendly subscriber once; `RUST_LOG` overrides the `warn` default
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// A declared dependency: plain coordinates, or a map with scope and friends
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "RawDependencySpec")]
pub struct DependencySpec {
    pub coords: String,
    pub scope: Option<String>,
    pub optional: bool,
    pub exclusions: Vec<String>,
    pub properties: BTreeMap<String, String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDependencySpec {
    Coords(String),
    Detailed {
        coords: String,
        #[serde(default)]
        scope: Option<String>,
        #[serde(default)]
        optional: bool,
        #[serde(default)]
        exclusions: Vec<String>,
        #[serde(default)]
        properties: BTreeMap<String, String>,
    },
}

impl From<RawDependencySpec> for DependencySpec {
    fn from(raw: RawDependencySpec) -> Self {
        match raw {
            RawDependencySpec::Coords(coords) => Self::new(coords),
            RawDependencySpec::Detailed {
                coords,
                scope,
                optional,
                exclusions,
                properties,
            } => Self {
                coords,
                scope,
                optional,
                exclusions,
                properties,
            },
        }
    }
}

impl From<&str> for DependencySpec {
    fn from(coords: &str) -> Self {
        Self::new(coords)
    }
}

impl DependencySpec {
    pub fn new(coords: impl Into<String>) -> Self {
        Self {
            coords: coords.into(),
            ..Default::default()
        }
    }

    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclusions.push(pattern.into());
        self
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Scope defaults to `compile`
    pub fn to_dependency(&self) -> Result<Dependency> {
        self.build(scopes::COMPILE)
    }

    /// Management entries only override the scope when they name one
    pub fn to_managed_dependency(&self) -> Result<Dependency> {
        self.build("")
    }

    fn build(&self, default_scope: &str) -> Result<Dependency> {
        let mut artifact = Artifact::parse(&self.coords)
            .with_context(|| format!("Invalid dependency coordinates {:?}", self.coords))?;
        if !self.properties.is_empty() {
            artifact = artifact.with_properties(self.properties.clone());
        }

        let exclusions = self
            .exclusions
            .iter()
            .map(|pattern| Exclusion::parse(pattern))
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Invalid exclusion on {}", self.coords))?;

        Ok(
            Dependency::new(artifact, self.scope.as_deref().unwrap_or(default_scope))
                .with_optional(self.optional)
                .with_exclusions(exclusions),
        )
    }
}

/// One artifact version known to a [`StubRepository`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StubArtifact {
    pub coords: String,
    #[serde(default)]
    pub dependencies: Vec<DependencySpec>,
    #[serde(default)]
    pub managed: Vec<DependencySpec>,
    /// Coordinates this artifact was moved to
    #[serde(default)]
    pub relocation: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Repositories the descriptor declares
    #[serde(default)]
    pub repositories: Vec<RemoteRepository>,
    /// Reading the descriptor fails with this message
    #[serde(default)]
    pub error: Option<String>,
    /// Served from the local repository rather than the remote one
    #[serde(default)]
    pub local: bool,
}

impl StubArtifact {
    pub fn new(coords: impl Into<String>) -> Self {
        Self {
            coords: coords.into(),
            ..Default::default()
        }
    }

    pub fn depends_on(mut self, dependency: impl Into<DependencySpec>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }

    pub fn manages(mut self, dependency: impl Into<DependencySpec>) -> Self {
        self.managed.push(dependency.into());
        self
    }

    pub fn relocated_to(mut self, coords: impl Into<String>) -> Self {
        self.relocation = Some(coords.into());
        self
    }

    pub fn alias(mut self, coords: impl Into<String>) -> Self {
        self.aliases.push(coords.into());
        self
    }

    pub fn repository(mut self, repository: RemoteRepository) -> Self {
        self.repositories.push(repository);
        self
    }

    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }

    pub fn local(mut self) -> Self {
        self.local = true;
        self
    }
}

/// The document format read by [`StubRepository::from_yaml_str`] and friends
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Fixture {
    #[serde(default = "default_repository")]
    pub repository: RemoteRepository,
    #[serde(default)]
    pub artifacts: Vec<StubArtifact>,
    /// `group:artifact` patterns whose version ranges can't be resolved
    #[serde(default)]
    pub broken_ranges: Vec<String>,
}

fn default_repository() -> RemoteRepository {
    RemoteRepository::new("central", "https://repo.example.org/maven2")
}

#[derive(Debug)]
struct Entry {
    artifact: Artifact,
    dependencies: Vec<Dependency>,
    managed: Vec<Dependency>,
    relocation: Option<Artifact>,
    aliases: Vec<Artifact>,
    repositories: Vec<RemoteRepository>,
    error: Option<String>,
    local: bool,
}

impl Entry {
    fn parse(stub: &StubArtifact) -> Result<Self> {
        let parse_all = |specs: &[DependencySpec], managed: bool| {
            specs
                .iter()
                .map(|spec| {
                    if managed {
                        spec.to_managed_dependency()
                    } else {
                        spec.to_dependency()
                    }
                })
                .collect::<Result<Vec<_>>>()
        };
        let parse_artifact = |coords: &str| {
            Artifact::parse(coords).with_context(|| format!("Invalid coordinates {:?}", coords))
        };

        Ok(Self {
            artifact: parse_artifact(&stub.coords)?,
            dependencies: parse_all(&stub.dependencies, false)?,
            managed: parse_all(&stub.managed, true)?,
            relocation: stub.relocation.as_deref().map(parse_artifact).transpose()?,
            aliases: stub
                .aliases
                .iter()
                .map(|coords| parse_artifact(coords))
                .collect::<Result<_>>()?,
            repositories: stub.repositories.clone(),
            error: stub.error.clone(),
            local: stub.local,
        })
    }

    fn matches(&self, artifact: &Artifact) -> bool {
        self.artifact.key() == artifact.key() && self.artifact.version == artifact.version
    }
}

/// Descriptor reader and version range resolver over a fixed set of artifacts
#[derive(Debug)]
pub struct StubRepository {
    repository: RemoteRepository,
    local: LocalRepository,
    entries: Vec<Entry>,
    broken_ranges: Vec<Exclusion>,
    descriptor_reads: AtomicUsize,
    range_resolutions: AtomicUsize,
    descriptor_log: Mutex<Vec<String>>,
}

impl Default for StubRepository {
    fn default() -> Self {
        Self::new(default_repository())
    }
}

impl StubRepository {
    pub fn new(repository: RemoteRepository) -> Self {
        Self {
            repository,
            local: LocalRepository {
                basedir: PathBuf::from("target/local-repository"),
            },
            entries: Vec::new(),
            broken_ranges: Vec::new(),
            descriptor_reads: AtomicUsize::new(0),
            range_resolutions: AtomicUsize::new(0),
            descriptor_log: Mutex::new(Vec::new()),
        }
    }

    pub fn from_fixture(fixture: Fixture) -> Result<Self> {
        let mut stub = Self::new(fixture.repository);
        for artifact in &fixture.artifacts {
            stub.add(artifact)?;
        }
        for pattern in &fixture.broken_ranges {
            stub.broken_ranges.push(
                Exclusion::parse(pattern)
                    .with_context(|| format!("Invalid broken range pattern {:?}", pattern))?,
            );
        }
        Ok(stub)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let fixture: Fixture =
            serde_yaml::from_str(content).with_context(|| "Failed to parse YAML fixture")?;
        Self::from_fixture(fixture)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let fixture: Fixture =
            serde_json::from_str(content).with_context(|| "Failed to parse JSON fixture")?;
        Self::from_fixture(fixture)
    }

    /// Load a `.json` fixture, or a YAML one for any other extension
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture from {:?}", path))?;

        let stub = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_yaml_str(&content),
        };
        stub.with_context(|| format!("Invalid fixture {:?}", path))
    }

    pub fn add(&mut self, artifact: &StubArtifact) -> Result<()> {
        self.entries.push(Entry::parse(artifact)?);
        Ok(())
    }

    /// Builder form of [`add`](Self::add); panics on malformed coordinates
    pub fn with(mut self, artifact: StubArtifact) -> Self {
        if let Err(e) = self.add(&artifact) {
            panic!("invalid stub artifact {}: {:#}", artifact.coords, e);
        }
        self
    }

    pub fn with_broken_range(mut self, pattern: &str) -> Self {
        match Exclusion::parse(pattern) {
            Ok(exclusion) => self.broken_ranges.push(exclusion),
            Err(e) => panic!("invalid broken range pattern {}: {}", pattern, e),
        }
        self
    }

    pub fn repository(&self) -> &RemoteRepository {
        &self.repository
    }

    pub fn descriptor_reads(&self) -> usize {
        self.descriptor_reads.load(Ordering::SeqCst)
    }

    pub fn range_resolutions(&self) -> usize {
        self.range_resolutions.load(Ordering::SeqCst)
    }

    /// How often the descriptor of `coords` was read
    pub fn descriptor_reads_of(&self, coords: &str) -> usize {
        let wanted = match Artifact::parse(coords) {
            Ok(artifact) => artifact.to_string(),
            Err(_) => coords.to_string(),
        };
        self.descriptor_log
            .lock()
            .map(|log| log.iter().filter(|c| **c == wanted).count())
            .unwrap_or(0)
    }

    fn find(&self, artifact: &Artifact) -> Option<&Entry> {
        self.entries.iter().find(|entry| entry.matches(artifact))
    }

    fn source(&self, entry: &Entry) -> ArtifactRepository {
        if entry.local {
            ArtifactRepository::Local(self.local.clone())
        } else {
            ArtifactRepository::Remote(self.repository.clone())
        }
    }
}

impl ArtifactDescriptorReader for StubRepository {
    fn read_artifact_descriptor(&self, request: &DescriptorRequest) -> Result<ArtifactDescriptor> {
        self.descriptor_reads.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut log) = self.descriptor_log.lock() {
            log.push(request.artifact.to_string());
        }

        let mut artifact = request.artifact.clone();
        let mut relocations = Vec::new();
        let mut visited = HashSet::new();

        loop {
            let entry = self.find(&artifact).ok_or_else(|| {
                anyhow!("Could not find artifact {} in {}", artifact, self.repository.id)
            })?;
            if let Some(message) = &entry.error {
                bail!("Failed to read descriptor of {}: {}", artifact, message);
            }

            match &entry.relocation {
                Some(target) => {
                    if !visited.insert(artifact.to_string()) {
                        bail!("Relocation cycle at {}", artifact);
                    }
                    relocations.push(artifact.clone());
                    artifact = target.clone();
                }
                None => {
                    return Ok(ArtifactDescriptor {
                        artifact,
                        relocations,
                        aliases: entry.aliases.clone(),
                        dependencies: entry.dependencies.clone(),
                        managed_dependencies: entry.managed.clone(),
                        repositories: entry.repositories.clone(),
                    });
                }
            }
        }
    }
}

impl VersionRangeResolver for StubRepository {
    fn resolve_version_range(&self, request: &VersionRangeRequest) -> Result<VersionRangeResult> {
        self.range_resolutions.fetch_add(1, Ordering::SeqCst);
        let artifact = &request.artifact;

        if self.broken_ranges.iter().any(|pattern| pattern.matches(artifact)) {
            bail!(
                "Metadata for {}:{} is unavailable",
                artifact.group_id,
                artifact.artifact_id
            );
        }

        let constraint = VersionConstraint::parse(&artifact.version)
            .with_context(|| format!("Invalid version constraint for {}", artifact))?;
        let mut result = VersionRangeResult::new(constraint.clone());

        if let Some(version) = constraint.version() {
            let source = self.find(artifact).map(|entry| self.source(entry));
            result.add_version(version.clone(), source);
            return Ok(result);
        }

        let key = artifact.key();
        let mut matching: Vec<(Version, ArtifactRepository)> = self
            .entries
            .iter()
            .filter(|entry| entry.artifact.key() == key)
            .filter_map(|entry| {
                Version::parse(&entry.artifact.version)
                    .ok()
                    .map(|version| (version, self.source(entry)))
            })
            .filter(|(version, _)| constraint.contains_version(version))
            .collect();
        matching.sort_by(|a, b| a.0.cmp(&b.0));
        matching.dedup_by(|a, b| a.0 == b.0);

        for (version, source) in matching {
            result.add_version(version, Some(source));
        }
        Ok(result)
    }
}
