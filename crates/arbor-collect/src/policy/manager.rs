use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use arbor_core::{ArtifactKey, Dependency, DependencyManagement, Exclusion};

use super::{CollectionContext, DependencyManager};

/// Maven's classic management rules.
///
/// Management entries are gathered from the root level only. Versions and
/// scopes are enforced from the second level on, so the direct dependencies
/// keep what they declare; exclusions apply everywhere and are added to the
/// dependency's own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ClassicDependencyManager {
    depth: usize,
    managed_versions: BTreeMap<ArtifactKey, String>,
    managed_scopes: BTreeMap<ArtifactKey, String>,
    managed_exclusions: BTreeMap<ArtifactKey, BTreeSet<Exclusion>>,
}

impl ClassicDependencyManager {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DependencyManager for ClassicDependencyManager {
    fn manage_dependency(&self, dependency: &Dependency) -> Option<DependencyManagement> {
        let key = dependency.artifact.key();
        let mut management = DependencyManagement::default();

        if self.depth >= 2 {
            management.version = self.managed_versions.get(&key).cloned();
            management.scope = self.managed_scopes.get(&key).cloned();
        }

        if let Some(exclusions) = self.managed_exclusions.get(&key) {
            let mut merged = dependency.exclusions.clone();
            merged.extend(exclusions.iter().cloned());
            management.exclusions = Some(merged);
        }

        (!management.is_empty()).then_some(management)
    }

    fn derive_child_manager(
        &self,
        context: &CollectionContext<'_>,
    ) -> Option<Arc<dyn DependencyManager>> {
        if self.depth >= 2 {
            return None;
        }
        if self.depth == 1 {
            return Some(Arc::new(Self {
                depth: self.depth + 1,
                ..self.clone()
            }));
        }

        let mut managed_versions = self.managed_versions.clone();
        let mut managed_scopes = self.managed_scopes.clone();
        let mut managed_exclusions = self.managed_exclusions.clone();

        for managed in context.managed_dependencies {
            let key = managed.artifact.key();
            if !managed.artifact.version.is_empty() {
                managed_versions
                    .entry(key.clone())
                    .or_insert_with(|| managed.artifact.version.clone());
            }
            if !managed.scope.is_empty() {
                managed_scopes
                    .entry(key.clone())
                    .or_insert_with(|| managed.scope.clone());
            }
            if !managed.exclusions.is_empty() {
                managed_exclusions
                    .entry(key)
                    .or_default()
                    .extend(managed.exclusions.iter().cloned());
            }
        }

        Some(Arc::new(Self {
            depth: self.depth + 1,
            managed_versions,
            managed_scopes,
            managed_exclusions,
        }))
    }
}

/// Never manages anything
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NoopDependencyManager;

impl DependencyManager for NoopDependencyManager {
    fn manage_dependency(&self, _dependency: &Dependency) -> Option<DependencyManagement> {
        None
    }

    fn derive_child_manager(
        &self,
        _context: &CollectionContext<'_>,
    ) -> Option<Arc<dyn DependencyManager>> {
        None
    }
}
