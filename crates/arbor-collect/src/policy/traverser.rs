use std::sync::Arc;

use arbor_core::artifact::PROPERTY_INCLUDES_DEPENDENCIES;
use arbor_core::Dependency;

use super::{CollectionContext, DependencyTraverser};

/// Skips the dependencies of artifacts that bundle them already
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FatArtifactTraverser;

impl DependencyTraverser for FatArtifactTraverser {
    fn traverse_dependency(&self, dependency: &Dependency) -> bool {
        dependency
            .artifact
            .property(PROPERTY_INCLUDES_DEPENDENCIES)
            != Some("true")
    }

    fn derive_child_traverser(
        &self,
        _context: &CollectionContext<'_>,
    ) -> Option<Arc<dyn DependencyTraverser>> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StaticDependencyTraverser {
    traverse: bool,
}

impl StaticDependencyTraverser {
    pub fn new(traverse: bool) -> Self {
        Self { traverse }
    }
}

impl DependencyTraverser for StaticDependencyTraverser {
    fn traverse_dependency(&self, _dependency: &Dependency) -> bool {
        self.traverse
    }

    fn derive_child_traverser(
        &self,
        _context: &CollectionContext<'_>,
    ) -> Option<Arc<dyn DependencyTraverser>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::{scopes, Artifact};
    use std::collections::BTreeMap;

    #[test]
    fn test_fat_artifacts_are_not_traversed() {
        let plain = Artifact::parse("g:a:1.0").unwrap();
        let fat = plain.with_properties(BTreeMap::from([(
            PROPERTY_INCLUDES_DEPENDENCIES.to_string(),
            "true".to_string(),
        )]));

        let traverser = FatArtifactTraverser;
        assert!(traverser.traverse_dependency(&Dependency::new(plain, scopes::COMPILE)));
        assert!(!traverser.traverse_dependency(&Dependency::new(fat, scopes::COMPILE)));
    }

    #[test]
    fn test_static_traverser() {
        let dependency = Dependency::new(Artifact::parse("g:a:1.0").unwrap(), scopes::COMPILE);
        assert!(StaticDependencyTraverser::new(true).traverse_dependency(&dependency));
        assert!(!StaticDependencyTraverser::new(false).traverse_dependency(&dependency));
    }
}
