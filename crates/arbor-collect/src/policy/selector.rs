use std::collections::BTreeSet;
use std::sync::Arc;

use arbor_core::{Dependency, Exclusion};

use super::{CollectionContext, DependencySelector};

/// Filters by scope, but only below the direct dependencies
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ScopeDependencySelector {
    included: BTreeSet<String>,
    excluded: BTreeSet<String>,
    transitive: bool,
}

impl ScopeDependencySelector {
    /// An empty `included` set admits every scope that isn't excluded
    pub fn new<I, E>(included: I, excluded: E) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        E: IntoIterator,
        E::Item: Into<String>,
    {
        Self {
            included: included.into_iter().map(Into::into).collect(),
            excluded: excluded.into_iter().map(Into::into).collect(),
            transitive: false,
        }
    }

    pub fn excluding<E>(excluded: E) -> Self
    where
        E: IntoIterator,
        E::Item: Into<String>,
    {
        Self::new(Vec::<String>::new(), excluded)
    }
}

impl DependencySelector for ScopeDependencySelector {
    fn select_dependency(&self, dependency: &Dependency) -> bool {
        if !self.transitive {
            return true;
        }

        let scope = dependency.scope.as_str();
        (self.included.is_empty() || self.included.contains(scope))
            && !self.excluded.contains(scope)
    }

    fn derive_child_selector(
        &self,
        context: &CollectionContext<'_>,
    ) -> Option<Arc<dyn DependencySelector>> {
        if self.transitive || context.dependency.is_none() {
            return None;
        }

        Some(Arc::new(Self {
            transitive: true,
            ..self.clone()
        }))
    }
}

/// Drops optional dependencies from the second level on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct OptionalDependencySelector {
    depth: usize,
}

impl OptionalDependencySelector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DependencySelector for OptionalDependencySelector {
    fn select_dependency(&self, dependency: &Dependency) -> bool {
        self.depth < 2 || !dependency.optional
    }

    fn derive_child_selector(
        &self,
        _context: &CollectionContext<'_>,
    ) -> Option<Arc<dyn DependencySelector>> {
        if self.depth >= 2 {
            return None;
        }
        Some(Arc::new(Self {
            depth: self.depth + 1,
        }))
    }
}

/// Honors the exclusions of every dependency on the path from the root
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ExclusionDependencySelector {
    exclusions: BTreeSet<Exclusion>,
}

impl ExclusionDependencySelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exclusions(exclusions: impl IntoIterator<Item = Exclusion>) -> Self {
        Self {
            exclusions: exclusions.into_iter().collect(),
        }
    }
}

impl DependencySelector for ExclusionDependencySelector {
    fn select_dependency(&self, dependency: &Dependency) -> bool {
        !self
            .exclusions
            .iter()
            .any(|exclusion| exclusion.matches(&dependency.artifact))
    }

    fn derive_child_selector(
        &self,
        context: &CollectionContext<'_>,
    ) -> Option<Arc<dyn DependencySelector>> {
        let dependency = context.dependency?;
        if dependency.exclusions.is_subset(&self.exclusions) {
            return None;
        }

        let mut exclusions = self.exclusions.clone();
        exclusions.extend(dependency.exclusions.iter().cloned());
        Some(Arc::new(Self { exclusions }))
    }
}

/// Selects a dependency only if every member does
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AndDependencySelector {
    selectors: Vec<Arc<dyn DependencySelector>>,
}

impl AndDependencySelector {
    pub fn new(selectors: Vec<Arc<dyn DependencySelector>>) -> Self {
        Self { selectors }
    }
}

impl DependencySelector for AndDependencySelector {
    fn select_dependency(&self, dependency: &Dependency) -> bool {
        self.selectors
            .iter()
            .all(|selector| selector.select_dependency(dependency))
    }

    fn derive_child_selector(
        &self,
        context: &CollectionContext<'_>,
    ) -> Option<Arc<dyn DependencySelector>> {
        let derived: Vec<Option<Arc<dyn DependencySelector>>> = self
            .selectors
            .iter()
            .map(|selector| selector.derive_child_selector(context))
            .collect();

        if derived.iter().all(Option::is_none) {
            return None;
        }

        let selectors = self
            .selectors
            .iter()
            .zip(derived)
            .map(|(current, child)| child.unwrap_or_else(|| Arc::clone(current)))
            .collect();
        Some(Arc::new(Self { selectors }))
    }
}

/// Gives the same answer for every dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StaticDependencySelector {
    select: bool,
}

impl StaticDependencySelector {
    pub fn new(select: bool) -> Self {
        Self { select }
    }
}

impl DependencySelector for StaticDependencySelector {
    fn select_dependency(&self, _dependency: &Dependency) -> bool {
        self.select
    }

    fn derive_child_selector(
        &self,
        _context: &CollectionContext<'_>,
    ) -> Option<Arc<dyn DependencySelector>> {
        None
    }
}
