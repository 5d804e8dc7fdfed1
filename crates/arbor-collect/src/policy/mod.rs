//! Per-node policies applied while the graph is collected
//!
//! Every policy answers a question about a single dependency and can derive
//! the instance that governs the children of the node being expanded. A
//! derivation returning `None` means the current instance stays in effect.
//!
//! The collector keys its subtree cache on the policies in effect, compared
//! by value through [`PolicyIdentity`]. Every policy type has to be
//! `Eq + Hash` over the state that affects its answers.

pub mod manager;
pub mod selector;
pub mod traverser;

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use arbor_core::{Dependency, DependencyManagement};

use crate::config::SessionConfig;

pub use manager::{ClassicDependencyManager, NoopDependencyManager};
pub use selector::{
    AndDependencySelector, ExclusionDependencySelector, OptionalDependencySelector,
    ScopeDependencySelector, StaticDependencySelector,
};
pub use traverser::{FatArtifactTraverser, StaticDependencyTraverser};

/// Equality and hashing for policies behind trait objects.
///
/// Two policies are identical when they have the same concrete type and
/// compare equal. Implemented for every `Eq + Hash` type.
pub trait PolicyIdentity {
    fn as_any(&self) -> &dyn Any;

    fn identity_eq(&self, other: &dyn Any) -> bool;

    fn identity_hash(&self, state: &mut dyn Hasher);
}

impl<T: Any + Eq + Hash> PolicyIdentity for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn identity_eq(&self, other: &dyn Any) -> bool {
        other.downcast_ref::<T>().is_some_and(|other| self == other)
    }

    fn identity_hash(&self, mut state: &mut dyn Hasher) {
        TypeId::of::<T>().hash(&mut state);
        self.hash(&mut state);
    }
}

macro_rules! impl_policy_identity {
    ($policy:ident) => {
        impl PartialEq for dyn $policy {
            fn eq(&self, other: &Self) -> bool {
                PolicyIdentity::identity_eq(self, PolicyIdentity::as_any(other))
            }
        }

        impl Eq for dyn $policy {}

        impl Hash for dyn $policy {
            fn hash<H: Hasher>(&self, state: &mut H) {
                PolicyIdentity::identity_hash(self, state);
            }
        }
    };
}

/// The node whose children are about to be collected
#[derive(Debug, Clone, Copy)]
pub struct CollectionContext<'a> {
    pub config: &'a SessionConfig,
    /// `None` for a root without a dependency
    pub dependency: Option<&'a Dependency>,
    /// Managed dependencies declared by the node's descriptor
    pub managed_dependencies: &'a [Dependency],
}

/// Decides whether a dependency becomes a child at all
pub trait DependencySelector: PolicyIdentity + fmt::Debug + Send + Sync {
    fn select_dependency(&self, dependency: &Dependency) -> bool;

    fn derive_child_selector(
        &self,
        context: &CollectionContext<'_>,
    ) -> Option<Arc<dyn DependencySelector>>;
}

/// Supplies version, scope and exclusion overrides
pub trait DependencyManager: PolicyIdentity + fmt::Debug + Send + Sync {
    fn manage_dependency(&self, dependency: &Dependency) -> Option<DependencyManagement>;

    fn derive_child_manager(
        &self,
        context: &CollectionContext<'_>,
    ) -> Option<Arc<dyn DependencyManager>>;
}

/// Decides whether the dependencies of a dependency are collected
pub trait DependencyTraverser: PolicyIdentity + fmt::Debug + Send + Sync {
    fn traverse_dependency(&self, dependency: &Dependency) -> bool;

    fn derive_child_traverser(
        &self,
        context: &CollectionContext<'_>,
    ) -> Option<Arc<dyn DependencyTraverser>>;
}

impl_policy_identity!(DependencySelector);
impl_policy_identity!(DependencyManager);
impl_policy_identity!(DependencyTraverser);

/// Selector, manager and traverser in effect for one node's children
#[derive(Debug, Clone, Eq, Hash)]
pub struct Policies {
    pub selector: Arc<dyn DependencySelector>,
    pub manager: Arc<dyn DependencyManager>,
    pub traverser: Arc<dyn DependencyTraverser>,
}

// Written out by hand: `#[derive(PartialEq)]` on `Arc<dyn Trait>` fields
// trips rust-lang/rust#31740. Field-wise comparison, same as the derive.
impl PartialEq for Policies {
    fn eq(&self, other: &Self) -> bool {
        *self.selector == *other.selector
            && *self.manager == *other.manager
            && *self.traverser == *other.traverser
    }
}

impl Policies {
    pub fn derive(&self, context: &CollectionContext<'_>) -> Self {
        Self {
            selector: self
                .selector
                .derive_child_selector(context)
                .unwrap_or_else(|| Arc::clone(&self.selector)),
            manager: self
                .manager
                .derive_child_manager(context)
                .unwrap_or_else(|| Arc::clone(&self.manager)),
            traverser: self
                .traverser
                .derive_child_traverser(context)
                .unwrap_or_else(|| Arc::clone(&self.traverser)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::{scopes, Artifact};

    #[test]
    fn test_unchanged_derivation_reuses_instances() {
        let config = SessionConfig::default();
        let policies = Policies {
            selector: Arc::new(StaticDependencySelector::new(true)),
            manager: Arc::new(NoopDependencyManager),
            traverser: Arc::new(StaticDependencyTraverser::new(true)),
        };
        let dependency = Dependency::new(Artifact::parse("g:a:1.0").unwrap(), scopes::COMPILE);
        let context = CollectionContext {
            config: &config,
            dependency: Some(&dependency),
            managed_dependencies: &[],
        };

        let derived = policies.derive(&context);

        assert!(Arc::ptr_eq(&derived.selector, &policies.selector));
        assert!(Arc::ptr_eq(&derived.manager, &policies.manager));
        assert!(Arc::ptr_eq(&derived.traverser, &policies.traverser));
    }

    #[test]
    fn test_policies_compare_by_value() {
        let selector: Arc<dyn DependencySelector> = Arc::new(StaticDependencySelector::new(true));
        let lookalike: Arc<dyn DependencySelector> = Arc::new(StaticDependencySelector::new(true));
        let rejecting: Arc<dyn DependencySelector> = Arc::new(StaticDependencySelector::new(false));
        let optional: Arc<dyn DependencySelector> = Arc::new(OptionalDependencySelector::new());

        assert_eq!(selector, lookalike);
        assert_ne!(selector, rejecting);
        assert_ne!(selector, optional);

        let manager: Arc<dyn DependencyManager> = Arc::new(ClassicDependencyManager::new());
        let fresh: Arc<dyn DependencyManager> = Arc::new(ClassicDependencyManager::new());
        let noop: Arc<dyn DependencyManager> = Arc::new(NoopDependencyManager);
        assert_eq!(manager, fresh);
        assert_ne!(manager, noop);
    }
}
