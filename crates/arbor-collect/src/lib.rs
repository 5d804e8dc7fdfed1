//! Dependency graph collection and nearest-wins conflict resolution
//!
//! [`DependencyCollector`] expands a root into the full transitive graph using
//! the collaborator services in [`services`] and the policies of a
//! [`CollectSession`]. The session's transformer chain then marks conflict
//! groups, prunes every group to its nearest version and refines request
//! contexts.

pub mod collector;
pub mod config;
pub mod error;
pub mod policy;
pub mod pool;
pub mod services;
pub mod session;
pub mod transform;

pub use collector::{CollectRequest, CollectResult, DependencyCollector};
pub use config::SessionConfig;
pub use error::{CollectError, DependencyCollectionError};
pub use policy::{
    CollectionContext, DependencyManager, DependencySelector, DependencyTraverser, PolicyIdentity,
};
pub use services::{
    ArtifactDescriptor, ArtifactDescriptorReader, DescriptorRequest, VersionRangeRequest,
    VersionRangeResolver, VersionRangeResult,
};
pub use session::CollectSession;
pub use transform::{
    ChainedDependencyGraphTransformer, ConflictMarker, ContextRefiner, DependencyGraphTransformer,
    NearestVersionConflictResolver, TransformationContext,
};
