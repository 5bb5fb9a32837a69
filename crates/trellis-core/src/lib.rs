//! Hierarchical policy enforcement for digital twin resources.
//!
//! A [`Policy`] binds subjects to grant/revoke declarations on resource
//! paths. [`Enforcer::build`] merges those declarations into one immutable
//! permission tree per resource type, and the enforcer answers exact-path,
//! full-subtree and any-subtree checks against it. [`EnforcerCache`] holds the
//! current enforcer per policy and swaps it when a newer revision arrives.

pub mod cache;
pub mod engine;
pub mod permission;
pub mod policy;
pub mod resource;
pub mod subject;

pub use cache::{CacheStats, EnforcerCache, Published};
pub use engine::{EffectedSubjects, Enforcer, EngineError, Explanation, ExplanationStep, Verdict};
pub use permission::{Permission, PermissionSet};
pub use policy::{Policy, PolicyDocument, PolicyEntry, PolicyError, PolicyId, Revision};
pub use resource::{ResourceError, ResourceKey, ResourcePath, ResourceType};
pub use subject::{AuthorizationContext, SubjectError, SubjectId};
