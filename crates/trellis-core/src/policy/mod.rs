mod document;
pub mod types;
pub mod validation;

pub use document::{EntryDocument, PolicyDocument, ResourceDocument, SubjectDocument};
pub use types::{Policy, PolicyEntry, PolicyEntryBuilder, PolicyId, ResourcePermissions, Revision};
pub use validation::{PolicyLimits, ValidationError, validate_policy_limits};

use crate::resource::ResourceError;
use crate::subject::SubjectError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    #[error("duplicate policy entry label: {0}")]
    DuplicateEntryLabel(String),

    #[error("policy entry label must not be empty")]
    EmptyEntryLabel,

    #[error("policy id must not be empty")]
    EmptyPolicyId,

    #[error("invalid resource in entry '{label}': {source}")]
    Resource {
        label: String,
        #[source]
        source: ResourceError,
    },

    #[error("invalid subject in entry '{label}': {source}")]
    Subject {
        label: String,
        #[source]
        source: SubjectError,
    },

    #[error("malformed policy document: {0}")]
    Document(String),
}
