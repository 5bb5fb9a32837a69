use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubjectError {
    #[error("subject id must not be empty")]
    EmptySubjectId,
}

/// Authenticated identity, usually `issuer:subject`. Compared by exact string
/// equality.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubjectId(String);

impl SubjectId {
    pub fn new(id: impl Into<String>) -> Result<Self, SubjectError> {
        let id = id.into();
        if id.is_empty() {
            return Err(SubjectError::EmptySubjectId);
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Issuer prefix, if the id has the `issuer:subject` form.
    pub fn issuer(&self) -> Option<&str> {
        self.0.split_once(':').map(|(issuer, _)| issuer)
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// All identities a request acts under. Ordered for callers, consumed as a set
/// by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizationContext {
    subjects: Vec<SubjectId>,
}

impl AuthorizationContext {
    pub fn new(subjects: Vec<SubjectId>) -> Self {
        Self { subjects }
    }

    pub fn single(subject: SubjectId) -> Self {
        Self {
            subjects: vec![subject],
        }
    }

    pub fn subjects(&self) -> &[SubjectId] {
        &self.subjects
    }

    pub fn iter(&self) -> impl Iterator<Item = &SubjectId> {
        self.subjects.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    pub fn to_set(&self) -> BTreeSet<SubjectId> {
        self.subjects.iter().cloned().collect()
    }
}

impl From<Vec<SubjectId>> for AuthorizationContext {
    fn from(subjects: Vec<SubjectId>) -> Self {
        Self::new(subjects)
    }
}

impl FromIterator<SubjectId> for AuthorizationContext {
    fn from_iter<T: IntoIterator<Item = SubjectId>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
