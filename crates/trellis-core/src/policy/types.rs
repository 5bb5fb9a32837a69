use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::permission::PermissionSet;
use crate::resource::ResourceKey;
use crate::subject::SubjectId;

use super::PolicyError;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PolicyId(String);

impl PolicyId {
    pub fn new(id: impl Into<String>) -> Result<Self, PolicyError> {
        let id = id.into();
        if id.is_empty() {
            return Err(PolicyError::EmptyPolicyId);
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PolicyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Revision(u64);

impl Revision {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Granted and revoked permissions declared for one resource key.
///
/// A permission present in both sets is revoked: the overlap is removed from
/// `granted` on construction, so every value of this type is normalized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourcePermissions {
    granted: PermissionSet,
    revoked: PermissionSet,
}

impl ResourcePermissions {
    pub fn new(granted: PermissionSet, revoked: PermissionSet) -> Self {
        let granted = granted.difference(&revoked);
        Self { granted, revoked }
    }

    pub fn grant(granted: PermissionSet) -> Self {
        Self::new(granted, PermissionSet::new())
    }

    pub fn revoke(revoked: PermissionSet) -> Self {
        Self::new(PermissionSet::new(), revoked)
    }

    pub fn granted(&self) -> &PermissionSet {
        &self.granted
    }

    pub fn revoked(&self) -> &PermissionSet {
        &self.revoked
    }

    pub fn is_empty(&self) -> bool {
        self.granted.is_empty() && self.revoked.is_empty()
    }

    pub fn merge(&self, other: &ResourcePermissions) -> Self {
        Self::new(
            self.granted.union(&other.granted),
            self.revoked.union(&other.revoked),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyEntry {
    label: String,
    subjects: BTreeSet<SubjectId>,
    resources: BTreeMap<ResourceKey, ResourcePermissions>,
}

impl PolicyEntry {
    pub fn new(
        label: impl Into<String>,
        subjects: BTreeSet<SubjectId>,
        resources: BTreeMap<ResourceKey, ResourcePermissions>,
    ) -> Result<Self, PolicyError> {
        let label = label.into();
        if label.is_empty() {
            return Err(PolicyError::EmptyEntryLabel);
        }
        Ok(Self {
            label,
            subjects,
            resources,
        })
    }

    pub fn builder(label: impl Into<String>) -> PolicyEntryBuilder {
        PolicyEntryBuilder {
            label: label.into(),
            subjects: BTreeSet::new(),
            resources: BTreeMap::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn subjects(&self) -> &BTreeSet<SubjectId> {
        &self.subjects
    }

    pub fn resources(&self) -> &BTreeMap<ResourceKey, ResourcePermissions> {
        &self.resources
    }
}

#[derive(Debug, Clone)]
pub struct PolicyEntryBuilder {
    label: String,
    subjects: BTreeSet<SubjectId>,
    resources: BTreeMap<ResourceKey, ResourcePermissions>,
}

impl PolicyEntryBuilder {
    pub fn subject(mut self, subject: SubjectId) -> Self {
        self.subjects.insert(subject);
        self
    }

    pub fn grant(self, key: ResourceKey, permissions: PermissionSet) -> Self {
        self.declare(key, ResourcePermissions::grant(permissions))
    }

    pub fn revoke(self, key: ResourceKey, permissions: PermissionSet) -> Self {
        self.declare(key, ResourcePermissions::revoke(permissions))
    }

    /// Repeated declarations for the same key are merged.
    pub fn declare(mut self, key: ResourceKey, permissions: ResourcePermissions) -> Self {
        let merged = match self.resources.get(&key) {
            Some(existing) => existing.merge(&permissions),
            None => permissions,
        };
        self.resources.insert(key, merged);
        self
    }

    pub fn build(self) -> Result<PolicyEntry, PolicyError> {
        PolicyEntry::new(self.label, self.subjects, self.resources)
    }
}

/// Immutable set of entries, unique by label. Modifications return a new
/// `Policy` at the next revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    id: PolicyId,
    revision: Revision,
    entries: BTreeMap<String, PolicyEntry>,
}

impl Policy {
    pub fn new(
        id: PolicyId,
        revision: Revision,
        entries: impl IntoIterator<Item = PolicyEntry>,
    ) -> Result<Self, PolicyError> {
        let mut by_label = BTreeMap::new();
        for entry in entries {
            let label = entry.label().to_string();
            if by_label.insert(label.clone(), entry).is_some() {
                return Err(PolicyError::DuplicateEntryLabel(label));
            }
        }
        Ok(Self {
            id,
            revision,
            entries: by_label,
        })
    }

    pub fn id(&self) -> &PolicyId {
        &self.id
    }

    pub fn revision(&self) -> Revision {
        self.revision
    }

    pub fn entries(&self) -> impl Iterator<Item = &PolicyEntry> {
        self.entries.values()
    }

    pub fn entry(&self, label: &str) -> Option<&PolicyEntry> {
        self.entries.get(label)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts or replaces the entry with the same label.
    pub fn with_entry(&self, entry: PolicyEntry) -> Self {
        let mut entries = self.entries.clone();
        entries.insert(entry.label().to_string(), entry);
        Self {
            id: self.id.clone(),
            revision: self.revision.next(),
            entries,
        }
    }

    pub fn without_entry(&self, label: &str) -> Self {
        let mut entries = self.entries.clone();
        entries.remove(label);
        Self {
            id: self.id.clone(),
            revision: self.revision.next(),
            entries,
        }
    }
}
