use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::permission::{Permission, PermissionSet};
use crate::resource::ResourceKey;
use crate::subject::SubjectId;

use super::PolicyError;
use super::types::{Policy, PolicyEntry, PolicyId, ResourcePermissions, Revision};

/// JSON wire form of a policy, as stored by the policy service.
///
/// ```json
/// {
///   "policyId": "org.acme:sensor-42",
///   "revision": 3,
///   "entries": {
///     "owner": {
///       "subjects": { "google:alice": { "type": "user" } },
///       "resources": { "thing:/": { "grant": ["READ", "WRITE"], "revoke": [] } }
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDocument {
    pub policy_id: String,
    #[serde(default)]
    pub revision: u64,
    #[serde(default)]
    pub entries: BTreeMap<String, EntryDocument>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryDocument {
    #[serde(default)]
    pub subjects: BTreeMap<String, SubjectDocument>,
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceDocument>,
}

/// Subject metadata. Only the key of the `subjects` map takes part in
/// resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectDocument {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub subject_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDocument {
    #[serde(default)]
    pub grant: Vec<String>,
    #[serde(default)]
    pub revoke: Vec<String>,
}

impl PolicyDocument {
    pub fn from_json(json: &str) -> Result<Self, PolicyError> {
        serde_json::from_str(json).map_err(|e| PolicyError::Document(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> Result<String, PolicyError> {
        serde_json::to_string_pretty(self).map_err(|e| PolicyError::Document(e.to_string()))
    }

    pub fn into_policy(self) -> Result<Policy, PolicyError> {
        let id = PolicyId::new(self.policy_id)?;
        let mut entries = Vec::with_capacity(self.entries.len());

        for (label, entry_doc) in self.entries {
            let mut subjects = BTreeSet::new();
            for subject in entry_doc.subjects.into_keys() {
                let subject = SubjectId::new(subject).map_err(|source| PolicyError::Subject {
                    label: label.clone(),
                    source,
                })?;
                subjects.insert(subject);
            }

            let mut resources: BTreeMap<ResourceKey, ResourcePermissions> = BTreeMap::new();
            for (raw_key, resource_doc) in entry_doc.resources {
                let key = ResourceKey::parse(&raw_key).map_err(|source| PolicyError::Resource {
                    label: label.clone(),
                    source,
                })?;
                let declared = ResourcePermissions::new(
                    to_permission_set(resource_doc.grant),
                    to_permission_set(resource_doc.revoke),
                );
                // "thing:/a" and "thing:/a/" name the same key.
                let merged = match resources.get(&key) {
                    Some(existing) => existing.merge(&declared),
                    None => declared,
                };
                resources.insert(key, merged);
            }

            entries.push(PolicyEntry::new(label, subjects, resources)?);
        }

        Policy::new(id, Revision::new(self.revision), entries)
    }
}

fn to_permission_set(labels: Vec<String>) -> PermissionSet {
    labels.into_iter().map(Permission::new).collect()
}

fn to_labels(set: &PermissionSet) -> Vec<String> {
    set.iter().map(|p| p.as_str().to_string()).collect()
}

impl Policy {
    pub fn from_json(json: &str) -> Result<Self, PolicyError> {
        PolicyDocument::from_json(json)?.into_policy()
    }

    pub fn to_document(&self) -> PolicyDocument {
        let entries = self
            .entries()
            .map(|entry| {
                let subjects = entry
                    .subjects()
                    .iter()
                    .map(|s| (s.to_string(), SubjectDocument::default()))
                    .collect();
                let resources = entry
                    .resources()
                    .iter()
                    .map(|(key, declared)| {
                        (
                            key.to_string(),
                            ResourceDocument {
                                grant: to_labels(declared.granted()),
                                revoke: to_labels(declared.revoked()),
                            },
                        )
                    })
                    .collect();
                (
                    entry.label().to_string(),
                    EntryDocument {
                        subjects,
                        resources,
                    },
                )
            })
            .collect();

        PolicyDocument {
            policy_id: self.id().to_string(),
            revision: self.revision().value(),
            entries,
        }
    }
}
