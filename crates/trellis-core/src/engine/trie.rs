use std::collections::{BTreeMap, HashMap, HashSet};

use crate::permission::PermissionSet;
use crate::policy::PolicyEntry;
use crate::resource::{ResourcePath, ResourceType};

use super::EngineError;
use super::Verdict;
use super::vocabulary::{PermissionBit, PermissionIndex, PermissionMask, SubjectIndex, SubjectTable};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct NodePermissions {
    pub(crate) granted: PermissionMask,
    pub(crate) revoked: PermissionMask,
}

impl NodePermissions {
    /// Union both sides, then strip revoked bits from the grants.
    fn merge(&mut self, granted: &PermissionMask, revoked: &PermissionMask) {
        self.granted.union_with(granted);
        self.revoked.union_with(revoked);
        self.granted.difference_with(&self.revoked);
    }
}

/// One path position in a resource type's tree. A node may carry no
/// permissions at all and exist only to route to its children.
#[derive(Debug, Clone, Default)]
pub(crate) struct TrieNode {
    children: BTreeMap<String, TrieNode>,
    permissions: BTreeMap<SubjectIndex, NodePermissions>,
}

impl TrieNode {
    pub(crate) fn child(&self, segment: &str) -> Option<&TrieNode> {
        self.children.get(segment)
    }

    pub(crate) fn children(&self) -> impl Iterator<Item = (&String, &TrieNode)> {
        self.children.iter()
    }

    #[cfg(test)]
    pub(crate) fn permissions_of(&self, subject: SubjectIndex) -> Option<&NodePermissions> {
        self.permissions.get(&subject)
    }

    /// What this node alone says about `bit` for the union of `subjects`:
    /// any revoke wins, then any grant.
    pub(crate) fn verdict(&self, bit: PermissionBit, subjects: &[SubjectIndex]) -> Verdict {
        let mut granted = false;
        for subject in subjects {
            if let Some(declared) = self.permissions.get(subject) {
                if declared.revoked.contains(bit) {
                    return Verdict::Revoked;
                }
                granted |= declared.granted.contains(bit);
            }
        }
        if granted {
            Verdict::Granted
        } else {
            Verdict::Undefined
        }
    }

    fn descend_or_create(&mut self, path: &ResourcePath) -> &mut TrieNode {
        let mut node = self;
        for segment in path.segments() {
            node = node.children.entry(segment.clone()).or_default();
        }
        node
    }

    fn merge(&mut self, subject: SubjectIndex, granted: &PermissionMask, revoked: &PermissionMask) {
        self.permissions
            .entry(subject)
            .or_default()
            .merge(granted, revoked);
    }

    pub(crate) fn count_nodes(&self) -> usize {
        1 + self.children.values().map(TrieNode::count_nodes).sum::<usize>()
    }
}

#[derive(Debug, Default)]
pub(crate) struct Forest {
    pub(crate) roots: HashMap<ResourceType, TrieNode>,
    pub(crate) permissions: PermissionIndex,
    pub(crate) subjects: SubjectTable,
}

/// Merges every `(entry, subject, key)` declaration into one tree per
/// resource type. The result does not depend on entry order.
pub(crate) fn build_forest<'a>(
    entries: impl IntoIterator<Item = &'a PolicyEntry>,
) -> Result<Forest, EngineError> {
    let mut forest = Forest::default();
    let mut labels = HashSet::new();

    for entry in entries {
        if !labels.insert(entry.label()) {
            return Err(EngineError::PolicyEntryConflict {
                label: entry.label().to_string(),
                reason: "label appears more than once",
            });
        }

        let subjects: Vec<SubjectIndex> = entry
            .subjects()
            .iter()
            .map(|s| forest.subjects.intern(s))
            .collect();

        for (key, declared) in entry.resources() {
            if !declared.granted().is_disjoint(declared.revoked()) {
                return Err(EngineError::PolicyEntryConflict {
                    label: entry.label().to_string(),
                    reason: "permission both granted and revoked on one resource",
                });
            }

            let granted = to_mask(&mut forest.permissions, declared.granted());
            let revoked = to_mask(&mut forest.permissions, declared.revoked());

            let node = forest
                .roots
                .entry(key.resource_type.clone())
                .or_default()
                .descend_or_create(&key.path);
            for subject in &subjects {
                node.merge(*subject, &granted, &revoked);
            }
        }
    }

    Ok(forest)
}

fn to_mask(index: &mut PermissionIndex, set: &PermissionSet) -> PermissionMask {
    let mut mask = PermissionMask::default();
    for permission in set {
        mask.insert(index.intern(permission));
    }
    mask
}
