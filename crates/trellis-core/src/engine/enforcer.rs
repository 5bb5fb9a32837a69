use std::collections::{BTreeSet, HashMap};

use crate::permission::{Permission, PermissionSet};
use crate::policy::{Policy, PolicyEntry, PolicyId, Revision};
use crate::resource::{ResourceKey, ResourcePath, ResourceType};
use crate::subject::{AuthorizationContext, SubjectId};

use super::trie::{TrieNode, build_forest};
use super::vocabulary::{PermissionBit, PermissionIndex, SubjectIndex, SubjectTable};
use super::{EngineError, Verdict};

/// Read-only query facade over the permission trees of one policy revision.
///
/// An `Enforcer` is never mutated after [`Enforcer::build`]; a new policy
/// revision yields a new instance. All queries are total: unknown resource
/// types, permissions or subjects resolve to `Undefined` / `false`.
#[derive(Debug)]
pub struct Enforcer {
    policy_id: PolicyId,
    revision: Revision,
    roots: HashMap<ResourceType, TrieNode>,
    permissions: PermissionIndex,
    subjects: SubjectTable,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectedSubjects {
    pub granted: BTreeSet<SubjectId>,
    pub revoked: BTreeSet<SubjectId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplanationStep {
    pub path: ResourcePath,
    pub verdict: Verdict,
}

/// Nodes visited while resolving one permission, root first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Explanation {
    pub key: ResourceKey,
    pub permission: Permission,
    pub steps: Vec<ExplanationStep>,
    pub verdict: Verdict,
}

impl Explanation {
    /// The most specific step that decided the verdict.
    pub fn deciding_step(&self) -> Option<&ExplanationStep> {
        self.steps
            .iter()
            .rev()
            .find(|step| step.verdict != Verdict::Undefined)
    }
}

impl Enforcer {
    pub fn build(policy: &Policy) -> Result<Self, EngineError> {
        Self::build_from_entries(policy.id().clone(), policy.revision(), policy.entries())
    }

    /// Builds from entries that did not go through [`Policy::new`]. Fails with
    /// [`EngineError::PolicyEntryConflict`] on duplicate labels.
    pub fn build_from_entries<'a>(
        policy_id: PolicyId,
        revision: Revision,
        entries: impl IntoIterator<Item = &'a PolicyEntry>,
    ) -> Result<Self, EngineError> {
        let forest = build_forest(entries)?;

        let enforcer = Self {
            policy_id,
            revision,
            roots: forest.roots,
            permissions: forest.permissions,
            subjects: forest.subjects,
        };
        tracing::debug!(
            policy_id = %enforcer.policy_id,
            revision = enforcer.revision.value(),
            resource_types = enforcer.roots.len(),
            nodes = enforcer.node_count(),
            subjects = enforcer.subjects.len(),
            permissions = enforcer.permissions.len(),
            "built enforcer"
        );
        Ok(enforcer)
    }

    pub fn policy_id(&self) -> &PolicyId {
        &self.policy_id
    }

    pub fn revision(&self) -> Revision {
        self.revision
    }

    pub fn node_count(&self) -> usize {
        self.roots.values().map(TrieNode::count_nodes).sum()
    }

    /// Every subject mentioned anywhere in the policy.
    pub fn known_subjects(&self) -> impl Iterator<Item = &SubjectId> {
        self.subjects.indices().map(|idx| self.subjects.id(idx))
    }

    pub fn verdict(
        &self,
        key: &ResourceKey,
        permission: &Permission,
        context: &AuthorizationContext,
    ) -> Verdict {
        let Some(bit) = self.permissions.bit(permission) else {
            return Verdict::Undefined;
        };
        let Some(root) = self.roots.get(&key.resource_type) else {
            return Verdict::Undefined;
        };
        let subjects = self.subject_indices(context);
        let (state, _) = resolve(root, &key.path, &[bit], &subjects);
        state[0]
    }

    /// True iff every permission resolves to `Granted` at `key` for the union
    /// of the context's subjects. An empty permission set is never granted.
    pub fn has_permission(
        &self,
        key: &ResourceKey,
        permissions: &PermissionSet,
        context: &AuthorizationContext,
    ) -> bool {
        let subjects = self.subject_indices(context);
        self.prepare(key, permissions, &subjects)
            .is_some_and(|(root, bits)| all_granted(&resolve(root, &key.path, &bits, &subjects).0))
    }

    /// True iff the permissions hold at `key` and at every materialized node
    /// beneath it.
    pub fn has_permissions_on_resource(
        &self,
        key: &ResourceKey,
        permissions: &PermissionSet,
        context: &AuthorizationContext,
    ) -> bool {
        let subjects = self.subject_indices(context);
        self.prepare(key, permissions, &subjects)
            .is_some_and(|(root, bits)| unrestricted(root, &key.path, &bits, &subjects))
    }

    /// True iff the permissions hold at `key` or at any materialized node
    /// beneath it.
    pub fn has_permissions_on_resource_or_any_subresource(
        &self,
        key: &ResourceKey,
        permissions: &PermissionSet,
        context: &AuthorizationContext,
    ) -> bool {
        let subjects = self.subject_indices(context);
        self.prepare(key, permissions, &subjects)
            .is_some_and(|(root, bits)| partial(root, &key.path, &bits, &subjects))
    }

    /// Subjects that may see at least part of the subtree at `key`.
    pub fn subjects_with_partial_permission(
        &self,
        key: &ResourceKey,
        permission: &Permission,
    ) -> BTreeSet<SubjectId> {
        let (Some(root), Some(bit)) = (
            self.roots.get(&key.resource_type),
            self.permissions.bit(permission),
        ) else {
            return BTreeSet::new();
        };

        self.subjects
            .indices()
            .filter(|idx| partial(root, &key.path, &[bit], &[*idx]))
            .map(|idx| self.subjects.id(idx).clone())
            .collect()
    }

    /// Subjects holding the permissions on the whole subtree at `key`.
    pub fn subjects_with_unrestricted_permission(
        &self,
        key: &ResourceKey,
        permissions: &PermissionSet,
    ) -> BTreeSet<SubjectId> {
        let Some(root) = self.roots.get(&key.resource_type) else {
            return BTreeSet::new();
        };
        let Some(bits) = self.bits_for(permissions) else {
            return BTreeSet::new();
        };

        self.subjects
            .indices()
            .filter(|idx| unrestricted(root, &key.path, &bits, &[*idx]))
            .map(|idx| self.subjects.id(idx).clone())
            .collect()
    }

    /// Per-subject verdicts at exactly `key`; subjects that stay `Undefined`
    /// are omitted.
    pub fn effected_subjects(&self, key: &ResourceKey, permission: &Permission) -> EffectedSubjects {
        let mut effected = EffectedSubjects::default();
        let (Some(root), Some(bit)) = (
            self.roots.get(&key.resource_type),
            self.permissions.bit(permission),
        ) else {
            return effected;
        };

        for idx in self.subjects.indices() {
            let (state, _) = resolve(root, &key.path, &[bit], &[idx]);
            match state[0] {
                Verdict::Granted => {
                    effected.granted.insert(self.subjects.id(idx).clone());
                }
                Verdict::Revoked => {
                    effected.revoked.insert(self.subjects.id(idx).clone());
                }
                Verdict::Undefined => {}
            }
        }
        effected
    }

    pub fn explain(
        &self,
        key: &ResourceKey,
        permission: &Permission,
        context: &AuthorizationContext,
    ) -> Explanation {
        let mut explanation = Explanation {
            key: key.clone(),
            permission: permission.clone(),
            steps: Vec::new(),
            verdict: Verdict::Undefined,
        };
        let (Some(root), Some(bit)) = (
            self.roots.get(&key.resource_type),
            self.permissions.bit(permission),
        ) else {
            return explanation;
        };
        let subjects = self.subject_indices(context);

        let mut node = root;
        let mut depth = 0;
        loop {
            let step_verdict = node.verdict(bit, &subjects);
            explanation.verdict = explanation.verdict.overridden_by(step_verdict);
            explanation.steps.push(ExplanationStep {
                path: key.path.truncated(depth),
                verdict: step_verdict,
            });

            let Some(segment) = key.path.segments().get(depth) else {
                break;
            };
            let Some(child) = node.child(segment) else {
                break;
            };
            node = child;
            depth += 1;
        }
        explanation
    }

    fn subject_indices(&self, context: &AuthorizationContext) -> Vec<SubjectIndex> {
        let mut indices: Vec<SubjectIndex> = context
            .iter()
            .filter_map(|s| self.subjects.lookup(s))
            .collect();
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    /// `None` if any permission is unknown to this policy, or the set is empty.
    fn bits_for(&self, permissions: &PermissionSet) -> Option<Vec<PermissionBit>> {
        if permissions.is_empty() {
            return None;
        }
        permissions
            .iter()
            .map(|p| self.permissions.bit(p))
            .collect()
    }

    fn prepare(
        &self,
        key: &ResourceKey,
        permissions: &PermissionSet,
        subjects: &[SubjectIndex],
    ) -> Option<(&TrieNode, Vec<PermissionBit>)> {
        if subjects.is_empty() {
            return None;
        }
        let root = self.roots.get(&key.resource_type)?;
        let bits = self.bits_for(permissions)?;
        Some((root, bits))
    }
}

/// Walks root to `path`, folding node verdicts per permission. Returns the
/// running verdicts and the node at `path` if it is materialized.
fn resolve<'a>(
    root: &'a TrieNode,
    path: &ResourcePath,
    bits: &[PermissionBit],
    subjects: &[SubjectIndex],
) -> (Vec<Verdict>, Option<&'a TrieNode>) {
    let mut state = vec![Verdict::Undefined; bits.len()];
    apply(&mut state, root, bits, subjects);

    let mut node = root;
    for segment in path.segments() {
        match node.child(segment) {
            Some(child) => {
                apply(&mut state, child, bits, subjects);
                node = child;
            }
            None => return (state, None),
        }
    }
    (state, Some(node))
}

fn apply(state: &mut [Verdict], node: &TrieNode, bits: &[PermissionBit], subjects: &[SubjectIndex]) {
    for (verdict, bit) in state.iter_mut().zip(bits) {
        *verdict = verdict.overridden_by(node.verdict(*bit, subjects));
    }
}

fn all_granted(state: &[Verdict]) -> bool {
    state.iter().all(|v| v.is_granted())
}

fn unrestricted(
    root: &TrieNode,
    path: &ResourcePath,
    bits: &[PermissionBit],
    subjects: &[SubjectIndex],
) -> bool {
    let (state, target) = resolve(root, path, bits, subjects);
    if !all_granted(&state) {
        return false;
    }
    match target {
        Some(node) => descendants_all_granted(node, &state, bits, subjects),
        None => true,
    }
}

fn partial(
    root: &TrieNode,
    path: &ResourcePath,
    bits: &[PermissionBit],
    subjects: &[SubjectIndex],
) -> bool {
    let (state, target) = resolve(root, path, bits, subjects);
    if all_granted(&state) {
        return true;
    }
    match target {
        Some(node) => any_descendant_granted(node, &state, bits, subjects),
        None => false,
    }
}

fn descendants_all_granted(
    node: &TrieNode,
    inherited: &[Verdict],
    bits: &[PermissionBit],
    subjects: &[SubjectIndex],
) -> bool {
    node.children().all(|(_, child)| {
        let mut state = inherited.to_vec();
        apply(&mut state, child, bits, subjects);
        all_granted(&state) && descendants_all_granted(child, &state, bits, subjects)
    })
}

fn any_descendant_granted(
    node: &TrieNode,
    inherited: &[Verdict],
    bits: &[PermissionBit],
    subjects: &[SubjectIndex],
) -> bool {
    node.children().any(|(_, child)| {
        let mut state = inherited.to_vec();
        apply(&mut state, child, bits, subjects);
        all_granted(&state) || any_descendant_granted(child, &state, bits, subjects)
    })
}
