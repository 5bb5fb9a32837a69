use std::collections::HashMap;

use crate::permission::Permission;
use crate::subject::SubjectId;

pub(crate) type PermissionBit = u32;
pub(crate) type SubjectIndex = u32;

/// Set of permission bits. The first 64 labels live inline; larger
/// vocabularies spill into `high` words.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct PermissionMask {
    low: u64,
    high: Vec<u64>,
}

impl PermissionMask {
    pub(crate) fn insert(&mut self, bit: PermissionBit) {
        let (word, offset) = locate(bit);
        if word == 0 {
            self.low |= 1 << offset;
            return;
        }
        let idx = word - 1;
        if self.high.len() <= idx {
            self.high.resize(idx + 1, 0);
        }
        self.high[idx] |= 1 << offset;
    }

    pub(crate) fn contains(&self, bit: PermissionBit) -> bool {
        let (word, offset) = locate(bit);
        let value = if word == 0 {
            self.low
        } else {
            self.high.get(word - 1).copied().unwrap_or(0)
        };
        value & (1 << offset) != 0
    }

    pub(crate) fn union_with(&mut self, other: &PermissionMask) {
        self.low |= other.low;
        if self.high.len() < other.high.len() {
            self.high.resize(other.high.len(), 0);
        }
        for (mine, theirs) in self.high.iter_mut().zip(&other.high) {
            *mine |= *theirs;
        }
    }

    pub(crate) fn difference_with(&mut self, other: &PermissionMask) {
        self.low &= !other.low;
        for (mine, theirs) in self.high.iter_mut().zip(&other.high) {
            *mine &= !*theirs;
        }
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.low == 0 && self.high.iter().all(|w| *w == 0)
    }
}

fn locate(bit: PermissionBit) -> (usize, u32) {
    ((bit / 64) as usize, bit % 64)
}

/// Assigns a bit to every permission label a policy mentions.
#[derive(Debug, Clone, Default)]
pub(crate) struct PermissionIndex {
    bits: HashMap<Permission, PermissionBit>,
}

impl PermissionIndex {
    pub(crate) fn intern(&mut self, permission: &Permission) -> PermissionBit {
        let next = self.bits.len() as PermissionBit;
        *self.bits.entry(permission.clone()).or_insert(next)
    }

    pub(crate) fn bit(&self, permission: &Permission) -> Option<PermissionBit> {
        self.bits.get(permission).copied()
    }

    pub(crate) fn len(&self) -> usize {
        self.bits.len()
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct SubjectTable {
    ids: Vec<SubjectId>,
    index: HashMap<SubjectId, SubjectIndex>,
}

impl SubjectTable {
    pub(crate) fn intern(&mut self, subject: &SubjectId) -> SubjectIndex {
        if let Some(idx) = self.index.get(subject) {
            return *idx;
        }
        let idx = self.ids.len() as SubjectIndex;
        self.ids.push(subject.clone());
        self.index.insert(subject.clone(), idx);
        idx
    }

    pub(crate) fn lookup(&self, subject: &SubjectId) -> Option<SubjectIndex> {
        self.index.get(subject).copied()
    }

    pub(crate) fn id(&self, idx: SubjectIndex) -> &SubjectId {
        &self.ids[idx as usize]
    }

    pub(crate) fn indices(&self) -> impl Iterator<Item = SubjectIndex> {
        0..self.ids.len() as SubjectIndex
    }

    pub(crate) fn len(&self) -> usize {
        self.ids.len()
    }
}
