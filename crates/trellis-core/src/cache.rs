use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::engine::{EngineError, Enforcer};
use crate::policy::{Policy, PolicyId, Revision};

/// Outcome of publishing an enforcer for a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Published {
    Installed { revision: Revision },
    Replaced { previous: Revision, revision: Revision },
    Stale { current: Revision, rejected: Revision },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub publishes: u64,
    pub stale_rejections: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    publishes: AtomicU64,
    stale_rejections: AtomicU64,
}

/// Current enforcer per policy id.
///
/// Readers get an `Arc` snapshot and query it without holding any lock, so a
/// concurrent publish never tears an in-flight query. Enforcers are built
/// before the map is touched; only the pointer swap happens under the shard
/// lock. Revisions only move forward.
#[derive(Debug, Default)]
pub struct EnforcerCache {
    enforcers: DashMap<PolicyId, Arc<Enforcer>>,
    counters: Counters,
}

impl EnforcerCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, policy_id: &PolicyId) -> Option<Arc<Enforcer>> {
        match self.enforcers.get(policy_id) {
            Some(enforcer) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                Some(Arc::clone(enforcer.value()))
            }
            None => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn current_revision(&self, policy_id: &PolicyId) -> Option<Revision> {
        self.enforcers.get(policy_id).map(|e| e.revision())
    }

    /// Builds an enforcer for `policy` and publishes it unless a revision at
    /// least as new is already cached.
    pub fn publish(&self, policy: &Policy) -> Result<Published, EngineError> {
        if let Some(current) = self.current_revision(policy.id())
            && current >= policy.revision()
        {
            return Ok(self.reject_stale(policy.id(), current, policy.revision()));
        }

        let enforcer = Enforcer::build(policy)?;
        Ok(self.install(enforcer))
    }

    /// Publishes a prebuilt enforcer under its own policy id.
    pub fn install(&self, enforcer: Enforcer) -> Published {
        let policy_id = enforcer.policy_id().clone();
        let revision = enforcer.revision();

        match self.enforcers.entry(policy_id.clone()) {
            Entry::Occupied(mut occupied) => {
                let current = occupied.get().revision();
                if current >= revision {
                    drop(occupied);
                    return self.reject_stale(&policy_id, current, revision);
                }
                occupied.insert(Arc::new(enforcer));
                self.counters.publishes.fetch_add(1, Ordering::Relaxed);
                tracing::info!(
                    policy_id = %policy_id,
                    previous = current.value(),
                    revision = revision.value(),
                    "replaced enforcer"
                );
                Published::Replaced {
                    previous: current,
                    revision,
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::new(enforcer));
                self.counters.publishes.fetch_add(1, Ordering::Relaxed);
                tracing::info!(
                    policy_id = %policy_id,
                    revision = revision.value(),
                    "installed enforcer"
                );
                Published::Installed { revision }
            }
        }
    }

    pub fn evict(&self, policy_id: &PolicyId) -> Option<Arc<Enforcer>> {
        let removed = self.enforcers.remove(policy_id).map(|(_, enforcer)| enforcer);
        if removed.is_some() {
            tracing::info!(policy_id = %policy_id, "evicted enforcer");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.enforcers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enforcers.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            publishes: self.counters.publishes.load(Ordering::Relaxed),
            stale_rejections: self.counters.stale_rejections.load(Ordering::Relaxed),
        }
    }

    fn reject_stale(&self, policy_id: &PolicyId, current: Revision, rejected: Revision) -> Published {
        self.counters.stale_rejections.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            policy_id = %policy_id,
            current = current.value(),
            rejected = rejected.value(),
            "ignored stale policy revision"
        );
        Published::Stale { current, rejected }
    }
}
