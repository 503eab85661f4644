//! Write generations for cache scopes.
//!
//! Every [`EntityKey`] scope has an epoch that moves forward each time the
//! scope is written optimistically or invalidated. A fetch captures the
//! epoch before going to the network and writes back conditionally; a moved
//! epoch means something newer happened while the response was in flight
//! and the stale payload must be dropped.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use super::keys::EntityKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::epoch";

/// Monotonic write generation. Scopes that were never written sit at zero.
pub type Epoch = u64;

pub(crate) struct EpochMap {
    counter: AtomicU64,
    scopes: RwLock<HashMap<EntityKey, Epoch>>,
}

impl EpochMap {
    pub(crate) fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
            scopes: RwLock::new(HashMap::new()),
        }
    }

    /// Current epoch of a scope. Never allocates an entry.
    pub(crate) fn observe(&self, scope: &EntityKey) -> Epoch {
        rw_read(&self.scopes, SOURCE, "observe")
            .get(scope)
            .copied()
            .unwrap_or(0)
    }

    /// Move the given scopes to fresh epochs, superseding every fetch that
    /// observed them earlier.
    pub(crate) fn advance<I>(&self, scopes: I)
    where
        I: IntoIterator<Item = EntityKey>,
    {
        let mut map = rw_write(&self.scopes, SOURCE, "advance");
        for scope in scopes {
            let next = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
            map.insert(scope, next);
        }
    }

    /// Advance every scope that has ever been written. Used when the whole
    /// cache is dropped (logout).
    pub(crate) fn advance_all(&self) {
        let mut map = rw_write(&self.scopes, SOURCE, "advance_all");
        for epoch in map.values_mut() {
            *epoch = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        }
    }

    /// Run `write` only if the scope still sits at `observed`.
    ///
    /// The epoch read guard is held across `write` so an `advance` cannot
    /// interleave between the check and the store update. Callers must not
    /// touch the epoch map inside `write`.
    pub(crate) fn if_current(
        &self,
        scope: &EntityKey,
        observed: Epoch,
        write: impl FnOnce(),
    ) -> bool {
        let map = rw_read(&self.scopes, SOURCE, "if_current");
        let current = map.get(scope).copied().unwrap_or(0);
        if current != observed {
            return false;
        }
        write();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwritten_scope_sits_at_zero() {
        let epochs = EpochMap::new();
        assert_eq!(epochs.observe(&EntityKey::Post(1)), 0);
    }

    #[test]
    fn advance_moves_only_named_scopes() {
        let epochs = EpochMap::new();
        let feed = EntityKey::Collection(super::super::keys::Collection::Feed);

        epochs.advance([EntityKey::Post(1), feed.clone()]);

        assert!(epochs.observe(&EntityKey::Post(1)) > 0);
        assert!(epochs.observe(&feed) > 0);
        assert_eq!(epochs.observe(&EntityKey::Post(2)), 0);
    }

    #[test]
    fn if_current_rejects_after_advance() {
        let epochs = EpochMap::new();
        let scope = EntityKey::Post(1);

        let observed = epochs.observe(&scope);
        epochs.advance([scope.clone()]);

        let mut ran = false;
        let applied = epochs.if_current(&scope, observed, || ran = true);
        assert!(!applied);
        assert!(!ran);

        let observed = epochs.observe(&scope);
        let applied = epochs.if_current(&scope, observed, || ran = true);
        assert!(applied);
        assert!(ran);
    }

    #[test]
    fn advance_all_supersedes_every_known_scope() {
        let epochs = EpochMap::new();
        let scope = EntityKey::Me;
        epochs.advance([scope.clone()]);
        let observed = epochs.observe(&scope);

        epochs.advance_all();

        assert!(epochs.observe(&scope) > observed);
    }
}
