//! Poison recovery for the cache's std `RwLock`s.
//!
//! A panic while a guard is held poisons the lock. The guarded data is
//! plain cloned snapshots, so it stays usable; the worst case after a
//! recovery is one stale entry, which the next write or invalidation
//! replaces. Recovery is logged with the store and operation involved.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

fn note_recovery(store: &'static str, op: &'static str, mode: &'static str) {
    warn!(
        store,
        op,
        mode,
        "cache lock poisoned by a panicking thread, continuing with its contents"
    );
}

pub(crate) fn rw_read<'a, T>(
    lock: &'a RwLock<T>,
    store: &'static str,
    op: &'static str,
) -> RwLockReadGuard<'a, T> {
    lock.read().unwrap_or_else(|poisoned| {
        note_recovery(store, op, "read");
        poisoned.into_inner()
    })
}

pub(crate) fn rw_write<'a, T>(
    lock: &'a RwLock<T>,
    store: &'static str,
    op: &'static str,
) -> RwLockWriteGuard<'a, T> {
    lock.write().unwrap_or_else(|poisoned| {
        note_recovery(store, op, "write");
        poisoned.into_inner()
    })
}
