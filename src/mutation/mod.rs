//! Optimistic mutation coordination.
//!
//! User-intent writes (like, save, follow, comment) reflect in the cache
//! immediately and reconcile with the server afterwards. The coordinator
//! runs each [`Mutation`] through three phases: supersede in-flight
//! fetches, apply speculative transforms to every cached copy, then send
//! the request and either keep the speculative state or restore the undo
//! snapshots. A background settle refetch follows in both cases.

mod apply;
mod coordinator;
mod intent;

pub use coordinator::{Coordinator, MutationOutcome, MutationReceipt};
pub use intent::{Mutation, MutationTarget};
