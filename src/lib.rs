//! Client-side sync engine for the piazza social app.
//!
//! The crate keeps a local picture of server state (posts, profiles,
//! paginated collections) and reconciles user writes against it
//! optimistically: interactions land in the cache before the network
//! answers, and roll back wholesale if the server refuses them.
//!
//! Layering, bottom up:
//!
//! - [`domain`]: canonical entity types, plain data.
//! - [`api`]: the HTTP gateway. Envelope unwrapping, field-name
//!   normalization, bearer credentials, session expiry signaling.
//! - [`cache`]: generation-tracked LRU stores with family-wide
//!   invalidation and search freshness windows.
//! - [`mutation`]: the optimistic coordinator. Speculative apply, undo
//!   snapshots, commit/rollback, background settle.
//! - [`client`]: [`client::PiazzaClient`], one handle over the whole
//!   engine, plus read-through query plumbing.
//! - [`config`] and [`infra`]: layered settings, credential persistence,
//!   telemetry wiring.

pub mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod domain;
pub mod infra;
pub mod mutation;

pub use api::{ApiError, ImageUpload, SessionState};
pub use client::{ClientError, PiazzaClient};
pub use config::Settings;
pub use mutation::{Mutation, MutationOutcome, MutationReceipt};
