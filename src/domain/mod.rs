//! Domain layer: canonical entity types.
//!
//! Everything here is plain data. The gateway normalizes wire payloads into
//! these types, the cache stores them, and speculative transforms clone and
//! edit them. Nothing in this module depends on HTTP or storage details.

pub mod entities;

pub use entities::{
    AuthSession, Comment, Page, Post, Profile, ProfileUpdate, Registration, UserSummary,
};
