//! API gateway.
//!
//! Adapts the piazza HTTP surface into typed calls: envelope unwrapping,
//! field-name normalization across server spellings, bearer credential
//! attachment, and the 401 session-expiry side effect all live here. Callers
//! above this module only ever see canonical domain types and [`ApiError`].

mod endpoints;
mod envelope;
mod error;
mod gateway;
mod normalize;

pub use endpoints::ImageUpload;
pub use error::ApiError;
pub use gateway::{Gateway, SessionState};
