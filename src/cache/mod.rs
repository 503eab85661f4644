//! Entity cache.
//!
//! Keyed in-memory store for everything fetched from the API:
//!
//! - **Entities**: posts by id, profiles by username, the viewer's own
//!   profile as a singleton.
//! - **Collection pages**: one entry per `(collection, page)` pair, where a
//!   collection is the feed, a profile grid, a follower list, a comment
//!   thread, or a search result set. Invalidation is family-wide: dropping
//!   the feed drops every cached feed page.
//!
//! Every scope carries an epoch, a monotonically increasing write
//! generation. Readers capture the epoch before fetching and write back
//! with `set_*_if_current`; if the scope moved in the meantime (a mutation
//! applied, an invalidation ran) the stale payload is discarded instead of
//! overwriting newer state. This is what "cancel the in-flight fetch"
//! means here: the fetch is not aborted, its write-back is refused.
//!
//! Search pages additionally carry a freshness window (default 30s). A
//! stale search page is still returned to the caller, flagged, so the
//! surface can show it while a background refresh runs.

mod config;
mod epoch;
mod keys;
pub(crate) mod lock;
mod store;

pub use config::CacheConfig;
pub use epoch::Epoch;
pub use keys::{Collection, CollectionShape, EntityKey};
pub use store::{EntityCache, Freshness, Snapshot};
