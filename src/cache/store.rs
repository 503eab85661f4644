//! Cache storage.
//!
//! One `EntityCache` instance holds every cached entity and collection
//! page, guarded by per-store `RwLock`s with LRU bounds. All accessors
//! take `&self`; the cache is shared behind an `Arc` between the client
//! facade and the mutation coordinator.

use std::sync::RwLock;
use std::time::Instant;

use lru::LruCache;
use metrics::counter;
use tracing::debug;

use crate::domain::{Comment, Page, Post, Profile, UserSummary};

use super::config::CacheConfig;
use super::epoch::{Epoch, EpochMap};
use super::keys::{Collection, CollectionShape, EntityKey};
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

/// Whether a cached page is inside its freshness window.
///
/// Only search collections ever report `Stale`; everything else is fresh
/// until invalidated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Stale,
}

/// Pre-mutation copy of one cache entry, captured by the fan-out update
/// helpers and replayed by [`EntityCache::restore`] on rollback.
#[derive(Debug, Clone)]
pub enum Snapshot {
    Post(Post),
    Profile(Profile),
    Me(Profile),
    PostPage {
        collection: Collection,
        page: u32,
        value: Page<Post>,
    },
}

struct Stamped<T> {
    value: T,
    stored_at: Instant,
}

/// The entity cache.
pub struct EntityCache {
    config: CacheConfig,
    epochs: EpochMap,

    // Entities
    posts: RwLock<LruCache<i64, Post>>,
    profiles: RwLock<LruCache<String, Profile>>,
    me: RwLock<Option<Profile>>,

    // Collection pages, keyed by (collection, page number)
    post_pages: RwLock<LruCache<(Collection, u32), Page<Post>>>,
    comment_pages: RwLock<LruCache<(Collection, u32), Page<Comment>>>,
    user_pages: RwLock<LruCache<(Collection, u32), Stamped<Page<UserSummary>>>>,
}

fn record_lookup(hit: bool) {
    if hit {
        counter!("piazza_cache_hit_total").increment(1);
    } else {
        counter!("piazza_cache_miss_total").increment(1);
    }
}

fn record_stale_drop(scope: &EntityKey) {
    counter!("piazza_cache_stale_drop_total").increment(1);
    debug!(?scope, "discarded stale write-back");
}

fn sweep<T>(
    store: &RwLock<LruCache<(Collection, u32), T>>,
    collection: &Collection,
    op: &'static str,
) {
    let mut pages = rw_write(store, SOURCE, op);
    let dropped: Vec<(Collection, u32)> = pages
        .iter()
        .filter(|(key, _)| key.0 == *collection)
        .map(|(key, _)| key.clone())
        .collect();
    for key in dropped {
        pages.pop(&key);
    }
}

impl EntityCache {
    /// Create a new cache with the given configuration.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            epochs: EpochMap::new(),
            posts: RwLock::new(LruCache::new(config.post_limit_non_zero())),
            profiles: RwLock::new(LruCache::new(config.profile_limit_non_zero())),
            me: RwLock::new(None),
            post_pages: RwLock::new(LruCache::new(config.post_page_limit_non_zero())),
            comment_pages: RwLock::new(LruCache::new(config.comment_page_limit_non_zero())),
            user_pages: RwLock::new(LruCache::new(config.user_page_limit_non_zero())),
            config,
        }
    }

    // ========================================================================
    // Epochs
    // ========================================================================

    /// Capture the current epoch of a scope before fetching it.
    pub fn observe(&self, scope: &EntityKey) -> Epoch {
        self.epochs.observe(scope)
    }

    /// Supersede every in-flight fetch of the given scopes.
    pub fn advance<I>(&self, scopes: I)
    where
        I: IntoIterator<Item = EntityKey>,
    {
        self.epochs.advance(scopes);
    }

    // ========================================================================
    // Entity reads
    // ========================================================================

    pub fn post(&self, id: i64) -> Option<Post> {
        let hit = rw_write(&self.posts, SOURCE, "post").get(&id).cloned();
        record_lookup(hit.is_some());
        hit
    }

    pub fn profile(&self, username: &str) -> Option<Profile> {
        let hit = rw_write(&self.profiles, SOURCE, "profile")
            .get(username)
            .cloned();
        record_lookup(hit.is_some());
        hit
    }

    pub fn me(&self) -> Option<Profile> {
        let hit = rw_read(&self.me, SOURCE, "me").clone();
        record_lookup(hit.is_some());
        hit
    }

    // ========================================================================
    // Page reads
    // ========================================================================

    pub fn post_page(&self, collection: &Collection, page: u32) -> Option<Page<Post>> {
        let hit = rw_write(&self.post_pages, SOURCE, "post_page")
            .get(&(collection.clone(), page))
            .cloned();
        record_lookup(hit.is_some());
        hit
    }

    pub fn comment_page(&self, collection: &Collection, page: u32) -> Option<Page<Comment>> {
        let hit = rw_write(&self.comment_pages, SOURCE, "comment_page")
            .get(&(collection.clone(), page))
            .cloned();
        record_lookup(hit.is_some());
        hit
    }

    /// Read a user-list page together with its freshness. Search pages past
    /// the freshness window are still returned, flagged `Stale`, so callers
    /// can serve them while refreshing in the background.
    pub fn user_page(
        &self,
        collection: &Collection,
        page: u32,
    ) -> Option<(Page<UserSummary>, Freshness)> {
        let window = collection
            .is_search()
            .then(|| self.config.search_freshness());
        let hit = rw_write(&self.user_pages, SOURCE, "user_page")
            .get(&(collection.clone(), page))
            .map(|stamped| {
                let fresh = window.is_none_or(|w| stamped.stored_at.elapsed() <= w);
                let freshness = if fresh {
                    Freshness::Fresh
                } else {
                    Freshness::Stale
                };
                (stamped.value.clone(), freshness)
            });
        record_lookup(hit.is_some());
        hit
    }

    // ========================================================================
    // Unconditional writes
    // ========================================================================

    pub fn set_post(&self, post: Post) {
        rw_write(&self.posts, SOURCE, "set_post").put(post.id, post);
    }

    pub fn set_profile(&self, profile: Profile) {
        rw_write(&self.profiles, SOURCE, "set_profile").put(profile.username.clone(), profile);
    }

    pub fn set_me(&self, profile: Profile) {
        *rw_write(&self.me, SOURCE, "set_me") = Some(profile);
    }

    pub fn set_post_page(&self, collection: Collection, page_no: u32, page: Page<Post>) {
        rw_write(&self.post_pages, SOURCE, "set_post_page").put((collection, page_no), page);
    }

    pub fn set_comment_page(&self, collection: Collection, page_no: u32, page: Page<Comment>) {
        rw_write(&self.comment_pages, SOURCE, "set_comment_page").put((collection, page_no), page);
    }

    pub fn set_user_page(&self, collection: Collection, page_no: u32, page: Page<UserSummary>) {
        rw_write(&self.user_pages, SOURCE, "set_user_page").put(
            (collection, page_no),
            Stamped {
                value: page,
                stored_at: Instant::now(),
            },
        );
    }

    // ========================================================================
    // Conditional writes (fetch write-backs)
    // ========================================================================

    /// Store a fetched post unless its scope moved since `observed`.
    pub fn set_post_if_current(&self, post: Post, observed: Epoch) -> bool {
        let scope = EntityKey::Post(post.id);
        let applied = self.epochs.if_current(&scope, observed, || {
            rw_write(&self.posts, SOURCE, "set_post_if_current").put(post.id, post);
        });
        if !applied {
            record_stale_drop(&scope);
        }
        applied
    }

    pub fn set_profile_if_current(&self, profile: Profile, observed: Epoch) -> bool {
        let scope = EntityKey::Profile(profile.username.clone());
        let applied = self.epochs.if_current(&scope, observed, || {
            rw_write(&self.profiles, SOURCE, "set_profile_if_current")
                .put(profile.username.clone(), profile);
        });
        if !applied {
            record_stale_drop(&scope);
        }
        applied
    }

    pub fn set_me_if_current(&self, profile: Profile, observed: Epoch) -> bool {
        let applied = self.epochs.if_current(&EntityKey::Me, observed, || {
            *rw_write(&self.me, SOURCE, "set_me_if_current") = Some(profile);
        });
        if !applied {
            record_stale_drop(&EntityKey::Me);
        }
        applied
    }

    pub fn set_post_page_if_current(
        &self,
        collection: Collection,
        page_no: u32,
        page: Page<Post>,
        observed: Epoch,
    ) -> bool {
        let scope = EntityKey::Collection(collection.clone());
        let applied = self.epochs.if_current(&scope, observed, || {
            rw_write(&self.post_pages, SOURCE, "set_post_page_if_current")
                .put((collection, page_no), page);
        });
        if !applied {
            record_stale_drop(&scope);
        }
        applied
    }

    pub fn set_comment_page_if_current(
        &self,
        collection: Collection,
        page_no: u32,
        page: Page<Comment>,
        observed: Epoch,
    ) -> bool {
        let scope = EntityKey::Collection(collection.clone());
        let applied = self.epochs.if_current(&scope, observed, || {
            rw_write(&self.comment_pages, SOURCE, "set_comment_page_if_current")
                .put((collection, page_no), page);
        });
        if !applied {
            record_stale_drop(&scope);
        }
        applied
    }

    pub fn set_user_page_if_current(
        &self,
        collection: Collection,
        page_no: u32,
        page: Page<UserSummary>,
        observed: Epoch,
    ) -> bool {
        let scope = EntityKey::Collection(collection.clone());
        let applied = self.epochs.if_current(&scope, observed, || {
            rw_write(&self.user_pages, SOURCE, "set_user_page_if_current").put(
                (collection, page_no),
                Stamped {
                    value: page,
                    stored_at: Instant::now(),
                },
            );
        });
        if !applied {
            record_stale_drop(&scope);
        }
        applied
    }

    // ========================================================================
    // Invalidation
    // ========================================================================

    /// Drop a scope and advance its epoch. For collection scopes every
    /// cached page of the family is dropped.
    pub fn invalidate(&self, scope: &EntityKey) {
        match scope {
            EntityKey::Post(id) => {
                rw_write(&self.posts, SOURCE, "invalidate.post").pop(id);
            }
            EntityKey::Profile(username) => {
                rw_write(&self.profiles, SOURCE, "invalidate.profile").pop(username);
            }
            EntityKey::Me => {
                *rw_write(&self.me, SOURCE, "invalidate.me") = None;
            }
            EntityKey::Collection(collection) => match collection.shape() {
                CollectionShape::Posts => {
                    sweep(&self.post_pages, collection, "invalidate.post_pages");
                }
                CollectionShape::Comments => {
                    sweep(&self.comment_pages, collection, "invalidate.comment_pages");
                }
                CollectionShape::Users => {
                    sweep(&self.user_pages, collection, "invalidate.user_pages");
                }
            },
        }
        self.epochs.advance([scope.clone()]);
    }

    /// Drop everything. Used on logout.
    pub fn clear(&self) {
        rw_write(&self.posts, SOURCE, "clear.posts").clear();
        rw_write(&self.profiles, SOURCE, "clear.profiles").clear();
        *rw_write(&self.me, SOURCE, "clear.me") = None;
        rw_write(&self.post_pages, SOURCE, "clear.post_pages").clear();
        rw_write(&self.comment_pages, SOURCE, "clear.comment_pages").clear();
        rw_write(&self.user_pages, SOURCE, "clear.user_pages").clear();
        self.epochs.advance_all();
    }

    // ========================================================================
    // Fan-out updates
    // ========================================================================

    /// Apply a transform to every cached copy of a post: the entity entry
    /// and each collection page embedding it. Returns pre-mutation
    /// snapshots of the copies that actually changed.
    pub fn update_post_copies(
        &self,
        post_id: i64,
        apply: impl Fn(&mut Post) -> bool,
    ) -> Vec<Snapshot> {
        let mut snapshots = Vec::new();

        {
            let mut posts = rw_write(&self.posts, SOURCE, "update_post_copies.entity");
            if let Some(post) = posts.get_mut(&post_id) {
                let before = post.clone();
                if apply(post) {
                    snapshots.push(Snapshot::Post(before));
                }
            }
        }

        {
            let mut pages = rw_write(&self.post_pages, SOURCE, "update_post_copies.pages");
            for (key, page) in pages.iter_mut() {
                if !page.items.iter().any(|item| item.id == post_id) {
                    continue;
                }
                let before = page.clone();
                let mut changed = false;
                for item in page.items.iter_mut().filter(|item| item.id == post_id) {
                    changed |= apply(item);
                }
                if changed {
                    snapshots.push(Snapshot::PostPage {
                        collection: key.0.clone(),
                        page: key.1,
                        value: before,
                    });
                }
            }
        }

        snapshots
    }

    /// Apply a transform to every cached copy of a profile: the entry under
    /// its username and the viewer singleton when it is the same account.
    pub fn update_profile_copies(
        &self,
        username: &str,
        apply: impl Fn(&mut Profile) -> bool,
    ) -> Vec<Snapshot> {
        let mut snapshots = Vec::new();

        {
            let mut profiles = rw_write(&self.profiles, SOURCE, "update_profile_copies.entity");
            if let Some(profile) = profiles.get_mut(username) {
                let before = profile.clone();
                if apply(profile) {
                    snapshots.push(Snapshot::Profile(before));
                }
            }
        }

        {
            let mut me = rw_write(&self.me, SOURCE, "update_profile_copies.me");
            if let Some(profile) = me.as_mut() {
                if profile.username == username {
                    let before = profile.clone();
                    if apply(profile) {
                        snapshots.push(Snapshot::Me(before));
                    }
                }
            }
        }

        snapshots
    }

    /// Collection families whose cached pages currently embed the post.
    pub fn collections_with_post(&self, post_id: i64) -> Vec<Collection> {
        let pages = rw_read(&self.post_pages, SOURCE, "collections_with_post");
        let mut found = Vec::new();
        for (key, page) in pages.iter() {
            if page.items.iter().any(|item| item.id == post_id) && !found.contains(&key.0) {
                found.push(key.0.clone());
            }
        }
        found
    }

    /// Replay pre-mutation snapshots, newest state losing. Used by the
    /// rollback phase.
    pub fn restore(&self, snapshots: Vec<Snapshot>) {
        for snapshot in snapshots {
            match snapshot {
                Snapshot::Post(post) => self.set_post(post),
                Snapshot::Profile(profile) => self.set_profile(profile),
                Snapshot::Me(profile) => self.set_me(profile),
                Snapshot::PostPage {
                    collection,
                    page,
                    value,
                } => self.set_post_page(collection, page, value),
            }
        }
    }
}
