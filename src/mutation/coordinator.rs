//! The three-phase mutation protocol.
//!
//! Phase 1 supersedes in-flight fetches for every key the mutation will
//! touch. Phase 2 edits all cached copies speculatively, keeping
//! pre-mutation snapshots as the undo record. Phase 3 sends the real
//! request: a rejection restores every snapshot before the error is
//! returned. Whatever the outcome, a background settle step then pulls
//! server truth back in, so the cache converges even when the speculative
//! arithmetic and the server disagree.
//!
//! Same-target mutations are serialized on a per-target async mutex. A
//! settle write-back that lost its race against a newer mutation is
//! refused by the cache's generation check rather than cancelled.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use futures::future;
use metrics::{counter, histogram};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::api::{ApiError, Gateway};
use crate::cache::{Collection, EntityCache, EntityKey, Snapshot};

use super::apply;
use super::intent::{Mutation, MutationTarget};

/// Terminal state of the network phase.
#[derive(Debug)]
pub enum MutationOutcome {
    /// The server acknowledged the write; the speculative state stands
    /// until settle refines it.
    Committed,
    /// The server rejected the write; every speculative edit was undone.
    RolledBack(ApiError),
}

impl MutationOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed)
    }
}

/// Handle returned by [`Coordinator::invoke`].
///
/// Dropping the receipt detaches the settle task; callers that need the
/// cache fully reconciled (tests, shutdown paths) await [`settled`].
///
/// [`settled`]: MutationReceipt::settled
#[derive(Debug)]
pub struct MutationReceipt {
    pub mutation_id: Uuid,
    pub outcome: MutationOutcome,
    settle: Option<JoinHandle<()>>,
}

impl MutationReceipt {
    /// Wait for the background settle refetch to finish, then yield the
    /// network outcome.
    pub async fn settled(mut self) -> MutationOutcome {
        if let Some(handle) = self.settle.take() {
            if let Err(err) = handle.await {
                warn!(mutation = %self.mutation_id, error = %err, "settle task aborted");
            }
        }
        self.outcome
    }

    pub fn into_result(self) -> Result<(), ApiError> {
        match self.outcome {
            MutationOutcome::Committed => Ok(()),
            MutationOutcome::RolledBack(err) => Err(err),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Applied,
    Committed,
    RolledBack,
    Settling,
    Resolved,
}

struct Lifecycle {
    id: Uuid,
    phase: Phase,
}

impl Lifecycle {
    fn new(id: Uuid) -> Self {
        Self {
            id,
            phase: Phase::Idle,
        }
    }

    fn advance(&mut self, next: Phase) {
        debug!(mutation = %self.id, from = ?self.phase, to = ?next, "mutation phase");
        self.phase = next;
    }
}

/// Key families a mutation touches: generation bumps up front, family
/// invalidation at settle.
struct Plan {
    scopes: Vec<EntityKey>,
    collections: Vec<Collection>,
}

/// Runs mutations through the three-phase protocol.
pub struct Coordinator {
    gateway: Arc<Gateway>,
    cache: Arc<EntityCache>,
    locks: DashMap<MutationTarget, Arc<Mutex<()>>>,
    comment_page_limit: u32,
}

impl Coordinator {
    pub fn new(gateway: Arc<Gateway>, cache: Arc<EntityCache>, comment_page_limit: u32) -> Self {
        Self {
            gateway,
            cache,
            locks: DashMap::new(),
            comment_page_limit,
        }
    }

    /// Run one mutation end to end. The returned receipt carries the
    /// network outcome; settling continues in the background.
    pub async fn invoke(&self, mutation: Mutation) -> MutationReceipt {
        let mutation_id = Uuid::new_v4();
        let mut lifecycle = Lifecycle::new(mutation_id);
        let target = mutation.target();

        let lock = self.lock_for(&target);
        let _serialized = lock.lock().await;
        debug!(
            mutation = %mutation_id,
            kind = mutation.describe(),
            ?target,
            "mutation accepted"
        );

        // Phase 1: no in-flight fetch may write back over what we are
        // about to edit.
        let Plan {
            scopes,
            collections,
        } = self.plan(&mutation);
        self.cache.advance(scopes);

        // Phase 2: speculative apply across every cached copy.
        let undo = self.apply(&mutation);
        counter!("piazza_mutation_applied_total", "kind" => mutation.describe()).increment(1);
        lifecycle.advance(Phase::Applied);

        // Phase 3: the real request.
        let outcome = match self.dispatch(&mutation).await {
            Ok(()) => {
                counter!("piazza_mutation_committed_total", "kind" => mutation.describe())
                    .increment(1);
                lifecycle.advance(Phase::Committed);
                MutationOutcome::Committed
            }
            Err(err) => {
                self.rollback(undo);
                counter!("piazza_mutation_rolled_back_total", "kind" => mutation.describe())
                    .increment(1);
                warn!(
                    mutation = %mutation_id,
                    kind = mutation.describe(),
                    error = %err,
                    "mutation rejected, speculative edits undone"
                );
                lifecycle.advance(Phase::RolledBack);
                MutationOutcome::RolledBack(err)
            }
        };

        // The serialization lock is released when this call returns; the
        // settle task runs outside it.
        let settle = self.spawn_settle(lifecycle, mutation, collections);
        MutationReceipt {
            mutation_id,
            outcome,
            settle: Some(settle),
        }
    }

    fn lock_for(&self, target: &MutationTarget) -> Arc<Mutex<()>> {
        let entry = self
            .locks
            .entry(target.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())));
        Arc::clone(entry.value())
    }

    fn plan(&self, mutation: &Mutation) -> Plan {
        match mutation {
            Mutation::Like { post_id }
            | Mutation::Unlike { post_id }
            | Mutation::Save { post_id }
            | Mutation::Unsave { post_id } => {
                let mut collections = self.cache.collections_with_post(*post_id);
                push_unique(&mut collections, Collection::Feed);
                if matches!(mutation, Mutation::Save { .. } | Mutation::Unsave { .. }) {
                    push_unique(&mut collections, Collection::MySaved);
                }
                Plan {
                    scopes: post_scopes(*post_id, &collections),
                    collections,
                }
            }
            Mutation::Follow { username } | Mutation::Unfollow { username } => Plan {
                scopes: vec![EntityKey::Profile(username.clone())],
                collections: Vec::new(),
            },
            Mutation::AddComment { post_id, .. } | Mutation::DeleteComment { post_id, .. } => {
                let mut collections = self.cache.collections_with_post(*post_id);
                push_unique(&mut collections, Collection::Feed);
                push_unique(&mut collections, Collection::PostComments(*post_id));
                Plan {
                    scopes: post_scopes(*post_id, &collections),
                    collections,
                }
            }
        }
    }

    fn apply(&self, mutation: &Mutation) -> Vec<Snapshot> {
        match mutation {
            Mutation::Like { post_id } => self.cache.update_post_copies(*post_id, apply::like),
            Mutation::Unlike { post_id } => self.cache.update_post_copies(*post_id, apply::unlike),
            Mutation::Save { post_id } => self.cache.update_post_copies(*post_id, apply::save),
            Mutation::Unsave { post_id } => self.cache.update_post_copies(*post_id, apply::unsave),
            Mutation::Follow { username } => {
                self.cache.update_profile_copies(username, apply::follow)
            }
            Mutation::Unfollow { username } => {
                self.cache.update_profile_copies(username, apply::unfollow)
            }
            Mutation::AddComment { post_id, .. } => {
                self.cache.update_post_copies(*post_id, apply::comment_added)
            }
            Mutation::DeleteComment { post_id, .. } => self
                .cache
                .update_post_copies(*post_id, apply::comment_removed),
        }
    }

    fn rollback(&self, undo: Vec<Snapshot>) {
        debug!(restored = undo.len(), "restoring pre-mutation snapshots");
        self.cache.restore(undo);
    }

    async fn dispatch(&self, mutation: &Mutation) -> Result<(), ApiError> {
        match mutation {
            Mutation::Like { post_id } => self.gateway.like_post(*post_id).await,
            Mutation::Unlike { post_id } => self.gateway.unlike_post(*post_id).await,
            Mutation::Save { post_id } => self.gateway.save_post(*post_id).await,
            Mutation::Unsave { post_id } => self.gateway.unsave_post(*post_id).await,
            Mutation::Follow { username } => self.gateway.follow(username).await,
            Mutation::Unfollow { username } => self.gateway.unfollow(username).await,
            Mutation::AddComment { post_id, text } => self
                .gateway
                .add_comment(*post_id, text)
                .await
                .map(|_comment| ()),
            Mutation::DeleteComment { comment_id, .. } => {
                self.gateway.delete_comment(*comment_id).await
            }
        }
    }

    fn spawn_settle(
        &self,
        mut lifecycle: Lifecycle,
        mutation: Mutation,
        collections: Vec<Collection>,
    ) -> JoinHandle<()> {
        let gateway = Arc::clone(&self.gateway);
        let cache = Arc::clone(&self.cache);
        let comment_page_limit = self.comment_page_limit;
        tokio::spawn(async move {
            lifecycle.advance(Phase::Settling);
            let started_at = Instant::now();
            if let Err(err) =
                settle(&gateway, &cache, &mutation, &collections, comment_page_limit).await
            {
                counter!("piazza_settle_failed_total").increment(1);
                warn!(
                    mutation = %lifecycle.id,
                    kind = mutation.describe(),
                    error = %err,
                    "settle refetch failed, cache reconverges on next read"
                );
            }
            histogram!("piazza_mutation_settle_ms")
                .record(started_at.elapsed().as_secs_f64() * 1000.0);
            lifecycle.advance(Phase::Resolved);
        })
    }
}

fn push_unique(collections: &mut Vec<Collection>, collection: Collection) {
    if !collections.contains(&collection) {
        collections.push(collection);
    }
}

fn post_scopes(post_id: i64, collections: &[Collection]) -> Vec<EntityKey> {
    let mut scopes = vec![EntityKey::Post(post_id)];
    scopes.extend(collections.iter().cloned().map(EntityKey::Collection));
    scopes
}

/// Pull server truth back in after a mutation, successful or not.
///
/// Touched families converge by invalidation (repopulated on next read);
/// the entities themselves are refetched in place, gated by the generation
/// captured after the mutation's own bump so a newer mutation still wins.
async fn settle(
    gateway: &Gateway,
    cache: &EntityCache,
    mutation: &Mutation,
    collections: &[Collection],
    comment_page_limit: u32,
) -> Result<(), ApiError> {
    for collection in collections {
        cache.invalidate(&EntityKey::Collection(collection.clone()));
    }

    match mutation {
        Mutation::Like { post_id }
        | Mutation::Unlike { post_id }
        | Mutation::Save { post_id }
        | Mutation::Unsave { post_id } => refresh_post(gateway, cache, *post_id).await,
        Mutation::Follow { username } | Mutation::Unfollow { username } => {
            let profile_epoch = cache.observe(&EntityKey::Profile(username.clone()));
            let me_epoch = cache.observe(&EntityKey::Me);
            let (profile, me) =
                future::try_join(gateway.user_profile(username), gateway.me()).await?;
            cache.set_profile_if_current(profile, profile_epoch);
            cache.set_me_if_current(me, me_epoch);
            Ok(())
        }
        Mutation::AddComment { post_id, .. } | Mutation::DeleteComment { post_id, .. } => {
            let comments = Collection::PostComments(*post_id);
            let post_epoch = cache.observe(&EntityKey::Post(*post_id));
            let comments_epoch = cache.observe(&EntityKey::Collection(comments.clone()));
            let (post, first_page) = future::try_join(
                gateway.post(*post_id),
                gateway.comments(*post_id, 1, comment_page_limit),
            )
            .await?;
            cache.set_post_if_current(post, post_epoch);
            cache.set_comment_page_if_current(comments, 1, first_page, comments_epoch);
            Ok(())
        }
    }
}

async fn refresh_post(
    gateway: &Gateway,
    cache: &EntityCache,
    post_id: i64,
) -> Result<(), ApiError> {
    let observed = cache.observe(&EntityKey::Post(post_id));
    let post = gateway.post(post_id).await?;
    cache.set_post_if_current(post, observed);
    Ok(())
}
