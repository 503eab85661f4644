//! Client facade.
//!
//! [`PiazzaClient`] wires the gateway, the entity cache, and the mutation
//! coordinator together behind one handle. Queries are read-through: a
//! cache hit is served as-is, a miss fetches through the gateway and writes
//! back gated by the generation captured before the fetch. Interaction
//! writes go through [`PiazzaClient::invoke`] and the optimistic protocol;
//! content writes (post create/delete, profile edits) are plain
//! call-then-invalidate.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::api::{ApiError, Gateway, ImageUpload, SessionState};
use crate::cache::{CacheConfig, Collection, EntityCache, EntityKey, Freshness};
use crate::config::Settings;
use crate::domain::{
    AuthSession, Comment, Page, Post, Profile, ProfileUpdate, Registration, UserSummary,
};
use crate::infra::credentials::{
    CredentialStore, FileCredentialStore, default_token_path,
};
use crate::infra::error::CredentialError;
use crate::mutation::{Coordinator, Mutation, MutationReceipt};

/// Errors surfaced by the client facade.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("api request failed: {0}")]
    Api(#[from] ApiError),
    #[error("credential storage failure: {0}")]
    Credentials(#[from] CredentialError),
}

/// One handle over the whole sync engine.
///
/// Cheap to share: internally everything lives behind `Arc`s, and all
/// methods take `&self`.
pub struct PiazzaClient {
    gateway: Arc<Gateway>,
    cache: Arc<EntityCache>,
    coordinator: Coordinator,
    page_limit: u32,
    comment_page_limit: u32,
}

impl PiazzaClient {
    /// Build a client from resolved settings, persisting the bearer token
    /// in the configured file (or the platform default location).
    pub fn new(settings: &Settings) -> Result<Self, ClientError> {
        let token_path = match settings.credentials.token_path.clone() {
            Some(path) => path,
            None => default_token_path()?,
        };
        let store: Arc<dyn CredentialStore> = Arc::new(FileCredentialStore::new(token_path));
        Self::with_store(settings, store)
    }

    /// Build a client around an externally managed credential store.
    pub fn with_store(
        settings: &Settings,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self, ClientError> {
        let gateway = Arc::new(Gateway::new(
            settings.api.base_url.clone(),
            settings.api.timeout,
            credentials,
        )?);
        let cache = Arc::new(EntityCache::new(CacheConfig::from(&settings.cache)));
        let coordinator = Coordinator::new(
            Arc::clone(&gateway),
            Arc::clone(&cache),
            settings.api.comment_page_limit.get(),
        );
        Ok(Self {
            gateway,
            cache,
            coordinator,
            page_limit: settings.api.page_limit.get(),
            comment_page_limit: settings.api.comment_page_limit.get(),
        })
    }

    /// Subscribe to session transitions (sign-in, sign-out, server-side
    /// expiry). The receiver also reports the current state immediately.
    pub fn session_events(&self) -> watch::Receiver<SessionState> {
        self.gateway.session_events()
    }

    // ------------------------------------------------------------------
    // Session lifecycle
    // ------------------------------------------------------------------

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, ClientError> {
        let session = self.gateway.login(email, password).await?;
        self.establish_session(&session).await?;
        Ok(session)
    }

    pub async fn register(&self, registration: &Registration) -> Result<AuthSession, ClientError> {
        let session = self.gateway.register(registration).await?;
        self.establish_session(&session).await?;
        Ok(session)
    }

    /// Clear the stored credential and drop all cached state.
    pub async fn logout(&self) -> Result<(), ClientError> {
        self.gateway.credentials().clear().await?;
        self.cache.clear();
        self.gateway.set_session(SessionState::Anonymous);
        info!("signed out, cache dropped");
        Ok(())
    }

    async fn establish_session(&self, session: &AuthSession) -> Result<(), ClientError> {
        self.gateway.credentials().store(&session.token).await?;
        // Viewer-relative flags from any previous account are meaningless.
        self.cache.clear();
        self.gateway.set_session(SessionState::Authenticated);
        self.warm_viewer_profile();
        info!(user = %session.user.username, "signed in");
        Ok(())
    }

    /// Prime the viewer profile in the background so the first `me()` read
    /// after sign-in is a cache hit. Failures are left to the read path.
    fn warm_viewer_profile(&self) {
        let gateway = Arc::clone(&self.gateway);
        let cache = Arc::clone(&self.cache);
        tokio::spawn(async move {
            let observed = cache.observe(&EntityKey::Me);
            match gateway.me().await {
                Ok(profile) => {
                    cache.set_me_if_current(profile, observed);
                }
                Err(err) => {
                    debug!(error = %err, "viewer profile warm fetch failed");
                }
            }
        });
    }

    // ------------------------------------------------------------------
    // Entity queries
    // ------------------------------------------------------------------

    pub async fn post(&self, id: i64) -> Result<Post, ClientError> {
        if let Some(post) = self.cache.post(id) {
            return Ok(post);
        }
        let observed = self.cache.observe(&EntityKey::Post(id));
        let post = self.gateway.post(id).await?;
        self.cache.set_post_if_current(post.clone(), observed);
        Ok(post)
    }

    pub async fn profile(&self, username: &str) -> Result<Profile, ClientError> {
        if let Some(profile) = self.cache.profile(username) {
            return Ok(profile);
        }
        let observed = self
            .cache
            .observe(&EntityKey::Profile(username.to_string()));
        let profile = self.gateway.user_profile(username).await?;
        self.cache.set_profile_if_current(profile.clone(), observed);
        Ok(profile)
    }

    pub async fn me(&self) -> Result<Profile, ClientError> {
        if let Some(profile) = self.cache.me() {
            return Ok(profile);
        }
        let observed = self.cache.observe(&EntityKey::Me);
        let profile = self.gateway.me().await?;
        self.cache.set_me_if_current(profile.clone(), observed);
        Ok(profile)
    }

    // ------------------------------------------------------------------
    // Collection queries
    // ------------------------------------------------------------------

    pub async fn feed(&self, page: u32) -> Result<Page<Post>, ClientError> {
        self.post_collection(Collection::Feed, page).await
    }

    pub async fn my_posts(&self, page: u32) -> Result<Page<Post>, ClientError> {
        self.post_collection(Collection::MyPosts, page).await
    }

    pub async fn my_likes(&self, page: u32) -> Result<Page<Post>, ClientError> {
        self.post_collection(Collection::MyLikes, page).await
    }

    pub async fn my_saved(&self, page: u32) -> Result<Page<Post>, ClientError> {
        self.post_collection(Collection::MySaved, page).await
    }

    pub async fn user_posts(&self, username: &str, page: u32) -> Result<Page<Post>, ClientError> {
        self.post_collection(Collection::UserPosts(username.to_string()), page)
            .await
    }

    pub async fn user_likes(&self, username: &str, page: u32) -> Result<Page<Post>, ClientError> {
        self.post_collection(Collection::UserLikes(username.to_string()), page)
            .await
    }

    pub async fn comments(&self, post_id: i64, page: u32) -> Result<Page<Comment>, ClientError> {
        let collection = Collection::PostComments(post_id);
        if let Some(hit) = self.cache.comment_page(&collection, page) {
            return Ok(hit);
        }
        let observed = self
            .cache
            .observe(&EntityKey::Collection(collection.clone()));
        let fetched = self
            .gateway
            .comments(post_id, page, self.comment_page_limit)
            .await?;
        self.cache
            .set_comment_page_if_current(collection, page, fetched.clone(), observed);
        Ok(fetched)
    }

    pub async fn post_likers(
        &self,
        post_id: i64,
        page: u32,
    ) -> Result<Page<UserSummary>, ClientError> {
        self.user_collection(Collection::PostLikers(post_id), page)
            .await
    }

    pub async fn my_followers(&self, page: u32) -> Result<Page<UserSummary>, ClientError> {
        self.user_collection(Collection::MyFollowers, page).await
    }

    pub async fn my_following(&self, page: u32) -> Result<Page<UserSummary>, ClientError> {
        self.user_collection(Collection::MyFollowing, page).await
    }

    pub async fn user_followers(
        &self,
        username: &str,
        page: u32,
    ) -> Result<Page<UserSummary>, ClientError> {
        self.user_collection(Collection::UserFollowers(username.to_string()), page)
            .await
    }

    pub async fn user_following(
        &self,
        username: &str,
        page: u32,
    ) -> Result<Page<UserSummary>, ClientError> {
        self.user_collection(Collection::UserFollowing(username.to_string()), page)
            .await
    }

    /// Search users by query. A cached page inside the freshness window is
    /// served directly; a stale one is served too, with a background
    /// refresh so the next read sees current results.
    pub async fn search_users(
        &self,
        query: &str,
        page: u32,
    ) -> Result<Page<UserSummary>, ClientError> {
        let collection = Collection::SearchUsers(query.to_string());
        if let Some((hit, freshness)) = self.cache.user_page(&collection, page) {
            if freshness == Freshness::Stale {
                self.spawn_search_refresh(query.to_string(), page);
            }
            return Ok(hit);
        }
        let observed = self
            .cache
            .observe(&EntityKey::Collection(collection.clone()));
        let fetched = self
            .gateway
            .search_users(query, page, self.page_limit)
            .await?;
        self.cache
            .set_user_page_if_current(collection, page, fetched.clone(), observed);
        Ok(fetched)
    }

    fn spawn_search_refresh(&self, query: String, page: u32) {
        let gateway = Arc::clone(&self.gateway);
        let cache = Arc::clone(&self.cache);
        let limit = self.page_limit;
        tokio::spawn(async move {
            let collection = Collection::SearchUsers(query.clone());
            let observed = cache.observe(&EntityKey::Collection(collection.clone()));
            match gateway.search_users(&query, page, limit).await {
                Ok(fetched) => {
                    cache.set_user_page_if_current(collection, page, fetched, observed);
                }
                Err(err) => {
                    debug!(%query, error = %err, "background search refresh failed");
                }
            }
        });
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Run an interaction write through the optimistic protocol. The
    /// returned receipt carries the network outcome; await
    /// [`MutationReceipt::settled`] to also wait for reconciliation.
    pub async fn invoke(&self, mutation: Mutation) -> MutationReceipt {
        self.coordinator.invoke(mutation).await
    }

    pub async fn create_post(
        &self,
        image: ImageUpload,
        caption: Option<&str>,
    ) -> Result<Post, ClientError> {
        let post = self.gateway.create_post(image, caption).await?;
        self.cache.set_post(post.clone());
        self.cache
            .invalidate(&EntityKey::Collection(Collection::Feed));
        self.cache
            .invalidate(&EntityKey::Collection(Collection::MyPosts));
        // posts_count on the viewer profile moved.
        self.cache.invalidate(&EntityKey::Me);
        Ok(post)
    }

    pub async fn delete_post(&self, id: i64) -> Result<(), ClientError> {
        self.gateway.delete_post(id).await?;
        for collection in self.cache.collections_with_post(id) {
            self.cache.invalidate(&EntityKey::Collection(collection));
        }
        self.cache.invalidate(&EntityKey::Post(id));
        self.cache
            .invalidate(&EntityKey::Collection(Collection::Feed));
        self.cache
            .invalidate(&EntityKey::Collection(Collection::MyPosts));
        self.cache.invalidate(&EntityKey::Me);
        Ok(())
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Profile, ClientError> {
        let profile = self.gateway.update_me(update).await?;
        self.store_viewer_profile(profile.clone());
        Ok(profile)
    }

    pub async fn update_avatar(&self, image: ImageUpload) -> Result<Profile, ClientError> {
        let profile = self.gateway.upload_avatar(image).await?;
        self.store_viewer_profile(profile.clone());
        Ok(profile)
    }

    fn store_viewer_profile(&self, profile: Profile) {
        // The server answered with fresh truth; supersede anything in
        // flight before writing it.
        self.cache.advance([
            EntityKey::Me,
            EntityKey::Profile(profile.username.clone()),
        ]);
        self.cache.set_profile(profile.clone());
        self.cache.set_me(profile);
    }

    // ------------------------------------------------------------------
    // Shared plumbing
    // ------------------------------------------------------------------

    async fn post_collection(
        &self,
        collection: Collection,
        page: u32,
    ) -> Result<Page<Post>, ClientError> {
        if let Some(hit) = self.cache.post_page(&collection, page) {
            return Ok(hit);
        }
        let observed = self
            .cache
            .observe(&EntityKey::Collection(collection.clone()));
        let fetched = self.fetch_post_page(&collection, page).await?;
        self.cache
            .set_post_page_if_current(collection, page, fetched.clone(), observed);
        Ok(fetched)
    }

    async fn fetch_post_page(
        &self,
        collection: &Collection,
        page: u32,
    ) -> Result<Page<Post>, ApiError> {
        let limit = self.page_limit;
        match collection {
            Collection::Feed => self.gateway.feed(page, limit).await,
            Collection::MyPosts => self.gateway.my_posts(page, limit).await,
            Collection::MyLikes => self.gateway.my_likes(page, limit).await,
            Collection::MySaved => self.gateway.my_saved(page, limit).await,
            Collection::UserPosts(username) => {
                self.gateway.user_posts(username, page, limit).await
            }
            Collection::UserLikes(username) => {
                self.gateway.user_likes(username, page, limit).await
            }
            other => Err(ApiError::InvalidInput(format!(
                "collection {other:?} does not hold posts"
            ))),
        }
    }

    async fn user_collection(
        &self,
        collection: Collection,
        page: u32,
    ) -> Result<Page<UserSummary>, ClientError> {
        if let Some((hit, _)) = self.cache.user_page(&collection, page) {
            return Ok(hit);
        }
        let observed = self
            .cache
            .observe(&EntityKey::Collection(collection.clone()));
        let fetched = self.fetch_user_page(&collection, page).await?;
        self.cache
            .set_user_page_if_current(collection, page, fetched.clone(), observed);
        Ok(fetched)
    }

    async fn fetch_user_page(
        &self,
        collection: &Collection,
        page: u32,
    ) -> Result<Page<UserSummary>, ApiError> {
        let limit = self.page_limit;
        match collection {
            Collection::MyFollowers => self.gateway.my_followers(page, limit).await,
            Collection::MyFollowing => self.gateway.my_following(page, limit).await,
            Collection::UserFollowers(username) => {
                self.gateway.user_followers(username, page, limit).await
            }
            Collection::UserFollowing(username) => {
                self.gateway.user_following(username, page, limit).await
            }
            Collection::PostLikers(post_id) => {
                self.gateway.post_likers(*post_id, page, limit).await
            }
            other => Err(ApiError::InvalidInput(format!(
                "collection {other:?} does not hold users"
            ))),
        }
    }
}
