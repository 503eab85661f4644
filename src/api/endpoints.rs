//! Typed endpoints.
//!
//! One method per server route. Each method builds the request through the
//! gateway plumbing and normalizes the payload into canonical domain types.
//! Pagination parameters are explicit here; defaulting is the caller's
//! business.

use bytes::Bytes;
use reqwest::Method;
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde_json::{Value, json};

use crate::domain::{
    AuthSession, Comment, Page, Post, Profile, ProfileUpdate, Registration, UserSummary,
};

use super::error::ApiError;
use super::gateway::{Gateway, RouteKind};
use super::normalize::{
    comment_from_value, page_from_value, post_from_value, profile_from_value, session_from_value,
    user_from_value,
};

/// An in-memory image for the multipart endpoints.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Bytes,
    pub filename: String,
    pub content_type: String,
}

impl ImageUpload {
    pub fn new(
        bytes: impl Into<Bytes>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            bytes: bytes.into(),
            filename: filename.into(),
            content_type: content_type.into(),
        }
    }

    fn into_part(self) -> Result<Part, ApiError> {
        let part = Part::stream(self.bytes)
            .file_name(self.filename)
            .mime_str(&self.content_type)?;
        Ok(part)
    }
}

fn paging(page: u32, limit: u32) -> Vec<(&'static str, String)> {
    vec![("page", page.to_string()), ("limit", limit.to_string())]
}

fn to_body<T: Serialize>(payload: &T) -> Result<Value, ApiError> {
    serde_json::to_value(payload).map_err(|err| ApiError::InvalidInput(err.to_string()))
}

impl Gateway {
    // ------------------------------------------------------------------
    // Auth
    // ------------------------------------------------------------------

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, ApiError> {
        let body = self
            .request(
                Method::POST,
                "api/auth/login",
                RouteKind::Auth,
                None,
                Some(json!({"email": email, "password": password})),
            )
            .await?;
        session_from_value(&body)
    }

    pub async fn register(&self, registration: &Registration) -> Result<AuthSession, ApiError> {
        let body = self
            .request(
                Method::POST,
                "api/auth/register",
                RouteKind::Auth,
                None,
                Some(to_body(registration)?),
            )
            .await?;
        session_from_value(&body)
    }

    // ------------------------------------------------------------------
    // Viewer account
    // ------------------------------------------------------------------

    pub async fn me(&self) -> Result<Profile, ApiError> {
        let body = self
            .request(Method::GET, "api/me", RouteKind::Protected, None, None)
            .await?;
        profile_from_value(&body)
    }

    pub async fn update_me(&self, update: &ProfileUpdate) -> Result<Profile, ApiError> {
        let body = self
            .request(
                Method::PATCH,
                "api/me",
                RouteKind::Protected,
                None,
                Some(to_body(update)?),
            )
            .await?;
        profile_from_value(&body)
    }

    pub async fn upload_avatar(&self, image: ImageUpload) -> Result<Profile, ApiError> {
        let form = Form::new().part("avatar", image.into_part()?);
        let body = self.upload(Method::POST, "api/me", form).await?;
        profile_from_value(&body)
    }

    pub async fn my_posts(&self, page: u32, limit: u32) -> Result<Page<Post>, ApiError> {
        self.post_list("api/me/posts", page, limit).await
    }

    pub async fn my_likes(&self, page: u32, limit: u32) -> Result<Page<Post>, ApiError> {
        self.post_list("api/me/likes", page, limit).await
    }

    pub async fn my_saved(&self, page: u32, limit: u32) -> Result<Page<Post>, ApiError> {
        self.post_list("api/me/saved", page, limit).await
    }

    pub async fn my_followers(&self, page: u32, limit: u32) -> Result<Page<UserSummary>, ApiError> {
        self.user_list("api/me/followers", page, limit).await
    }

    pub async fn my_following(&self, page: u32, limit: u32) -> Result<Page<UserSummary>, ApiError> {
        self.user_list("api/me/following", page, limit).await
    }

    // ------------------------------------------------------------------
    // Feed and posts
    // ------------------------------------------------------------------

    pub async fn feed(&self, page: u32, limit: u32) -> Result<Page<Post>, ApiError> {
        self.post_list("api/feed", page, limit).await
    }

    pub async fn post(&self, id: i64) -> Result<Post, ApiError> {
        let body = self
            .request(
                Method::GET,
                &format!("api/posts/{id}"),
                RouteKind::Protected,
                None,
                None,
            )
            .await?;
        post_from_value(&body)
    }

    pub async fn create_post(
        &self,
        image: ImageUpload,
        caption: Option<&str>,
    ) -> Result<Post, ApiError> {
        let mut form = Form::new().part("image", image.into_part()?);
        if let Some(caption) = caption {
            form = form.text("caption", caption.to_string());
        }
        let body = self.upload(Method::POST, "api/posts", form).await?;
        post_from_value(&body)
    }

    pub async fn delete_post(&self, id: i64) -> Result<(), ApiError> {
        self.request(
            Method::DELETE,
            &format!("api/posts/{id}"),
            RouteKind::Protected,
            None,
            None,
        )
        .await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Likes and saves
    // ------------------------------------------------------------------

    pub async fn like_post(&self, id: i64) -> Result<(), ApiError> {
        self.request(
            Method::POST,
            &format!("api/posts/{id}/like"),
            RouteKind::Protected,
            None,
            None,
        )
        .await?;
        Ok(())
    }

    pub async fn unlike_post(&self, id: i64) -> Result<(), ApiError> {
        self.request(
            Method::DELETE,
            &format!("api/posts/{id}/like"),
            RouteKind::Protected,
            None,
            None,
        )
        .await?;
        Ok(())
    }

    pub async fn save_post(&self, id: i64) -> Result<(), ApiError> {
        self.request(
            Method::POST,
            &format!("api/posts/{id}/save"),
            RouteKind::Protected,
            None,
            None,
        )
        .await?;
        Ok(())
    }

    pub async fn unsave_post(&self, id: i64) -> Result<(), ApiError> {
        self.request(
            Method::DELETE,
            &format!("api/posts/{id}/save"),
            RouteKind::Protected,
            None,
            None,
        )
        .await?;
        Ok(())
    }

    pub async fn post_likers(
        &self,
        id: i64,
        page: u32,
        limit: u32,
    ) -> Result<Page<UserSummary>, ApiError> {
        self.user_list(&format!("api/posts/{id}/likes"), page, limit)
            .await
    }

    // ------------------------------------------------------------------
    // Comments
    // ------------------------------------------------------------------

    pub async fn comments(
        &self,
        post_id: i64,
        page: u32,
        limit: u32,
    ) -> Result<Page<Comment>, ApiError> {
        let body = self
            .request(
                Method::GET,
                &format!("api/posts/{post_id}/comments"),
                RouteKind::Protected,
                Some(&paging(page, limit)),
                None,
            )
            .await?;
        page_from_value(&body, limit, comment_from_value)
    }

    pub async fn add_comment(&self, post_id: i64, text: &str) -> Result<Comment, ApiError> {
        let body = self
            .request(
                Method::POST,
                &format!("api/posts/{post_id}/comments"),
                RouteKind::Protected,
                None,
                Some(json!({"text": text})),
            )
            .await?;
        comment_from_value(&body)
    }

    pub async fn delete_comment(&self, comment_id: i64) -> Result<(), ApiError> {
        self.request(
            Method::DELETE,
            &format!("api/comments/{comment_id}"),
            RouteKind::Protected,
            None,
            None,
        )
        .await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    pub async fn user_profile(&self, username: &str) -> Result<Profile, ApiError> {
        let body = self
            .request(
                Method::GET,
                &format!("api/users/{username}"),
                RouteKind::Protected,
                None,
                None,
            )
            .await?;
        profile_from_value(&body)
    }

    pub async fn user_posts(
        &self,
        username: &str,
        page: u32,
        limit: u32,
    ) -> Result<Page<Post>, ApiError> {
        self.post_list(&format!("api/users/{username}/posts"), page, limit)
            .await
    }

    pub async fn user_likes(
        &self,
        username: &str,
        page: u32,
        limit: u32,
    ) -> Result<Page<Post>, ApiError> {
        self.post_list(&format!("api/users/{username}/likes"), page, limit)
            .await
    }

    pub async fn user_followers(
        &self,
        username: &str,
        page: u32,
        limit: u32,
    ) -> Result<Page<UserSummary>, ApiError> {
        self.user_list(&format!("api/users/{username}/followers"), page, limit)
            .await
    }

    pub async fn user_following(
        &self,
        username: &str,
        page: u32,
        limit: u32,
    ) -> Result<Page<UserSummary>, ApiError> {
        self.user_list(&format!("api/users/{username}/following"), page, limit)
            .await
    }

    pub async fn follow(&self, username: &str) -> Result<(), ApiError> {
        self.request(
            Method::POST,
            &format!("api/follow/{username}"),
            RouteKind::Protected,
            None,
            None,
        )
        .await?;
        Ok(())
    }

    pub async fn unfollow(&self, username: &str) -> Result<(), ApiError> {
        self.request(
            Method::DELETE,
            &format!("api/follow/{username}"),
            RouteKind::Protected,
            None,
            None,
        )
        .await?;
        Ok(())
    }

    pub async fn search_users(
        &self,
        query: &str,
        page: u32,
        limit: u32,
    ) -> Result<Page<UserSummary>, ApiError> {
        let mut params = vec![("q", query.to_string())];
        params.extend(paging(page, limit));
        let body = self
            .request(
                Method::GET,
                "api/users/search",
                RouteKind::Protected,
                Some(&params),
                None,
            )
            .await?;
        page_from_value(&body, limit, user_from_value)
    }

    // ------------------------------------------------------------------
    // Shared list plumbing
    // ------------------------------------------------------------------

    async fn post_list(&self, path: &str, page: u32, limit: u32) -> Result<Page<Post>, ApiError> {
        let body = self
            .request(
                Method::GET,
                path,
                RouteKind::Protected,
                Some(&paging(page, limit)),
                None,
            )
            .await?;
        page_from_value(&body, limit, post_from_value)
    }

    async fn user_list(
        &self,
        path: &str,
        page: u32,
        limit: u32,
    ) -> Result<Page<UserSummary>, ApiError> {
        let body = self
            .request(
                Method::GET,
                path,
                RouteKind::Protected,
                Some(&paging(page, limit)),
                None,
            )
            .await?;
        page_from_value(&body, limit, user_from_value)
    }
}
