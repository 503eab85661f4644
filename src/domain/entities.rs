//! Canonical entities after wire normalization.
//!
//! Servers answer with several field-name dialects for the same data; the
//! gateway folds all of them into these types exactly once, so the rest of
//! the crate never sees a `likeCount`/`likesCount` distinction. Counts are
//! unsigned on purpose: a speculative decrement uses `saturating_sub` and
//! can never go below zero.

use serde::Serialize;
use time::OffsetDateTime;

/// Compact user representation embedded in posts, comments, and list rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub name: String,
    pub email: Option<String>,
    pub avatar: Option<String>,
    pub bio: Option<String>,
}

/// A single post with its author snapshot and viewer-relative flags.
///
/// `is_liked` and `is_saved` are relative to the authenticated viewer and
/// are the primary targets of speculative transforms.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Post {
    pub id: i64,
    pub author: UserSummary,
    pub image: String,
    pub caption: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub likes_count: u32,
    pub comments_count: u32,
    pub is_liked: bool,
    pub is_saved: bool,
}

/// Full profile page for a user, keyed by username.
///
/// `is_me`, `is_followed_by_me`, and `follows_me` are independent flags; a
/// profile can be both followed by the viewer and following the viewer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub id: i64,
    pub username: String,
    pub name: String,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub posts_count: u32,
    pub followers_count: u32,
    pub following_count: u32,
    pub likes_count: u32,
    pub is_followed_by_me: bool,
    pub is_me: bool,
    pub follows_me: bool,
}

/// A comment on a post.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub text: String,
    pub author: UserSummary,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// One page of a paginated collection.
///
/// `page` is 1-based. When `total` is zero the server may answer with
/// `total_pages` of zero, so `page <= total_pages` only holds for non-empty
/// collections.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
}

impl<T> Page<T> {
    /// An empty first page, used when the server answers with a shape the
    /// normalizer does not recognize.
    pub fn empty(limit: u32) -> Self {
        Self {
            items: Vec::new(),
            page: 1,
            limit,
            total: 0,
            total_pages: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Bearer credential plus the signed-in user, as answered by the auth
/// endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub user: UserSummary,
}

/// Input for account registration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Registration {
    pub name: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub password: String,
}

/// Partial profile edit. Absent fields are left untouched by the server,
/// so they are omitted from the payload entirely.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_page_has_no_items() {
        let page: Page<Post> = Page::empty(20);
        assert!(page.is_empty());
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, 20);
        assert_eq!(page.total, 0);
        assert_eq!(page.total_pages, 0);
    }

    #[test]
    fn profile_update_omits_absent_fields() {
        let update = ProfileUpdate {
            bio: Some("hello".to_string()),
            ..Default::default()
        };
        let body = serde_json::to_value(&update).expect("serialize");
        assert_eq!(body, serde_json::json!({"bio": "hello"}));
    }
}
