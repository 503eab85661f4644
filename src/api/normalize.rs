//! Wire payload normalization.
//!
//! The server family behind this client disagrees with itself about field
//! names: counts arrive as `likeCount` or `likesCount`, viewer flags as
//! `likedByMe` or `isLiked`, profile stats in camelCase or snake_case.
//! Each canonical field has an ordered candidate list and the first
//! *present, non-null* candidate wins; absent counts default to zero and
//! absent flags to false. Structural fields (ids, usernames, timestamps)
//! are required and fail decoding when missing.

use serde_json::{Map, Value};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::warn;

use crate::domain::{AuthSession, Comment, Page, Post, Profile, UserSummary};

use super::error::ApiError;

/// Candidate lists for post fields, in priority order.
const POST_IMAGE: &[&str] = &["imageUrl", "image"];
const POST_LIKES: &[&str] = &["likeCount", "likesCount"];
const POST_COMMENTS: &[&str] = &["commentCount", "commentsCount"];
const POST_LIKED: &[&str] = &["likedByMe", "isLiked"];
const POST_SAVED: &[&str] = &["savedByMe", "isSaved"];
const USER_AVATAR: &[&str] = &["avatarUrl", "avatar"];

/// Candidate lists for profile stats and flags, in priority order.
const PROFILE_POSTS: &[&str] = &["postsCount", "postCount", "posts_count"];
const PROFILE_FOLLOWERS: &[&str] = &["followersCount", "followerCount", "followers_count"];
const PROFILE_FOLLOWING: &[&str] = &["followingCount", "following_count"];
const PROFILE_LIKES: &[&str] = &["likesCount", "likeCount", "likes_count"];
const PROFILE_FOLLOWED_BY_ME: &[&str] = &["isFollowedByMe", "is_followed_by_me"];
const PROFILE_IS_ME: &[&str] = &["isMe", "is_me"];
const PROFILE_FOLLOWS_ME: &[&str] = &["followsMe", "follows_me"];

const CREATED_AT: &[&str] = &["createdAt", "created_at"];
const UPDATED_AT: &[&str] = &["updatedAt", "updated_at"];

/// First present, non-null value among `names`.
fn first<'a>(map: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .find_map(|name| map.get(*name))
        .filter(|value| !value.is_null())
}

fn count_field(map: &Map<String, Value>, names: &[&str]) -> u32 {
    first(map, names)
        .and_then(Value::as_i64)
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0)
}

fn flag_field(map: &Map<String, Value>, names: &[&str]) -> bool {
    first(map, names).and_then(Value::as_bool).unwrap_or(false)
}

fn str_field(map: &Map<String, Value>, names: &[&str]) -> Option<String> {
    first(map, names).and_then(Value::as_str).map(str::to_string)
}

fn require_object<'a>(value: &'a Value, entity: &str) -> Result<&'a Map<String, Value>, ApiError> {
    value
        .as_object()
        .ok_or_else(|| ApiError::decode(format!("{entity} payload is not an object")))
}

fn require_i64(map: &Map<String, Value>, names: &[&str], field: &str) -> Result<i64, ApiError> {
    first(map, names)
        .and_then(Value::as_i64)
        .ok_or_else(|| ApiError::decode(format!("missing or malformed `{field}`")))
}

fn require_str(map: &Map<String, Value>, names: &[&str], field: &str) -> Result<String, ApiError> {
    str_field(map, names).ok_or_else(|| ApiError::decode(format!("missing or malformed `{field}`")))
}

fn require_timestamp(
    map: &Map<String, Value>,
    names: &[&str],
    field: &str,
) -> Result<OffsetDateTime, ApiError> {
    let raw = require_str(map, names, field)?;
    OffsetDateTime::parse(&raw, &Rfc3339)
        .map_err(|err| ApiError::decode(format!("unparseable `{field}` ({raw}): {err}")))
}

fn optional_timestamp(map: &Map<String, Value>, names: &[&str]) -> Option<OffsetDateTime> {
    let raw = str_field(map, names)?;
    OffsetDateTime::parse(&raw, &Rfc3339).ok()
}

/// Normalize a user summary (post author, comment author, list row).
pub fn user_from_value(value: &Value) -> Result<UserSummary, ApiError> {
    let map = require_object(value, "user")?;
    Ok(UserSummary {
        id: require_i64(map, &["id"], "user.id")?,
        username: require_str(map, &["username"], "user.username")?,
        name: require_str(map, &["name"], "user.name")?,
        email: str_field(map, &["email"]),
        avatar: str_field(map, USER_AVATAR),
        bio: str_field(map, &["bio"]),
    })
}

/// Normalize a post payload into the canonical [`Post`].
pub fn post_from_value(value: &Value) -> Result<Post, ApiError> {
    let map = require_object(value, "post")?;
    let author = map
        .get("author")
        .ok_or_else(|| ApiError::decode("post is missing `author`"))?;
    let created_at = require_timestamp(map, CREATED_AT, "post.createdAt")?;

    Ok(Post {
        id: require_i64(map, &["id"], "post.id")?,
        author: user_from_value(author)?,
        image: str_field(map, POST_IMAGE).unwrap_or_default(),
        caption: str_field(map, &["caption"]),
        created_at,
        updated_at: optional_timestamp(map, UPDATED_AT).unwrap_or(created_at),
        likes_count: count_field(map, POST_LIKES),
        comments_count: count_field(map, POST_COMMENTS),
        is_liked: flag_field(map, POST_LIKED),
        is_saved: flag_field(map, POST_SAVED),
    })
}

/// Normalize a profile payload into the canonical [`Profile`].
pub fn profile_from_value(value: &Value) -> Result<Profile, ApiError> {
    let map = require_object(value, "profile")?;
    Ok(Profile {
        id: require_i64(map, &["id"], "profile.id")?,
        username: require_str(map, &["username"], "profile.username")?,
        name: require_str(map, &["name"], "profile.name")?,
        email: str_field(map, &["email"]),
        bio: str_field(map, &["bio"]),
        avatar: str_field(map, USER_AVATAR),
        posts_count: count_field(map, PROFILE_POSTS),
        followers_count: count_field(map, PROFILE_FOLLOWERS),
        following_count: count_field(map, PROFILE_FOLLOWING),
        likes_count: count_field(map, PROFILE_LIKES),
        is_followed_by_me: flag_field(map, PROFILE_FOLLOWED_BY_ME),
        is_me: flag_field(map, PROFILE_IS_ME),
        follows_me: flag_field(map, PROFILE_FOLLOWS_ME),
    })
}

/// Normalize a comment payload into the canonical [`Comment`].
pub fn comment_from_value(value: &Value) -> Result<Comment, ApiError> {
    let map = require_object(value, "comment")?;
    let author = map
        .get("author")
        .ok_or_else(|| ApiError::decode("comment is missing `author`"))?;
    Ok(Comment {
        id: require_i64(map, &["id"], "comment.id")?,
        post_id: require_i64(map, &["postId", "post_id"], "comment.postId")?,
        text: require_str(map, &["text"], "comment.text")?,
        author: user_from_value(author)?,
        created_at: require_timestamp(map, CREATED_AT, "comment.createdAt")?,
    })
}

/// Normalize a login/register payload (`{"token": ..., "user": {...}}`).
pub fn session_from_value(value: &Value) -> Result<AuthSession, ApiError> {
    let map = require_object(value, "session")?;
    let user = map
        .get("user")
        .ok_or_else(|| ApiError::decode("session is missing `user`"))?;
    Ok(AuthSession {
        token: require_str(map, &["token"], "session.token")?,
        user: user_from_value(user)?,
    })
}

/// Normalize a paginated body in either of the two supported shapes:
///
/// - `{"items": [...], "pagination": {"page", "limit", "total", "totalPages"}}`
/// - `{"data": [...], "page", "limit", "total", "totalPages"}`
///
/// An unrecognized shape degrades to an empty first page rather than an
/// error, matching the tolerant contract of list endpoints.
pub fn page_from_value<T>(
    value: &Value,
    limit_hint: u32,
    item: impl Fn(&Value) -> Result<T, ApiError>,
) -> Result<Page<T>, ApiError> {
    let map = require_object(value, "page")?;

    let (raw_items, meta) = if let (Some(Value::Array(items)), Some(Value::Object(pagination))) =
        (map.get("items"), map.get("pagination"))
    {
        (items, pagination)
    } else if let Some(Value::Array(items)) = map.get("data") {
        (items, map)
    } else {
        warn!(
            keys = ?map.keys().collect::<Vec<_>>(),
            "paginated body has neither items/pagination nor data shape, treating as empty"
        );
        return Ok(Page::empty(limit_hint));
    };

    let items = raw_items.iter().map(item).collect::<Result<Vec<_>, _>>()?;

    Ok(Page {
        items,
        page: first(meta, &["page"])
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(1),
        limit: first(meta, &["limit"])
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(limit_hint),
        total: first(meta, &["total"]).and_then(Value::as_u64).unwrap_or(0),
        total_pages: first(meta, &["totalPages", "total_pages"])
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn author_value() -> Value {
        json!({"id": 3, "username": "lena", "name": "Lena", "avatarUrl": "/a/lena.png"})
    }

    #[test]
    fn post_prefers_first_named_count() {
        let value = json!({
            "id": 11,
            "author": author_value(),
            "imageUrl": "/img/11.jpg",
            "createdAt": "2026-05-01T10:00:00Z",
            "likeCount": 5,
            "likesCount": 99,
            "commentsCount": 2,
            "likedByMe": true
        });

        let post = post_from_value(&value).expect("post");
        assert_eq!(post.likes_count, 5);
        assert_eq!(post.comments_count, 2);
        assert!(post.is_liked);
        assert!(!post.is_saved);
        assert_eq!(post.image, "/img/11.jpg");
        assert_eq!(post.author.avatar.as_deref(), Some("/a/lena.png"));
    }

    #[test]
    fn post_zero_count_still_wins_over_fallback() {
        // Presence decides, not truthiness: an explicit likeCount of 0 must
        // not fall through to likesCount.
        let value = json!({
            "id": 11,
            "author": author_value(),
            "image": "/img/11.jpg",
            "createdAt": "2026-05-01T10:00:00Z",
            "likeCount": 0,
            "likesCount": 42
        });

        let post = post_from_value(&value).expect("post");
        assert_eq!(post.likes_count, 0);
    }

    #[test]
    fn post_null_candidate_falls_through() {
        let value = json!({
            "id": 11,
            "author": author_value(),
            "image": "/img/11.jpg",
            "createdAt": "2026-05-01T10:00:00Z",
            "likeCount": null,
            "likesCount": 7
        });

        let post = post_from_value(&value).expect("post");
        assert_eq!(post.likes_count, 7);
    }

    #[test]
    fn post_defaults_when_counts_absent() {
        let value = json!({
            "id": 11,
            "author": author_value(),
            "image": "/img/11.jpg",
            "createdAt": "2026-05-01T10:00:00Z"
        });

        let post = post_from_value(&value).expect("post");
        assert_eq!(post.likes_count, 0);
        assert_eq!(post.comments_count, 0);
        assert!(!post.is_liked);
        assert!(!post.is_saved);
        assert_eq!(post.updated_at, post.created_at);
    }

    #[test]
    fn post_without_timestamp_fails() {
        let value = json!({"id": 11, "author": author_value(), "image": "x"});
        let err = post_from_value(&value).expect_err("missing createdAt");
        assert!(matches!(err, ApiError::Decode { .. }));
    }

    #[test]
    fn profile_stats_fall_back_across_namings() {
        let value = json!({
            "id": 9,
            "username": "marco",
            "name": "Marco",
            "postCount": 4,
            "followers_count": 10,
            "followingCount": 3,
            "is_followed_by_me": true
        });

        let profile = profile_from_value(&value).expect("profile");
        assert_eq!(profile.posts_count, 4);
        assert_eq!(profile.followers_count, 10);
        assert_eq!(profile.following_count, 3);
        assert_eq!(profile.likes_count, 0);
        assert!(profile.is_followed_by_me);
        assert!(!profile.is_me);
    }

    #[test]
    fn profile_prefers_camel_case_tier() {
        let value = json!({
            "id": 9,
            "username": "marco",
            "name": "Marco",
            "postsCount": 12,
            "postCount": 4,
            "posts_count": 1
        });

        let profile = profile_from_value(&value).expect("profile");
        assert_eq!(profile.posts_count, 12);
    }

    #[test]
    fn comment_accepts_snake_case_post_id() {
        let value = json!({
            "id": 21,
            "post_id": 11,
            "text": "nice shot",
            "author": author_value(),
            "createdAt": "2026-05-01T12:00:00Z"
        });

        let comment = comment_from_value(&value).expect("comment");
        assert_eq!(comment.post_id, 11);
        assert_eq!(comment.text, "nice shot");
    }

    #[test]
    fn page_accepts_items_pagination_shape() {
        let value = json!({
            "items": [{"id": 5, "username": "ada", "name": "Ada"}],
            "pagination": {"page": 2, "limit": 20, "total": 41, "totalPages": 3}
        });

        let page = page_from_value(&value, 20, user_from_value).expect("page");
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.page, 2);
        assert_eq!(page.total, 41);
        assert_eq!(page.total_pages, 3);
    }

    #[test]
    fn page_accepts_flat_data_shape() {
        let value = json!({
            "data": [{"id": 5, "username": "ada", "name": "Ada"}],
            "page": 1,
            "limit": 10,
            "total": 1,
            "totalPages": 1
        });

        let page = page_from_value(&value, 20, user_from_value).expect("page");
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.limit, 10);
    }

    #[test]
    fn page_unknown_shape_degrades_to_empty() {
        let value = json!({"results": []});
        let page = page_from_value(&value, 20, user_from_value).expect("page");
        assert!(page.is_empty());
        assert_eq!(page.limit, 20);
    }

    #[test]
    fn page_malformed_item_is_an_error() {
        let value = json!({"data": [{"username": "no-id"}], "page": 1});
        let err = page_from_value(&value, 20, user_from_value).expect_err("bad item");
        assert!(matches!(err, ApiError::Decode { .. }));
    }
}
