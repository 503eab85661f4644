//! Cache key definitions.
//!
//! `EntityKey` identifies an invalidation and ordering scope; `Collection`
//! identifies a paginated family whose pages are cached one by one and
//! invalidated together.

/// A paginated collection family.
///
/// Pages of one family share a single epoch scope: invalidating the family
/// drops every cached page and supersedes every in-flight fetch for it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Collection {
    /// The home feed.
    Feed,

    // Viewer-owned collections
    MyPosts,
    MyLikes,
    MySaved,
    MyFollowers,
    MyFollowing,

    // Collections of another user, keyed by username
    UserPosts(String),
    UserLikes(String),
    UserFollowers(String),
    UserFollowing(String),

    // Per-post collections
    PostComments(i64),
    PostLikers(i64),

    /// User search results, keyed by the raw query string.
    SearchUsers(String),
}

/// The item type a collection's pages carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionShape {
    Posts,
    Comments,
    Users,
}

impl Collection {
    pub fn shape(&self) -> CollectionShape {
        match self {
            Self::Feed
            | Self::MyPosts
            | Self::MyLikes
            | Self::MySaved
            | Self::UserPosts(_)
            | Self::UserLikes(_) => CollectionShape::Posts,
            Self::PostComments(_) => CollectionShape::Comments,
            Self::MyFollowers
            | Self::MyFollowing
            | Self::UserFollowers(_)
            | Self::UserFollowing(_)
            | Self::PostLikers(_)
            | Self::SearchUsers(_) => CollectionShape::Users,
        }
    }

    /// Search results age out; all other collections stay valid until
    /// invalidated.
    pub fn is_search(&self) -> bool {
        matches!(self, Self::SearchUsers(_))
    }
}

/// Identifies a cached entity or collection for epoch tracking and
/// invalidation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityKey {
    /// A post by id.
    Post(i64),
    /// A profile by username.
    Profile(String),
    /// The viewer's own profile.
    Me,
    /// All pages of one collection family.
    Collection(Collection),
}

impl From<Collection> for EntityKey {
    fn from(collection: Collection) -> Self {
        Self::Collection(collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_shapes() {
        assert_eq!(Collection::Feed.shape(), CollectionShape::Posts);
        assert_eq!(
            Collection::UserLikes("ada".into()).shape(),
            CollectionShape::Posts
        );
        assert_eq!(
            Collection::PostComments(7).shape(),
            CollectionShape::Comments
        );
        assert_eq!(Collection::PostLikers(7).shape(), CollectionShape::Users);
        assert_eq!(
            Collection::SearchUsers("len".into()).shape(),
            CollectionShape::Users
        );
    }

    #[test]
    fn only_search_collections_age_out() {
        assert!(Collection::SearchUsers("len".into()).is_search());
        assert!(!Collection::Feed.is_search());
        assert!(!Collection::MyFollowers.is_search());
    }

    #[test]
    fn entity_key_equality() {
        assert_eq!(EntityKey::Post(5), EntityKey::Post(5));
        assert_ne!(EntityKey::Post(5), EntityKey::Post(6));
        assert_eq!(
            EntityKey::from(Collection::Feed),
            EntityKey::Collection(Collection::Feed)
        );
        assert_ne!(
            EntityKey::Profile("ada".into()),
            EntityKey::Profile("lena".into())
        );
    }
}
