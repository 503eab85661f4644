//! Mutation intents and their serialization targets.

/// A user-intent write the coordinator runs optimistically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Like { post_id: i64 },
    Unlike { post_id: i64 },
    Save { post_id: i64 },
    Unsave { post_id: i64 },
    Follow { username: String },
    Unfollow { username: String },
    AddComment { post_id: i64, text: String },
    DeleteComment { post_id: i64, comment_id: i64 },
}

/// Serialization unit. At most one mutation per target is in flight at a
/// time; same-target mutations queue behind each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MutationTarget {
    Post(i64),
    Profile(String),
}

impl Mutation {
    pub fn target(&self) -> MutationTarget {
        match self {
            Self::Like { post_id }
            | Self::Unlike { post_id }
            | Self::Save { post_id }
            | Self::Unsave { post_id }
            | Self::AddComment { post_id, .. }
            | Self::DeleteComment { post_id, .. } => MutationTarget::Post(*post_id),
            Self::Follow { username } | Self::Unfollow { username } => {
                MutationTarget::Profile(username.clone())
            }
        }
    }

    pub(crate) fn describe(&self) -> &'static str {
        match self {
            Self::Like { .. } => "like",
            Self::Unlike { .. } => "unlike",
            Self::Save { .. } => "save",
            Self::Unsave { .. } => "unsave",
            Self::Follow { .. } => "follow",
            Self::Unfollow { .. } => "unfollow",
            Self::AddComment { .. } => "add_comment",
            Self::DeleteComment { .. } => "delete_comment",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reactions_and_comments_share_the_post_target() {
        let like = Mutation::Like { post_id: 11 };
        let comment = Mutation::AddComment {
            post_id: 11,
            text: "hey".to_string(),
        };
        assert_eq!(like.target(), comment.target());
        assert_eq!(like.target(), MutationTarget::Post(11));
    }

    #[test]
    fn follow_targets_the_profile() {
        let follow = Mutation::Follow {
            username: "ada".to_string(),
        };
        assert_eq!(follow.target(), MutationTarget::Profile("ada".to_string()));
    }
}
