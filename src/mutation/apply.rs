//! Speculative transforms.
//!
//! Each transform edits one cached copy in place and reports whether it
//! changed anything. All of them are state-aware rather than blind
//! increments: liking an already-liked copy is a no-op, and decremented
//! counts floor at zero instead of wrapping.

use crate::domain::{Post, Profile};

pub(crate) fn like(post: &mut Post) -> bool {
    if post.is_liked {
        return false;
    }
    post.is_liked = true;
    post.likes_count += 1;
    true
}

pub(crate) fn unlike(post: &mut Post) -> bool {
    if !post.is_liked {
        return false;
    }
    post.is_liked = false;
    post.likes_count = post.likes_count.saturating_sub(1);
    true
}

pub(crate) fn save(post: &mut Post) -> bool {
    if post.is_saved {
        return false;
    }
    post.is_saved = true;
    true
}

pub(crate) fn unsave(post: &mut Post) -> bool {
    if !post.is_saved {
        return false;
    }
    post.is_saved = false;
    true
}

pub(crate) fn follow(profile: &mut Profile) -> bool {
    if profile.is_followed_by_me {
        return false;
    }
    profile.is_followed_by_me = true;
    profile.followers_count += 1;
    true
}

pub(crate) fn unfollow(profile: &mut Profile) -> bool {
    if !profile.is_followed_by_me {
        return false;
    }
    profile.is_followed_by_me = false;
    profile.followers_count = profile.followers_count.saturating_sub(1);
    true
}

pub(crate) fn comment_added(post: &mut Post) -> bool {
    post.comments_count += 1;
    true
}

pub(crate) fn comment_removed(post: &mut Post) -> bool {
    let next = post.comments_count.saturating_sub(1);
    if next == post.comments_count {
        return false;
    }
    post.comments_count = next;
    true
}
