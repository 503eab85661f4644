//! Cache configuration.

use std::num::NonZeroUsize;
use std::time::Duration;

const DEFAULT_POST_LIMIT: usize = 512;
const DEFAULT_PROFILE_LIMIT: usize = 128;
const DEFAULT_POST_PAGE_LIMIT: usize = 64;
const DEFAULT_COMMENT_PAGE_LIMIT: usize = 128;
const DEFAULT_USER_PAGE_LIMIT: usize = 64;
const DEFAULT_SEARCH_FRESHNESS_SECS: u64 = 30;

/// Size limits and freshness windows for the entity cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum posts held by id.
    pub post_limit: usize,
    /// Maximum profiles held by username.
    pub profile_limit: usize,
    /// Maximum cached pages across post collections.
    pub post_page_limit: usize,
    /// Maximum cached pages across comment threads.
    pub comment_page_limit: usize,
    /// Maximum cached pages across user lists and searches.
    pub user_page_limit: usize,
    /// How long a search page counts as fresh.
    pub search_freshness_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            post_limit: DEFAULT_POST_LIMIT,
            profile_limit: DEFAULT_PROFILE_LIMIT,
            post_page_limit: DEFAULT_POST_PAGE_LIMIT,
            comment_page_limit: DEFAULT_COMMENT_PAGE_LIMIT,
            user_page_limit: DEFAULT_USER_PAGE_LIMIT,
            search_freshness_secs: DEFAULT_SEARCH_FRESHNESS_SECS,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            post_limit: settings.post_limit,
            profile_limit: settings.profile_limit,
            post_page_limit: settings.post_page_limit,
            comment_page_limit: settings.comment_page_limit,
            user_page_limit: settings.user_page_limit,
            search_freshness_secs: settings.search_freshness_secs,
        }
    }
}

fn non_zero(value: usize) -> NonZeroUsize {
    NonZeroUsize::new(value).unwrap_or(NonZeroUsize::MIN)
}

impl CacheConfig {
    pub fn search_freshness(&self) -> Duration {
        Duration::from_secs(self.search_freshness_secs)
    }

    // Store capacities. A zero limit clamps to one entry instead of failing.

    pub(crate) fn post_limit_non_zero(&self) -> NonZeroUsize {
        non_zero(self.post_limit)
    }

    pub(crate) fn profile_limit_non_zero(&self) -> NonZeroUsize {
        non_zero(self.profile_limit)
    }

    pub(crate) fn post_page_limit_non_zero(&self) -> NonZeroUsize {
        non_zero(self.post_page_limit)
    }

    pub(crate) fn comment_page_limit_non_zero(&self) -> NonZeroUsize {
        non_zero(self.comment_page_limit)
    }

    pub(crate) fn user_page_limit_non_zero(&self) -> NonZeroUsize {
        non_zero(self.user_page_limit)
    }
}
