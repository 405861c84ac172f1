//! Feed crawling: paginated post discovery and link extraction.

mod extract;
mod pushshift;

pub use extract::extract_urls;
pub use pushshift::SubredditStream;

use async_trait::async_trait;
use thiserror::Error;

/// One post discovered in the feed, with the candidate bundle links mined
/// from its body.
#[derive(Debug, Clone)]
pub struct PostInfo {
    /// Base-36 post id, stable across runs; keys the resume ledger.
    pub id: String,
    /// Unix timestamp of post creation; drives the pagination cursor.
    pub created_utc: i64,
    /// Path to the post itself (not to any linked file).
    pub permalink: String,
    pub title: String,
    /// Extracted, validated candidate URLs in body order.
    pub score_urls: Vec<String>,
}

#[derive(Debug, Error)]
pub enum CrawlError {
    /// The feed asked us to slow down (HTTP 429). The caller must back
    /// off before requesting more pages; the cursor has not advanced.
    #[error("feed rate limited")]
    RateLimited,
    #[error("feed returned HTTP {0}")]
    Status(u16),
    #[error("feed request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected feed payload: {0}")]
    Decode(String),
}

/// Restartable stream of feed posts, newest first.
#[async_trait]
pub trait PostSource: Send {
    /// Returns the next page of valid posts and advances the cursor.
    /// On error the cursor is unchanged and the page can be retried.
    async fn next_page(&mut self) -> Result<Vec<PostInfo>, CrawlError>;

    /// True once a page came back empty; `next_page` need not be called again.
    fn is_done(&self) -> bool;

    /// Rewinds to the newest posts.
    fn reset(&mut self);
}
