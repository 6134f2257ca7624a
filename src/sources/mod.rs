pub mod youtube;

use async_trait::async_trait;

use crate::error::MusicResult;

pub use youtube::YtDlpResolver;

/// One search result: enough to queue and later stream a song.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
}

/// Turns free-text queries into playable URLs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SongResolver: Send + Sync {
    /// Returns up to `limit` hits, best first. An empty list means nothing
    /// matched; failures of the underlying tool are errors.
    async fn search(&self, query: &str, limit: usize) -> MusicResult<Vec<SearchHit>>;
}
