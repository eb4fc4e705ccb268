pub mod youtube;

use anyhow::Result;
use async_trait::async_trait;

use crate::audio::queue::Track;

pub use youtube::YouTubeResolver;

/// Turns a user query into a playable track.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrackResolver: Send + Sync {
    /// Resolves a URL or free-text search. `Ok(None)` means the lookup
    /// worked but found nothing.
    async fn resolve(&self, query: &str, requested_by: &str) -> Result<Option<Track>>;
}
