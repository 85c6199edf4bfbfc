//! Repository trait definitions
//!
//! The image cache only needs to read a channel's thumbnail URL, so that
//! lookup is split from the wider channel store used by the write path.

use async_trait::async_trait;

use crate::errors::RepositoryResult;

/// Read access to the upstream URL of a channel's avatar
///
/// # Returns
///
/// * `Ok(Some(url))` - The channel exists and has a thumbnail URL
/// * `Ok(None)` - Unknown channel, or the channel has no thumbnail URL
#[async_trait]
pub trait ChannelThumbnailLookup: Send + Sync {
    async fn lookup_thumbnail_url(&self, channel_id: &str) -> RepositoryResult<Option<String>>;
}

/// Channel persistence used by the HTTP layer and the cache warmer
#[async_trait]
pub trait ChannelStore: ChannelThumbnailLookup {
    /// Ids of every channel with a non-null thumbnail URL
    async fn channel_ids_with_thumbnails(&self) -> RepositoryResult<Vec<String>>;

    /// Set the thumbnail URL, creating the channel if it does not exist
    ///
    /// Returns the previously stored URL.
    async fn upsert_thumbnail_url(
        &self,
        channel_id: &str,
        thumbnail_url: Option<String>,
    ) -> RepositoryResult<Option<String>>;
}
