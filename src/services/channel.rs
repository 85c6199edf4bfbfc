//! Channel thumbnail updates and the invalidation rule
//!
//! A cached avatar is only dropped when the channel's stored URL changes from
//! one non-null value to a different non-null value. Clearing the URL keeps
//! the cached image, which is how avatars survive deleted channels.

use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::errors::{AppError, AppResult};
use crate::image_cache::ImageCacheService;
use crate::image_cache::key::{ImageKind, validate_identifier};
use crate::repositories::ChannelStore;

/// How a thumbnail URL update relates to the previously stored value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThumbnailUrlChange {
    Unchanged,
    /// NULL to URL
    Set,
    /// URL to NULL
    Cleared,
    /// URL to a different URL
    Replaced,
}

impl ThumbnailUrlChange {
    pub fn classify(previous: Option<&str>, next: Option<&str>) -> Self {
        match (previous, next) {
            (Some(old), Some(new)) if old != new => Self::Replaced,
            (None, Some(_)) => Self::Set,
            (Some(_), None) => Self::Cleared,
            _ => Self::Unchanged,
        }
    }

    pub fn requires_invalidation(&self) -> bool {
        matches!(self, Self::Replaced)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ThumbnailUpdate {
    pub channel_id: String,
    pub change: ThumbnailUrlChange,
    pub invalidated: bool,
}

pub struct ChannelService {
    store: Arc<dyn ChannelStore>,
    image_cache: Arc<ImageCacheService>,
}

impl ChannelService {
    pub fn new(store: Arc<dyn ChannelStore>, image_cache: Arc<ImageCacheService>) -> Self {
        Self { store, image_cache }
    }

    /// Store a new thumbnail URL and invalidate the cached avatar if the
    /// source was replaced
    pub async fn update_thumbnail_url(
        &self,
        channel_id: &str,
        thumbnail_url: Option<String>,
    ) -> AppResult<ThumbnailUpdate> {
        validate_identifier(ImageKind::Channel, channel_id, 1)
            .map_err(|e| AppError::validation(e.to_string()))?;

        let thumbnail_url = thumbnail_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        let previous = self
            .store
            .upsert_thumbnail_url(channel_id, thumbnail_url.clone())
            .await?;

        let change = ThumbnailUrlChange::classify(previous.as_deref(), thumbnail_url.as_deref());
        let invalidated = change.requires_invalidation();
        if invalidated {
            self.image_cache.invalidate_channel(channel_id).await;
        }

        info!(channel_id, ?change, invalidated, "Updated channel thumbnail URL");

        Ok(ThumbnailUpdate {
            channel_id: channel_id.to_string(),
            change,
            invalidated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Some("https://a/1.jpg"), Some("https://a/2.jpg"), ThumbnailUrlChange::Replaced)]
    #[case(Some("https://a/1.jpg"), Some("https://a/1.jpg"), ThumbnailUrlChange::Unchanged)]
    #[case(None, Some("https://a/1.jpg"), ThumbnailUrlChange::Set)]
    #[case(Some("https://a/1.jpg"), None, ThumbnailUrlChange::Cleared)]
    #[case(None, None, ThumbnailUrlChange::Unchanged)]
    fn test_classify(
        #[case] previous: Option<&str>,
        #[case] next: Option<&str>,
        #[case] expected: ThumbnailUrlChange,
    ) {
        let change = ThumbnailUrlChange::classify(previous, next);
        assert_eq!(change, expected);
        assert_eq!(
            change.requires_invalidation(),
            expected == ThumbnailUrlChange::Replaced
        );
    }
}
