//! Removal of cached channel avatars when their source changes

use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, warn};

use super::directory::CacheLayout;
use super::key::CacheKey;
use crate::observability::ImageCacheMetrics;

/// Removes cached channel images when their source changes
///
/// Only channels can be invalidated: a video thumbnail URL is derived from
/// the video id and never changes.
#[derive(Clone)]
pub struct CacheInvalidator {
    layout: CacheLayout,
    passthrough: bool,
    metrics: ImageCacheMetrics,
}

impl CacheInvalidator {
    pub fn new(layout: CacheLayout, passthrough: bool, metrics: ImageCacheMetrics) -> Self {
        Self {
            layout,
            passthrough,
            metrics,
        }
    }

    /// Delete the channel's entry and marker; idempotent and infallible
    pub async fn invalidate_channel(&self, channel_id: &str) {
        if self.passthrough {
            return;
        }

        let key = match CacheKey::channel(channel_id) {
            Ok(key) => key,
            Err(e) => {
                debug!("Skipping invalidation: {}", e);
                return;
            }
        };

        let paths = self.layout.paths_for(&key);
        let removed_entry = remove_if_present(&paths.entry).await;
        let removed_marker = remove_if_present(&paths.marker).await;

        self.metrics.record_invalidation();
        if removed_entry || removed_marker {
            info!(
                channel_id,
                removed_entry, removed_marker, "Invalidated cached channel image"
            );
        }
    }
}

async fn remove_if_present(path: &Path) -> bool {
    match fs::remove_file(path).await {
        Ok(()) => true,
        Err(e) if e.kind() == ErrorKind::NotFound => false,
        Err(e) => {
            warn!("Failed to remove {}: {}", path.display(), e);
            false
        }
    }
}
