//! Bulk pre-population of channel avatars

use futures::{StreamExt, stream};
use serde::Serialize;
use std::time::Instant;
use tracing::info;

use crate::errors::AppResult;
use crate::image_cache::{CacheStatus, ImageCacheService};
use crate::repositories::ChannelStore;

/// Tally of one warm run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WarmReport {
    pub total: usize,
    /// Already cached
    pub hits: usize,
    /// Fetched during this run
    pub fetched: usize,
    /// No image available right now
    pub placeholders: usize,
}

impl WarmReport {
    fn add(&mut self, status: CacheStatus) {
        self.total += 1;
        match status {
            CacheStatus::Hit => self.hits += 1,
            CacheStatus::Miss => self.fetched += 1,
            CacheStatus::Placeholder => self.placeholders += 1,
        }
    }
}

/// Warm the avatar of every channel that has a thumbnail URL
///
/// Runs at most `max_concurrent_fetches` warm operations at once; the fetch
/// semaphore still bounds the upstream requests themselves.
pub async fn warm_all_channels(
    image_cache: &ImageCacheService,
    store: &dyn ChannelStore,
) -> AppResult<WarmReport> {
    let started = Instant::now();
    let channel_ids = store.channel_ids_with_thumbnails().await?;
    info!("Warming avatars for {} channels", channel_ids.len());

    let concurrency = image_cache.config().max_concurrent_fetches.max(1);
    let report = stream::iter(channel_ids)
        .map(|channel_id| async move {
            image_cache.warm_channel_image(store, &channel_id).await
        })
        .buffer_unordered(concurrency)
        .fold(WarmReport::default(), |mut report, status| async move {
            report.add(status);
            report
        })
        .await;

    info!(
        total = report.total,
        hits = report.hits,
        fetched = report.fetched,
        placeholders = report.placeholders,
        "Channel avatar warm finished in {:?}",
        started.elapsed()
    );
    Ok(report)
}
