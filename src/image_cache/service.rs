//! Request orchestration for cached images
//!
//! Every request walks the same state machine:
//!
//! ```text
//! passthrough? -> placeholder
//! cache probe  -> HIT: serve from disk
//! negative?    -> placeholder
//! resolve source (none -> placeholder)
//! fetch        -> stored: serve fresh bytes (MISS)
//!              -> permanent failure: write marker, placeholder
//!              -> transient failure: placeholder
//! ```

use bytes::Bytes;
use std::future::Future;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, warn};

use super::content_type::ContentTypeSniffer;
use super::directory::{CachePaths, DirectoryManager};
use super::fetcher::{ContentFetcher, FetchFailure, FetchOutcome};
use super::invalidator::CacheInvalidator;
use super::key::{CacheKey, ImageKind, VideoQuality};
use super::placeholder::PlaceholderGenerator;
use super::probe::{CacheState, CacheStateProbe};
use super::response::{CacheStatus, ImageResponse};
use crate::config::ImageCacheConfig;
use crate::errors::{AppError, AppResult, ImageCacheResult};
use crate::observability::ImageCacheMetrics;
use crate::repositories::ChannelThumbnailLookup;
use crate::utils::url::UrlUtils;

/// Which timeout applies to an upstream fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPolicy {
    /// A client is waiting on the response
    OnDemand,
    /// Cache warming; nobody is waiting
    Background,
}

/// Façade over the image cache
///
/// Request methods never fail: every problem below this layer resolves to a
/// placeholder response.
pub struct ImageCacheService {
    config: ImageCacheConfig,
    directories: DirectoryManager,
    probe: CacheStateProbe,
    fetcher: ContentFetcher,
    invalidator: CacheInvalidator,
    /// Bumped on every channel invalidation; a channel fetch that started in
    /// an older epoch must not leave its entry behind
    invalidation_epoch: Arc<AtomicU64>,
    metrics: ImageCacheMetrics,
}

impl ImageCacheService {
    /// Prepare the cache directories and build the fetcher
    ///
    /// Storage problems do not fail construction, they switch the service
    /// into passthrough mode. Only an unusable configuration is an error.
    pub async fn new(config: ImageCacheConfig, metrics: ImageCacheMetrics) -> AppResult<Self> {
        config.validate().map_err(AppError::configuration)?;

        let directories = DirectoryManager::initialize(&config).await;
        let probe = CacheStateProbe::new(
            config.min_image_bytes,
            config.max_image_bytes,
            metrics.clone(),
        );
        let fetcher = ContentFetcher::new(&config)?;
        let invalidator = CacheInvalidator::new(
            directories.layout().clone(),
            directories.is_passthrough(),
            metrics.clone(),
        );

        info!(
            cache_root = %config.cache_root.display(),
            max_concurrent_fetches = config.max_concurrent_fetches,
            passthrough = directories.is_passthrough(),
            "Image cache service initialised"
        );

        Ok(Self {
            config,
            directories,
            probe,
            fetcher,
            invalidator,
            invalidation_epoch: Arc::new(AtomicU64::new(0)),
            metrics,
        })
    }

    pub fn config(&self) -> &ImageCacheConfig {
        &self.config
    }

    pub fn is_passthrough(&self) -> bool {
        self.directories.is_passthrough()
    }

    /// Channel avatar; the upstream URL comes from `store`
    pub async fn get_channel_image<S>(&self, store: &S, channel_id: &str) -> ImageResponse
    where
        S: ChannelThumbnailLookup + ?Sized,
    {
        let response = self
            .channel_image(store, channel_id, FetchPolicy::OnDemand)
            .await;
        self.record(ImageKind::Channel, &response);
        response
    }

    /// Video thumbnail; the upstream URL is derived from the id and quality
    pub async fn get_video_image(&self, video_id: &str, quality: VideoQuality) -> ImageResponse {
        let response = self
            .video_image(video_id, quality, FetchPolicy::OnDemand)
            .await;
        self.record(ImageKind::Video, &response);
        response
    }

    /// Populate the channel avatar ahead of any request
    pub async fn warm_channel_image<S>(&self, store: &S, channel_id: &str) -> CacheStatus
    where
        S: ChannelThumbnailLookup + ?Sized,
    {
        self.channel_image(store, channel_id, FetchPolicy::Background)
            .await
            .cache_status
    }

    /// Populate a video thumbnail ahead of any request
    pub async fn warm_video_image(&self, video_id: &str, quality: VideoQuality) -> CacheStatus {
        self.video_image(video_id, quality, FetchPolicy::Background)
            .await
            .cache_status
    }

    /// Drop the cached avatar and any negative marker for a channel
    pub async fn invalidate_channel(&self, channel_id: &str) {
        self.invalidation_epoch.fetch_add(1, Ordering::SeqCst);
        self.invalidator.invalidate_channel(channel_id).await;
    }

    /// `{base}/{video_id}/{quality}.jpg`
    pub fn video_source_url(&self, video_id: &str, quality: VideoQuality) -> String {
        format!(
            "{}/{}/{}.jpg",
            self.config.video_thumbnail_base_url.trim_end_matches('/'),
            video_id,
            quality
        )
    }

    async fn channel_image<S>(
        &self,
        store: &S,
        channel_id: &str,
        policy: FetchPolicy,
    ) -> ImageResponse
    where
        S: ChannelThumbnailLookup + ?Sized,
    {
        let resolve = move || async move {
            match store.lookup_thumbnail_url(channel_id).await {
                Ok(Some(url)) if !url.trim().is_empty() => Some(url),
                Ok(_) => {
                    debug!("Channel {} has no thumbnail URL", channel_id);
                    None
                }
                Err(e) => {
                    warn!("Thumbnail lookup failed for channel {}: {}", channel_id, e);
                    None
                }
            }
        };

        self.serve(
            ImageKind::Channel,
            CacheKey::channel(channel_id),
            policy,
            resolve,
        )
        .await
    }

    async fn video_image(
        &self,
        video_id: &str,
        quality: VideoQuality,
        policy: FetchPolicy,
    ) -> ImageResponse {
        let resolve = move || async move { Some(self.video_source_url(video_id, quality)) };
        self.serve(
            ImageKind::Video,
            CacheKey::video(video_id, quality),
            policy,
            resolve,
        )
        .await
    }

    async fn serve<F, Fut>(
        &self,
        kind: ImageKind,
        key: ImageCacheResult<CacheKey>,
        policy: FetchPolicy,
        resolve_source: F,
    ) -> ImageResponse
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<String>>,
    {
        if self.is_passthrough() {
            return PlaceholderGenerator::serve(kind);
        }

        let key = match key {
            Ok(key) => key,
            Err(e) => {
                debug!("Serving placeholder: {}", e);
                return PlaceholderGenerator::serve(kind);
            }
        };
        let paths = self.directories.layout().paths_for(&key);

        if let Some(response) = self.serve_cached(kind, &paths.entry).await {
            return response;
        }

        if self.probe.check_negative(&paths.marker).await {
            debug!("Negative marker present for {}", paths.entry.display());
            return PlaceholderGenerator::serve(kind);
        }

        let epoch = self.invalidation_epoch.load(Ordering::SeqCst);
        let Some(url) = resolve_source().await else {
            return PlaceholderGenerator::serve(kind);
        };

        match self.fetch(kind, url, paths, policy, epoch).await {
            FetchOutcome::Stored(body) => {
                let media_type = ContentTypeSniffer::detect_bytes(&body);
                ImageResponse::new(body, media_type, CacheStatus::Miss)
            }
            FetchOutcome::Failed(_) => PlaceholderGenerator::serve(kind),
        }
    }

    /// `None` when there is no valid entry, including one removed between
    /// the probe and the read
    async fn serve_cached(&self, kind: ImageKind, entry: &Path) -> Option<ImageResponse> {
        let CacheState::Hit { .. } = self.probe.probe(kind, entry).await else {
            return None;
        };

        match fs::read(entry).await {
            Ok(bytes) => {
                let media_type = ContentTypeSniffer::detect_bytes(&bytes);
                Some(ImageResponse::new(
                    Bytes::from(bytes),
                    media_type,
                    CacheStatus::Hit,
                ))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Cache entry {} vanished before read", entry.display());
                None
            }
            Err(e) => {
                warn!("Failed to read cache entry {}: {}", entry.display(), e);
                None
            }
        }
    }

    /// Run the fetch on its own task so it completes, and records a marker
    /// on a permanent miss, even if the caller goes away
    async fn fetch(
        &self,
        kind: ImageKind,
        url: String,
        paths: CachePaths,
        policy: FetchPolicy,
        epoch: u64,
    ) -> FetchOutcome {
        let fetcher = self.fetcher.clone();
        let invalidation_epoch = self.invalidation_epoch.clone();
        let probe = self.probe.clone();
        let metrics = self.metrics.clone();
        let timeout = self.timeout_for(policy);

        let task = tokio::spawn(async move {
            let outcome = fetcher.fetch(&url, &paths.entry, timeout).await;
            metrics.record_fetch(kind, outcome.label());

            // The source URL may have been replaced while this fetch ran
            if kind == ImageKind::Channel
                && outcome.is_success()
                && invalidation_epoch.load(Ordering::SeqCst) != epoch
            {
                debug!(
                    "Discarding {} fetched across an invalidation",
                    paths.entry.display()
                );
                if let Err(e) = fs::remove_file(&paths.entry).await
                    && e.kind() != ErrorKind::NotFound
                {
                    warn!("Failed to discard stale entry {}: {}", paths.entry.display(), e);
                }
            }

            if let FetchOutcome::Failed(failure) = &outcome {
                log_failure(kind, &url, &paths.entry, failure);
                if failure.is_permanent()
                    && let Err(e) = probe.write_negative_marker(&paths).await
                {
                    warn!("Failed to write negative marker: {}", e);
                }
            }
            outcome
        });

        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Image fetch task failed: {}", e);
                FetchOutcome::Failed(FetchFailure::NetworkError)
            }
        }
    }

    fn timeout_for(&self, policy: FetchPolicy) -> Duration {
        match policy {
            FetchPolicy::OnDemand => self.config.on_demand_timeout,
            FetchPolicy::Background => self.config.background_timeout,
        }
    }

    fn record(&self, kind: ImageKind, response: &ImageResponse) {
        self.metrics
            .record_request(kind, response.cache_status, response.body.len());
    }
}

fn log_failure(kind: ImageKind, url: &str, entry: &Path, failure: &FetchFailure) {
    let url = UrlUtils::obfuscate_credentials(url);
    if failure.is_permanent() {
        info!(%kind, %url, reason = %failure, "Upstream image gone, recording negative marker");
    } else {
        warn!(
            %kind,
            %url,
            entry = %entry.display(),
            reason = %failure,
            "Upstream image fetch failed"
        );
    }
}
