//! Cache directory layout and startup preparation

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::key::{CacheKey, ImageKind};
use crate::config::ImageCacheConfig;
use crate::errors::{ImageCacheError, ImageCacheResult};

/// Absolute locations of the two kind directories
#[derive(Debug, Clone)]
pub struct CacheLayout {
    pub channel_dir: PathBuf,
    pub video_dir: PathBuf,
}

/// Entry and marker paths resolved for one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePaths {
    pub entry: PathBuf,
    pub marker: PathBuf,
}

impl CacheLayout {
    pub fn from_config(config: &ImageCacheConfig) -> Self {
        Self {
            channel_dir: config.channel_dir(),
            video_dir: config.video_dir(),
        }
    }

    pub fn kind_dir(&self, kind: ImageKind) -> &Path {
        match kind {
            ImageKind::Channel => &self.channel_dir,
            ImageKind::Video => &self.video_dir,
        }
    }

    pub fn paths_for(&self, key: &CacheKey) -> CachePaths {
        let base = self.kind_dir(key.kind());
        CachePaths {
            entry: base.join(key.relative_path()),
            marker: base.join(key.marker_relative_path()),
        }
    }
}

/// Prepares the cache directories once at startup
///
/// Preparation is idempotent. When it fails for any reason the manager
/// reports passthrough mode for the rest of the process lifetime.
#[derive(Debug, Clone)]
pub struct DirectoryManager {
    layout: CacheLayout,
    passthrough: bool,
}

impl DirectoryManager {
    pub async fn initialize(config: &ImageCacheConfig) -> Self {
        let layout = CacheLayout::from_config(config);

        let passthrough = match Self::prepare(&layout).await {
            Ok(()) => {
                info!(
                    channel_dir = %layout.channel_dir.display(),
                    video_dir = %layout.video_dir.display(),
                    "Image cache directories ready"
                );
                false
            }
            Err(e) => {
                error!(
                    "Image cache storage unavailable, serving placeholders only: {}",
                    e
                );
                true
            }
        };

        Self {
            layout,
            passthrough,
        }
    }

    async fn prepare(layout: &CacheLayout) -> ImageCacheResult<()> {
        for dir in [&layout.channel_dir, &layout.video_dir] {
            fs::create_dir_all(dir)
                .await
                .map_err(|source| ImageCacheError::StorageUnavailable {
                    path: dir.clone(),
                    source,
                })?;
            Self::probe_writable(dir).await?;
        }
        Ok(())
    }

    /// Existing directories on a read-only mount pass `create_dir_all`, so
    /// each one is also written to once.
    async fn probe_writable(dir: &Path) -> ImageCacheResult<()> {
        let probe = dir.join(format!(".write-probe-{}", Uuid::new_v4().simple()));
        fs::write(&probe, b"")
            .await
            .map_err(|source| ImageCacheError::StorageUnavailable {
                path: dir.to_path_buf(),
                source,
            })?;
        if let Err(e) = fs::remove_file(&probe).await {
            debug!("Failed to remove write probe {}: {}", probe.display(), e);
        }
        Ok(())
    }

    pub fn layout(&self) -> &CacheLayout {
        &self.layout
    }

    pub fn is_passthrough(&self) -> bool {
        self.passthrough
    }
}
