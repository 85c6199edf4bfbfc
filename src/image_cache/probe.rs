//! On-disk state inspection and negative markers

use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};

use super::directory::CachePaths;
use super::key::ImageKind;
use crate::errors::{ImageCacheError, ImageCacheResult};
use crate::observability::ImageCacheMetrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// A file exists and its length is within the valid range
    Hit { len: u64 },
    /// Nothing valid on disk; eligible for a fetch
    Miss,
}

/// Reads cache state from the filesystem on every call
#[derive(Clone)]
pub struct CacheStateProbe {
    min_image_bytes: u64,
    max_image_bytes: u64,
    metrics: ImageCacheMetrics,
}

impl CacheStateProbe {
    pub fn new(min_image_bytes: u64, max_image_bytes: u64, metrics: ImageCacheMetrics) -> Self {
        Self {
            min_image_bytes,
            max_image_bytes,
            metrics,
        }
    }

    /// HIT when the entry exists with a length inside
    /// `[min_image_bytes, max_image_bytes]`. An entry outside that range is
    /// deleted and reported as MISS.
    pub async fn probe(&self, kind: ImageKind, entry: &Path) -> CacheState {
        let metadata = match fs::metadata(entry).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => return CacheState::Miss,
            Err(e) => {
                debug!("Could not stat {}: {}", entry.display(), e);
                return CacheState::Miss;
            }
        };

        if !metadata.is_file() {
            return CacheState::Miss;
        }

        let len = metadata.len();
        if (self.min_image_bytes..=self.max_image_bytes).contains(&len) {
            return CacheState::Hit { len };
        }

        warn!(
            path = %entry.display(),
            len,
            min = self.min_image_bytes,
            max = self.max_image_bytes,
            "Removing cached image outside the valid size range"
        );
        self.metrics.record_self_heal(kind);
        if let Err(e) = fs::remove_file(entry).await
            && e.kind() != ErrorKind::NotFound
        {
            warn!("Failed to remove invalid cache entry {}: {}", entry.display(), e);
        }
        CacheState::Miss
    }

    /// Whether a negative marker records a permanent upstream miss
    pub async fn check_negative(&self, marker: &Path) -> bool {
        fs::try_exists(marker).await.unwrap_or(false)
    }

    /// Record a permanent miss, dropping any entry so the two never coexist
    pub async fn write_negative_marker(&self, paths: &CachePaths) -> ImageCacheResult<()> {
        if let Some(parent) = paths.marker.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ImageCacheError::io(parent, e))?;
        }

        match fs::remove_file(&paths.entry).await {
            Ok(()) => debug!("Removed stale entry {} before marking", paths.entry.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(ImageCacheError::io(&paths.entry, e)),
        }

        fs::write(&paths.marker, b"")
            .await
            .map_err(|e| ImageCacheError::io(&paths.marker, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn probe() -> CacheStateProbe {
        CacheStateProbe::new(100, 1_000, ImageCacheMetrics::global())
    }

    fn paths_in(dir: &Path) -> CachePaths {
        CachePaths {
            entry: dir.join("ab/abc_default.jpg"),
            marker: dir.join("ab/abc_default.missing"),
        }
    }

    #[tokio::test]
    async fn test_valid_entry_is_a_hit() {
        let temp = tempfile::tempdir().unwrap();
        let entry = temp.path().join("UC1.jpg");
        tokio::fs::write(&entry, vec![0xAB; 500]).await.unwrap();

        assert_eq!(probe().probe(ImageKind::Channel, &entry).await, CacheState::Hit { len: 500 });
    }

    #[tokio::test]
    async fn test_missing_entry_is_a_miss() {
        let temp = tempfile::tempdir().unwrap();
        let entry = temp.path().join("UC1.jpg");
        assert_eq!(probe().probe(ImageKind::Channel, &entry).await, CacheState::Miss);
    }

    #[tokio::test]
    async fn test_undersized_entry_is_deleted() {
        let temp = tempfile::tempdir().unwrap();
        let entry = temp.path().join("UC1.jpg");
        tokio::fs::write(&entry, vec![0xAB; 99]).await.unwrap();

        assert_eq!(probe().probe(ImageKind::Channel, &entry).await, CacheState::Miss);
        assert!(!entry.exists());
    }

    #[tokio::test]
    async fn test_oversized_entry_is_deleted() {
        let temp = tempfile::tempdir().unwrap();
        let entry = temp.path().join("UC1.jpg");
        tokio::fs::write(&entry, vec![0xAB; 1_001]).await.unwrap();

        assert_eq!(probe().probe(ImageKind::Channel, &entry).await, CacheState::Miss);
        assert!(!entry.exists());
    }

    #[tokio::test]
    async fn test_directory_at_entry_path_is_left_alone() {
        let temp = tempfile::tempdir().unwrap();
        let entry: PathBuf = temp.path().join("UC1.jpg");
        tokio::fs::create_dir(&entry).await.unwrap();

        assert_eq!(probe().probe(ImageKind::Channel, &entry).await, CacheState::Miss);
        assert!(entry.is_dir());
    }

    #[tokio::test]
    async fn test_marker_round_trip_replaces_entry() {
        let temp = tempfile::tempdir().unwrap();
        let paths = paths_in(temp.path());
        let probe = probe();

        assert!(!probe.check_negative(&paths.marker).await);

        tokio::fs::create_dir_all(paths.entry.parent().unwrap()).await.unwrap();
        tokio::fs::write(&paths.entry, vec![1u8; 200]).await.unwrap();
        probe.write_negative_marker(&paths).await.unwrap();

        assert!(probe.check_negative(&paths.marker).await);
        assert!(!paths.entry.exists());
        assert_eq!(tokio::fs::metadata(&paths.marker).await.unwrap().len(), 0);
    }
}
