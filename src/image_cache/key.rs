//! Cache keys: deterministic relative paths for cached images

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::errors::{ImageCacheError, ImageCacheResult};

/// Longest identifier accepted as a cache key component
const MAX_IDENTIFIER_LEN: usize = 64;

/// Length of the directory shard prefix for video thumbnails
const VIDEO_SHARD_LEN: usize = 2;

/// File extension of cached images, regardless of the actual format
const ENTRY_EXTENSION: &str = "jpg";

/// Extension of negative markers
pub const MARKER_EXTENSION: &str = "missing";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ImageKind {
    Channel,
    Video,
}

/// Thumbnail variants published for every video
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum VideoQuality {
    /// 120x90
    Default,
    /// 320x180
    Mqdefault,
    /// 480x360
    Hqdefault,
    /// 640x480
    Sddefault,
    /// 1280x720, not generated for every upload
    Maxresdefault,
}

/// Deterministic identifier of a cached image
///
/// Channels map to `{channel_id}.jpg`; videos to
/// `{video_id[0:2]}/{video_id}_{quality}.jpg`. The path is relative to the
/// kind's cache directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    kind: ImageKind,
    relative_path: PathBuf,
}

impl CacheKey {
    pub fn channel(channel_id: &str) -> ImageCacheResult<Self> {
        validate_identifier(ImageKind::Channel, channel_id, 1)?;
        Ok(Self {
            kind: ImageKind::Channel,
            relative_path: PathBuf::from(format!("{channel_id}.{ENTRY_EXTENSION}")),
        })
    }

    pub fn video(video_id: &str, quality: VideoQuality) -> ImageCacheResult<Self> {
        validate_identifier(ImageKind::Video, video_id, VIDEO_SHARD_LEN)?;
        // Identifiers are ASCII-only after validation, so byte slicing is safe
        let shard = &video_id[..VIDEO_SHARD_LEN];
        Ok(Self {
            kind: ImageKind::Video,
            relative_path: Path::new(shard)
                .join(format!("{video_id}_{quality}.{ENTRY_EXTENSION}")),
        })
    }

    pub fn kind(&self) -> ImageKind {
        self.kind
    }

    /// Path of the cache entry relative to the kind's directory
    pub fn relative_path(&self) -> &Path {
        &self.relative_path
    }

    /// Path of the negative marker relative to the kind's directory
    pub fn marker_relative_path(&self) -> PathBuf {
        self.relative_path.with_extension(MARKER_EXTENSION)
    }
}

/// Check an identifier can be used as a path component without escaping the
/// cache root: `[A-Za-z0-9_-]`, between `min_len` and 64 characters.
pub fn validate_identifier(kind: ImageKind, id: &str, min_len: usize) -> ImageCacheResult<()> {
    let valid = id.len() >= min_len
        && id.len() <= MAX_IDENTIFIER_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');

    if valid {
        Ok(())
    } else {
        Err(ImageCacheError::InvalidIdentifier {
            kind: match kind {
                ImageKind::Channel => "channel",
                ImageKind::Video => "video",
            },
            id: id.to_string(),
        })
    }
}
