//! The value the service hands back for every image request

use bytes::Bytes;
use strum::{AsRefStr, Display, IntoStaticStr};

/// `Cache-Control` for real images; cached content never changes in place
pub const IMMUTABLE_CACHE_CONTROL: &str = "public, max-age=604800, immutable";

/// `Cache-Control` for placeholders, short so a later fetch can replace them
pub const PLACEHOLDER_CACHE_CONTROL: &str = "public, max-age=3600";

/// Value of the `X-Cache` response header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, IntoStaticStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum CacheStatus {
    /// Served from a valid file already on disk
    Hit,
    /// Fetched from upstream during this request
    Miss,
    /// No image available, an SVG placeholder was served
    Placeholder,
}

#[derive(Debug, Clone)]
pub struct ImageResponse {
    pub body: Bytes,
    pub media_type: &'static str,
    pub cache_status: CacheStatus,
}

impl ImageResponse {
    pub fn new(body: Bytes, media_type: &'static str, cache_status: CacheStatus) -> Self {
        Self {
            body,
            media_type,
            cache_status,
        }
    }

    pub fn cache_control(&self) -> &'static str {
        match self.cache_status {
            CacheStatus::Hit | CacheStatus::Miss => IMMUTABLE_CACHE_CONTROL,
            CacheStatus::Placeholder => PLACEHOLDER_CACHE_CONTROL,
        }
    }

    /// Value of the `X-Cache` header
    pub fn x_cache(&self) -> &'static str {
        self.cache_status.into()
    }

    pub fn is_placeholder(&self) -> bool {
        self.cache_status == CacheStatus::Placeholder
    }
}
