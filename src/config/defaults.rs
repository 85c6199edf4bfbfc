//! Configuration default values
//!
//! Every default for the configuration lives here so it can be changed in one place.

// Database defaults
pub const DEFAULT_DATABASE_URL: &str = "sqlite://./data/yt-archive.db";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

// Web server defaults
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

// Image cache defaults
pub const DEFAULT_CACHE_ROOT: &str = "./data/cache";
pub const DEFAULT_CHANNEL_SUBDIR: &str = "images/channels";
pub const DEFAULT_VIDEO_SUBDIR: &str = "images/videos";
pub const DEFAULT_ON_DEMAND_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_BACKGROUND_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 8;
pub const DEFAULT_MIN_IMAGE_BYTES: u64 = 100;
pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024; // 10MB
pub const DEFAULT_VIDEO_THUMBNAIL_BASE_URL: &str = "https://i.ytimg.com/vi";

// Environment
pub const ENV_PREFIX: &str = "YTPROXY_";
