use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

pub mod defaults;
pub mod duration_serde;

use defaults::*;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub image_cache: ImageCacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    pub max_connections: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Image cache configuration
///
/// The on-disk layout is `{cache_root}/{channel_subdir}/{channel_id}.jpg` and
/// `{cache_root}/{video_subdir}/{shard}/{video_id}_{quality}.jpg`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageCacheConfig {
    #[serde(default = "default_cache_root")]
    pub cache_root: PathBuf,
    #[serde(default = "default_channel_subdir")]
    pub channel_subdir: PathBuf,
    #[serde(default = "default_video_subdir")]
    pub video_subdir: PathBuf,

    /// Timeout for fetches made while a client is waiting on the response
    #[serde(
        default = "default_on_demand_timeout",
        with = "duration_serde::duration"
    )]
    pub on_demand_timeout: Duration,
    /// Timeout for cache-warm fetches nobody is waiting on
    #[serde(
        default = "default_background_timeout",
        with = "duration_serde::duration"
    )]
    pub background_timeout: Duration,

    /// Upper bound on simultaneous outbound fetches
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    #[serde(default = "default_min_image_bytes")]
    pub min_image_bytes: u64,
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: u64,

    #[serde(default = "default_video_thumbnail_base_url")]
    pub video_thumbnail_base_url: String,

    pub user_agent: Option<String>,
}

// Database defaults
fn default_database_url() -> String {
    DEFAULT_DATABASE_URL.to_string()
}

// Web defaults
fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

// Image cache defaults
fn default_cache_root() -> PathBuf {
    PathBuf::from(DEFAULT_CACHE_ROOT)
}

fn default_channel_subdir() -> PathBuf {
    PathBuf::from(DEFAULT_CHANNEL_SUBDIR)
}

fn default_video_subdir() -> PathBuf {
    PathBuf::from(DEFAULT_VIDEO_SUBDIR)
}

fn default_on_demand_timeout() -> Duration {
    Duration::from_secs(DEFAULT_ON_DEMAND_TIMEOUT_SECS)
}

fn default_background_timeout() -> Duration {
    Duration::from_secs(DEFAULT_BACKGROUND_TIMEOUT_SECS)
}

fn default_max_concurrent_fetches() -> usize {
    DEFAULT_MAX_CONCURRENT_FETCHES
}

fn default_min_image_bytes() -> u64 {
    DEFAULT_MIN_IMAGE_BYTES
}

fn default_max_image_bytes() -> u64 {
    DEFAULT_MAX_IMAGE_BYTES
}

fn default_video_thumbnail_base_url() -> String {
    DEFAULT_VIDEO_THUMBNAIL_BASE_URL.to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: Some(DEFAULT_MAX_CONNECTIONS),
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for ImageCacheConfig {
    fn default() -> Self {
        Self {
            cache_root: default_cache_root(),
            channel_subdir: default_channel_subdir(),
            video_subdir: default_video_subdir(),
            on_demand_timeout: default_on_demand_timeout(),
            background_timeout: default_background_timeout(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            min_image_bytes: default_min_image_bytes(),
            max_image_bytes: default_max_image_bytes(),
            video_thumbnail_base_url: default_video_thumbnail_base_url(),
            user_agent: None,
        }
    }
}

impl ImageCacheConfig {
    /// Default configuration rooted at `cache_root`
    pub fn with_cache_root(cache_root: impl Into<PathBuf>) -> Self {
        Self {
            cache_root: cache_root.into(),
            ..Self::default()
        }
    }

    pub fn channel_dir(&self) -> PathBuf {
        self.cache_root.join(&self.channel_subdir)
    }

    pub fn video_dir(&self) -> PathBuf {
        self.cache_root.join(&self.video_subdir)
    }

    /// User agent sent upstream, defaulting to `name/version`
    pub fn user_agent(&self) -> String {
        self.user_agent.clone().unwrap_or_else(|| {
            format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
        })
    }

    /// Check the size bounds and concurrency limit are usable
    pub fn validate(&self) -> Result<(), String> {
        if self.min_image_bytes == 0 {
            return Err("min_image_bytes must be greater than zero".to_string());
        }
        if self.min_image_bytes > self.max_image_bytes {
            return Err(format!(
                "min_image_bytes ({}) exceeds max_image_bytes ({})",
                self.min_image_bytes, self.max_image_bytes
            ));
        }
        if self.max_concurrent_fetches == 0 {
            return Err("max_concurrent_fetches must be at least 1".to_string());
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration layered as defaults, then the TOML file, then
    /// `YTPROXY_`-prefixed environment variables (`__` separates sections).
    ///
    /// A missing file is created from the defaults.
    pub fn load_from_file(config_file: &str) -> Result<Self> {
        let path = Path::new(config_file);
        if !path.exists() {
            match toml::to_string_pretty(&Self::default()) {
                Ok(contents) => match std::fs::write(path, contents) {
                    Ok(()) => info!("Created default config file: {}", config_file),
                    Err(e) => warn!("Could not write default config file {}: {}", config_file, e),
                },
                Err(e) => warn!("Could not render default config: {}", e),
            }
        }

        let config: Self = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("Failed to load configuration from {config_file}"))?;

        config
            .image_cache
            .validate()
            .map_err(|message| anyhow::anyhow!("Invalid image_cache configuration: {message}"))?;

        Ok(config)
    }
}
