//! Disk-backed caching proxy for channel avatars and video thumbnails
//!
//! Upstream images are fetched once, validated, and written atomically to a
//! local directory tree; every later request is served from disk, even after
//! the upstream entity disappears. The service never fails a request for an
//! upstream or storage problem, it degrades to an SVG placeholder instead.
//!
//! - **Keys**: deterministic paths, sharded by the first two characters for videos
//! - **Negative markers**: zero-byte `.missing` siblings for permanent 404/410 misses
//! - **Bounded fetching**: a counting semaphore caps simultaneous upstream requests
//! - **Passthrough**: if the cache directories cannot be prepared at startup,
//!   every request is answered with a placeholder without touching disk or network

pub mod content_type;
pub mod directory;
pub mod fetcher;
pub mod invalidator;
pub mod key;
pub mod placeholder;
pub mod probe;
pub mod response;
pub mod service;

pub use content_type::ContentTypeSniffer;
pub use directory::{CacheLayout, CachePaths, DirectoryManager};
pub use fetcher::{ContentFetcher, FetchFailure, FetchOutcome};
pub use invalidator::CacheInvalidator;
pub use key::{CacheKey, ImageKind, VideoQuality};
pub use placeholder::PlaceholderGenerator;
pub use probe::{CacheState, CacheStateProbe};
pub use response::{CacheStatus, ImageResponse};
pub use service::{FetchPolicy, ImageCacheService};
