//! Business logic services

pub mod cache_warmer;
pub mod channel;

pub use cache_warmer::{WarmReport, warm_all_channels};
pub use channel::{ChannelService, ThumbnailUpdate, ThumbnailUrlChange};
