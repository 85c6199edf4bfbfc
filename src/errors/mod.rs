//! Centralized error handling for the image proxy
//!
//! The image cache itself never surfaces errors to its callers; every failure
//! there degrades to a placeholder response. The types in this module cover
//! the internal failure classes of the cache and the collaborators around it.
//!
//! # Error Categories
//!
//! - **Image cache errors**: storage availability, identifier validation, disk I/O
//! - **Repository errors**: channel entity store access
//! - **Application errors**: configuration, validation and web-layer failures
//!
//! # Usage
//!
//! ```rust
//! use yt_image_proxy::errors::{AppError, AppResult};
//!
//! fn example_function() -> AppResult<String> {
//!     Ok("success".to_string())
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for Repository Results
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Convenience type alias for image cache internals
pub type ImageCacheResult<T> = Result<T, ImageCacheError>;
