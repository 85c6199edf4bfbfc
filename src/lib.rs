//! Disk-backed caching proxy for YouTube channel avatars and video thumbnails
//!
//! Archived pages keep showing their images after the upstream channel or
//! video is gone: each image is fetched once, validated and kept on disk.

pub mod config;
pub mod database;
pub mod entities;
pub mod errors;
pub mod image_cache;
pub mod observability;
pub mod repositories;
pub mod services;
pub mod utils;
pub mod web;
