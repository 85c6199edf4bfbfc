//! Repository pattern implementation for data access
//!
//! Traits describe what the services need from storage; the SeaORM
//! implementation lives alongside them. Tests substitute in-memory stores.

pub mod channel;
pub mod traits;

pub use channel::ChannelSeaOrmRepository;
pub use traits::*;
