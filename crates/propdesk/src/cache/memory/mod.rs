//! In-memory cache backend.
//!
//! Thread-safe LRU cache with TTL support and broadcast pub/sub for
//! single-instance deployments.

mod cache;
mod pubsub;

pub use cache::MemoryCache;
pub use pubsub::MemoryPubSub;
