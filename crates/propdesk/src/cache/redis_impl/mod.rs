//! Redis cache backend.
//!
//! Distributed cache for multi-instance deployments: TTL via `SET EX`,
//! tracking sets for scoped pattern deletion, and pub/sub for live events.

mod cache;
mod error;
mod pubsub;

pub use cache::RedisCache;
pub use pubsub::RedisPubSub;
