//! Cache backend implementations.
//!
//! Concrete implementations of the cache traits defined in
//! `propdesk_core::cache`, selected at compile time via feature flags.
//!
//! # Feature Flags
//!
//! - `memory` (default): in-process LRU cache and broadcast pub/sub
//! - `redis`: Redis cache and pub/sub, shared across instances
//!
//! These features are mutually exclusive.

#[cfg(all(feature = "memory", feature = "redis"))]
compile_error!(
    "Features 'memory' and 'redis' are mutually exclusive. \
    Enable only one cache backend at a time."
);

#[cfg(not(any(feature = "memory", feature = "redis")))]
compile_error!(
    "No cache backend selected. Enable 'memory' or 'redis' feature. \
    Example: cargo build -p propdesk --features memory"
);

#[cfg(feature = "memory")]
pub mod memory;

#[cfg(feature = "redis")]
pub mod redis_impl;

#[cfg(feature = "memory")]
pub use memory::{MemoryCache, MemoryPubSub};

#[cfg(feature = "redis")]
pub use redis_impl::{RedisCache, RedisPubSub};
