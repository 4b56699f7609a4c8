//! SQLite storage backend implementation.
//!
//! This module provides a SQLite-based implementation of the repository traits
//! using `rusqlite` for synchronous operations and `tokio-rusqlite` for async
//! wrapping. Occupancy readings carry a month partition column and the hourly
//! rollup is served by the `occupancy_hourly` view.

mod conversions;
mod error;
mod repository;
mod schema;

pub use repository::SqliteRepository;
