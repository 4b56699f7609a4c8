//! In-memory storage backend.
//!
//! Stores every table in a `HashMap` behind `Arc<RwLock<_>>`. Useful for tests
//! and development where persistence is not required.
//!
//! # Example
//!
//! ```rust,ignore
//! use propdesk::storage::inmemory::InMemoryRepository;
//!
//! let repo = InMemoryRepository::new();
//! ```

mod repository;

pub use repository::InMemoryRepository;
