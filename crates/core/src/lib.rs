//! Functional core of propdesk.
//!
//! Pure domain types and functions with no I/O: entity records and their
//! validation, storage and cache traits, cache key layout, and the HTTP wire
//! types shared with the client.

pub mod cache;
pub mod domain;
pub mod http;
pub mod serde;
pub mod storage;
