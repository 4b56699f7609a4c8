//! propdesk_client - HTTP client and CLI for the propdesk API.

pub mod cli;
pub mod client;
pub mod error;
pub mod output;
pub mod stream;

pub use client::PropdeskClient;
pub use error::{ClientError, Result};
pub use stream::{watch_occupancy, OccupancySnapshot, StreamOptions, StreamUpdate};
