//! Occupancy CLI commands.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use uuid::Uuid;

/// Occupancy commands.
#[derive(Debug, Parser)]
pub struct OccupancyCommand {
    #[command(subcommand)]
    pub action: OccupancyAction,
}

/// Available occupancy actions.
#[derive(Debug, Subcommand)]
pub enum OccupancyAction {
    /// Record a single reading.
    Record {
        #[arg(long)]
        property_id: Uuid,
        #[arg(long)]
        count: i64,
        #[arg(long)]
        floor_plan_id: Option<Uuid>,
        #[arg(long)]
        capacity: Option<i64>,
        /// Sample time (RFC 3339); defaults to now on the server.
        #[arg(long)]
        recorded_at: Option<DateTime<Utc>>,
    },
    /// Ingest a JSON array of readings from a file.
    Ingest { file: PathBuf },
    /// List readings inside a window (default: last 24 hours).
    List {
        #[arg(long)]
        property_id: Uuid,
        #[arg(long)]
        from: Option<DateTime<Utc>>,
        #[arg(long)]
        to: Option<DateTime<Utc>>,
        #[arg(long)]
        include_invalidated: bool,
    },
    /// Most recent counted reading.
    Latest {
        #[arg(long)]
        property_id: Uuid,
    },
    /// Hourly aggregates inside a window.
    Rollup {
        #[arg(long)]
        property_id: Uuid,
        #[arg(long)]
        from: Option<DateTime<Utc>>,
        #[arg(long)]
        to: Option<DateTime<Utc>>,
    },
    /// Get reading by ID.
    Get { id: Uuid },
    /// Mark a reading invalid.
    Invalidate { id: Uuid },
    /// Purge readings past retention.
    Purge {
        /// Override the server's retention window.
        #[arg(long)]
        retention_days: Option<u32>,
    },
    /// Watch live occupancy, reconnecting on failure.
    Watch {
        property_id: Uuid,
        /// Resume from event ID.
        #[arg(long)]
        last_event_id: Option<u64>,
    },
}
