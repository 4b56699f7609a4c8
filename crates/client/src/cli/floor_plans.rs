//! Floor plan CLI commands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use propdesk_core::domain::FloorPlanStatus;
use uuid::Uuid;

use super::PageArgs;

/// Floor plan management commands.
#[derive(Debug, Parser)]
pub struct FloorPlansCommand {
    #[command(subcommand)]
    pub action: FloorPlansAction,
}

/// Available floor plan actions.
#[derive(Debug, Subcommand)]
pub enum FloorPlansAction {
    /// List floor plans of a property.
    List {
        #[arg(long)]
        property_id: Uuid,
        #[arg(long)]
        status: Option<FloorPlanStatus>,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Create a floor plan.
    Create {
        #[arg(long)]
        property_id: Uuid,
        #[arg(long)]
        name: String,
        #[arg(long, allow_negative_numbers = true)]
        floor_number: i32,
        /// Width in meters.
        #[arg(long)]
        width_m: f64,
        /// Length in meters.
        #[arg(long)]
        length_m: f64,
        #[arg(long)]
        capacity: Option<i64>,
    },
    /// Create floor plans from a JSON array file, all or nothing.
    Bulk { file: PathBuf },
    /// Get floor plan by ID.
    Get { id: Uuid },
    /// Update a floor plan.
    Update {
        id: Uuid,
        /// Version last read; sent as If-Match.
        #[arg(long)]
        version: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, allow_negative_numbers = true)]
        floor_number: Option<i32>,
        #[arg(long)]
        width_m: Option<f64>,
        #[arg(long)]
        length_m: Option<f64>,
        #[arg(long, conflicts_with = "clear_capacity")]
        capacity: Option<i64>,
        /// Remove the stored capacity.
        #[arg(long)]
        clear_capacity: bool,
        #[arg(long)]
        status: Option<FloorPlanStatus>,
    },
    /// Archive a floor plan.
    Archive {
        id: Uuid,
        #[arg(long)]
        version: Option<i64>,
    },
}
