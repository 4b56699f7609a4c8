//! CLI command definitions.

pub mod floor_plans;
pub mod health;
pub mod leases;
pub mod occupancy;
pub mod properties;
pub mod users;

use clap::{Parser, Subcommand, ValueEnum};
use uuid::Uuid;

/// CLI client for the propdesk API.
#[derive(Debug, Parser)]
#[command(name = "propdesk-client")]
#[command(about = "CLI client for the propdesk API", long_about = None)]
pub struct Cli {
    /// Server base URL.
    #[arg(long, env = "PROPDESK_URL", default_value = "http://localhost:3000")]
    pub base_url: String,

    /// Acting user recorded in audit fields (sent as x-user-id).
    #[arg(long, env = "PROPDESK_USER_ID")]
    pub user_id: Option<Uuid>,

    /// Output format.
    #[arg(long, default_value = "pretty")]
    pub format: OutputFormat,

    /// Suppress non-essential output.
    #[arg(long)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Raw JSON output.
    Json,
    /// Human-readable output.
    #[default]
    Pretty,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Property management.
    Properties(properties::PropertiesCommand),
    /// Floor plan management.
    FloorPlans(floor_plans::FloorPlansCommand),
    /// Lease management.
    Leases(leases::LeasesCommand),
    /// User management.
    Users(users::UsersCommand),
    /// Occupancy readings and live updates.
    Occupancy(occupancy::OccupancyCommand),
    /// Server health checks.
    Health(health::HealthCommand),
}

/// Pagination flags shared by list commands.
#[derive(Debug, Clone, clap::Args)]
pub struct PageArgs {
    /// Include archived records.
    #[arg(long)]
    pub include_archived: bool,
    /// Page size (server default 50, max 200).
    #[arg(long)]
    pub limit: Option<u32>,
    /// Records to skip.
    #[arg(long)]
    pub offset: Option<u32>,
}
