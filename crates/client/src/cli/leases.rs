//! Lease CLI commands.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use propdesk_core::domain::LeaseStatus;
use uuid::Uuid;

use super::PageArgs;

/// Lease management commands.
#[derive(Debug, Parser)]
pub struct LeasesCommand {
    #[command(subcommand)]
    pub action: LeasesAction,
}

/// Available lease actions.
#[derive(Debug, Subcommand)]
pub enum LeasesAction {
    /// List leases of one property or one tenant.
    List {
        #[arg(long, required_unless_present = "tenant_id", conflicts_with = "tenant_id")]
        property_id: Option<Uuid>,
        #[arg(long)]
        tenant_id: Option<Uuid>,
        #[arg(long)]
        status: Option<LeaseStatus>,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Create a lease.
    Create {
        #[arg(long)]
        property_id: Uuid,
        #[arg(long)]
        tenant_id: Uuid,
        #[arg(long)]
        unit: String,
        /// Start date (YYYY-MM-DD).
        #[arg(long)]
        start_date: NaiveDate,
        /// End date (YYYY-MM-DD).
        #[arg(long)]
        end_date: NaiveDate,
        #[arg(long)]
        monthly_rent_cents: i64,
        #[arg(long, default_value_t = 0)]
        deposit_cents: i64,
        #[arg(long, default_value = "USD")]
        currency: String,
    },
    /// Get lease by ID.
    Get { id: Uuid },
    /// Update a lease.
    Update {
        id: Uuid,
        /// Version last read; sent as If-Match.
        #[arg(long)]
        version: i64,
        #[arg(long)]
        unit: Option<String>,
        #[arg(long)]
        start_date: Option<NaiveDate>,
        #[arg(long)]
        end_date: Option<NaiveDate>,
        #[arg(long)]
        monthly_rent_cents: Option<i64>,
        #[arg(long)]
        deposit_cents: Option<i64>,
        #[arg(long)]
        status: Option<LeaseStatus>,
    },
    /// Archive a lease.
    Archive {
        id: Uuid,
        #[arg(long)]
        version: Option<i64>,
    },
}
