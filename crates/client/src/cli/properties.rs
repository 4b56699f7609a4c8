//! Property CLI commands.

use clap::{Parser, Subcommand};
use propdesk_core::domain::PropertyStatus;
use uuid::Uuid;

use super::PageArgs;

/// Property management commands.
#[derive(Debug, Parser)]
pub struct PropertiesCommand {
    #[command(subcommand)]
    pub action: PropertiesAction,
}

/// Available property actions.
#[derive(Debug, Subcommand)]
pub enum PropertiesAction {
    /// List properties.
    List {
        /// Only this status (ACTIVE, INACTIVE, ARCHIVED).
        #[arg(long)]
        status: Option<PropertyStatus>,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Create a new property.
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        address: String,
        /// JSON object.
        #[arg(long)]
        metadata: Option<serde_json::Value>,
    },
    /// Get property by ID.
    Get { id: Uuid },
    /// Update a property.
    Update {
        id: Uuid,
        /// Version last read; sent as If-Match.
        #[arg(long)]
        version: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        status: Option<PropertyStatus>,
        /// JSON merge patch for the metadata.
        #[arg(long)]
        metadata: Option<serde_json::Value>,
    },
    /// Archive a property.
    Archive {
        id: Uuid,
        /// Refuse if the property changed since this version.
        #[arg(long)]
        version: Option<i64>,
    },
}
