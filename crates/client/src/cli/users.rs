//! User CLI commands.

use clap::{Parser, Subcommand};
use propdesk_core::domain::{UserRole, UserStatus};
use uuid::Uuid;

use super::PageArgs;

/// User management commands.
#[derive(Debug, Parser)]
pub struct UsersCommand {
    #[command(subcommand)]
    pub action: UsersAction,
}

/// Available user actions.
#[derive(Debug, Subcommand)]
pub enum UsersAction {
    /// List users.
    List {
        #[arg(long)]
        role: Option<UserRole>,
        #[arg(long)]
        status: Option<UserStatus>,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Create a new user.
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        role: Option<UserRole>,
    },
    /// Get user by ID.
    Get { id: Uuid },
    /// Update a user.
    Update {
        id: Uuid,
        #[arg(long)]
        version: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        role: Option<UserRole>,
        #[arg(long)]
        status: Option<UserStatus>,
    },
    /// Archive a user.
    Archive {
        id: Uuid,
        #[arg(long)]
        version: Option<i64>,
    },
}
