pub mod error;
pub mod floor_plans;
pub mod health;
pub mod leases;
pub mod occupancy;
pub mod properties;
pub mod response;
pub mod users;

pub use error::AppError;
