mod error;
mod http_mapping;
mod traits;
mod types;

pub use error::{RepositoryError, Result, TimeRangeError};
pub use http_mapping::{repository_error_code, repository_error_to_status_code};
pub use traits::{
    FloorPlanRepository, HealthCheck, LeaseRepository, OccupancyRepository, PropertyRepository,
    PurgeOutcome, UserRepository,
};
pub use types::{
    FloorPlanFilter, LeaseFilter, LeaseScope, Page, Paginated, PropertyFilter, TimeRange,
    UserFilter, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT,
};
