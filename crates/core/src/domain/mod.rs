mod common;
mod error;
mod events;
mod floor_plan;
mod lease;
mod occupancy;
mod property;
mod user;

pub use common::{
    check_blob, check_name, empty_object, merge_patch, Audit, Record, UnknownVariant,
    MAX_NAME_LEN,
};
pub use error::{FieldError, ValidationErrors};
pub use events::OccupancyEvent;
pub use floor_plan::{
    validate_floor_plan, validate_floor_plan_transition, BulkCreateFloorPlansRequest,
    CreateFloorPlanRequest, FloorPlan, FloorPlanStatus, UpdateFloorPlanRequest, MAX_DIMENSION_M,
    MAX_FLOOR, MIN_FLOOR,
};
pub use lease::{
    validate_lease, validate_lease_transition, CreateLeaseRequest, Lease, LeaseStatus,
    UpdateLeaseRequest,
};
pub use occupancy::{
    hour_bucket, partition_month, retention_cutoff, rollup_hourly, validate_reading,
    HourlyOccupancy, IngestOccupancyRequest, OccupancyReading, ReadingStatus,
    RecordOccupancyRequest, MAX_CLOCK_SKEW_MINUTES,
};
pub use property::{
    validate_property, validate_property_transition, CreatePropertyRequest, Property,
    PropertyStatus, UpdatePropertyRequest,
};
pub use user::{
    is_valid_email, normalize_email, validate_user, CreateUserRequest, UpdateUserRequest, User,
    UserRole, UserStatus,
};
