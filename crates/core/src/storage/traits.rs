use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{FloorPlan, HourlyOccupancy, Lease, OccupancyReading, Property, User};

use super::{
    FloorPlanFilter, LeaseFilter, Paginated, PropertyFilter, Result, TimeRange, UserFilter,
};

// Every `update_*` persists the given record only if the stored version equals
// `expected_version`; the record already carries the bumped version. Every
// `archive_*` runs read, check and write in one transaction and returns the
// record as stored afterwards. Archiving an archived record returns it as is.

/// Repository for property operations.
#[async_trait]
pub trait PropertyRepository: Send + Sync {
    /// Gets a property by its ID.
    async fn get_property(&self, id: Uuid) -> Result<Option<Property>>;

    /// Reads the current row, bypassing any cache layer.
    async fn load_property_for_update(&self, id: Uuid) -> Result<Option<Property>> {
        self.get_property(id).await
    }

    async fn list_properties(&self, filter: &PropertyFilter) -> Result<Paginated<Property>>;

    async fn create_property(&self, property: &Property) -> Result<()>;

    async fn update_property(&self, property: &Property, expected_version: i64) -> Result<()>;

    async fn archive_property(
        &self,
        id: Uuid,
        actor: Option<Uuid>,
        at: DateTime<Utc>,
        expected_version: Option<i64>,
    ) -> Result<Property>;
}

/// Repository for floor plan operations.
#[async_trait]
pub trait FloorPlanRepository: Send + Sync {
    async fn get_floor_plan(&self, id: Uuid) -> Result<Option<FloorPlan>>;

    /// Reads the current row, bypassing any cache layer.
    async fn load_floor_plan_for_update(&self, id: Uuid) -> Result<Option<FloorPlan>> {
        self.get_floor_plan(id).await
    }

    async fn list_floor_plans(&self, filter: &FloorPlanFilter) -> Result<Paginated<FloorPlan>>;

    async fn create_floor_plan(&self, plan: &FloorPlan) -> Result<()>;

    /// Inserts every plan in one transaction, or none of them.
    async fn create_floor_plans(&self, plans: &[FloorPlan]) -> Result<()>;

    async fn update_floor_plan(&self, plan: &FloorPlan, expected_version: i64) -> Result<()>;

    async fn archive_floor_plan(
        &self,
        id: Uuid,
        actor: Option<Uuid>,
        at: DateTime<Utc>,
        expected_version: Option<i64>,
    ) -> Result<FloorPlan>;
}

/// Repository for lease operations.
#[async_trait]
pub trait LeaseRepository: Send + Sync {
    async fn get_lease(&self, id: Uuid) -> Result<Option<Lease>>;

    /// Reads the current row, bypassing any cache layer.
    async fn load_lease_for_update(&self, id: Uuid) -> Result<Option<Lease>> {
        self.get_lease(id).await
    }

    async fn list_leases(&self, filter: &LeaseFilter) -> Result<Paginated<Lease>>;

    async fn create_lease(&self, lease: &Lease) -> Result<()>;

    async fn update_lease(&self, lease: &Lease, expected_version: i64) -> Result<()>;

    async fn archive_lease(
        &self,
        id: Uuid,
        actor: Option<Uuid>,
        at: DateTime<Utc>,
        expected_version: Option<i64>,
    ) -> Result<Lease>;
}

/// Repository for user operations.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Gets a user by their ID.
    async fn get_user(&self, id: Uuid) -> Result<Option<User>>;

    /// Reads the current row, bypassing any cache layer.
    async fn load_user_for_update(&self, id: Uuid) -> Result<Option<User>> {
        self.get_user(id).await
    }

    /// Gets a user by their (normalized) email address.
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn list_users(&self, filter: &UserFilter) -> Result<Paginated<User>>;

    /// Creates a new user. Fails with `AlreadyExists` on a duplicate email.
    async fn create_user(&self, user: &User) -> Result<()>;

    async fn update_user(&self, user: &User, expected_version: i64) -> Result<()>;

    async fn archive_user(
        &self,
        id: Uuid,
        actor: Option<Uuid>,
        at: DateTime<Utc>,
        expected_version: Option<i64>,
    ) -> Result<User>;
}

/// Repository for the occupancy time series.
#[async_trait]
pub trait OccupancyRepository: Send + Sync {
    async fn get_reading(&self, id: Uuid) -> Result<Option<OccupancyReading>>;

    /// Inserts every reading in one transaction, or none of them.
    async fn record_readings(&self, readings: &[OccupancyReading]) -> Result<()>;

    /// Readings of a property inside `range`, oldest first.
    async fn list_readings(
        &self,
        property_id: Uuid,
        range: TimeRange,
        include_invalidated: bool,
    ) -> Result<Vec<OccupancyReading>>;

    /// Newest counted reading of a property.
    async fn latest_reading(&self, property_id: Uuid) -> Result<Option<OccupancyReading>>;

    /// Hourly aggregates of counted readings inside `range`.
    async fn hourly_rollup(
        &self,
        property_id: Uuid,
        range: TimeRange,
    ) -> Result<Vec<HourlyOccupancy>>;

    /// Marks a reading invalidated. Invalidating twice is a no-op.
    async fn invalidate_reading(&self, id: Uuid) -> Result<OccupancyReading>;

    /// Deletes readings recorded before `cutoff`, returning how many went
    /// and which properties they belonged to.
    async fn purge_readings_before(&self, cutoff: DateTime<Utc>) -> Result<PurgeOutcome>;
}

/// Result of a retention purge.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PurgeOutcome {
    pub deleted: u64,
    pub property_ids: Vec<Uuid>,
}

/// Storage liveness probe used by readiness checks.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn ping(&self) -> Result<()>;
}
