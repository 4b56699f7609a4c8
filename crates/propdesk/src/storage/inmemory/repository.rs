//! In-memory repository implementation.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use propdesk_core::domain::{
    hour_bucket, rollup_hourly, FloorPlan, HourlyOccupancy, Lease, OccupancyReading, Property,
    ReadingStatus, Record, User,
};
use propdesk_core::storage::{
    FloorPlanFilter, FloorPlanRepository, HealthCheck, LeaseFilter, LeaseRepository,
    OccupancyRepository, Paginated, PropertyFilter, PropertyRepository, PurgeOutcome,
    RepositoryError, Result, TimeRange, UserFilter, UserRepository,
};

type Table<T> = Arc<RwLock<HashMap<Uuid, T>>>;

/// In-memory storage backend for testing.
///
/// Uses HashMaps wrapped in `Arc<RwLock<_>>`. Holding one write guard for the
/// whole check-then-write sequence makes it the transaction boundary.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    properties: Table<Property>,
    floor_plans: Table<FloorPlan>,
    leases: Table<Lease>,
    users: Table<User>,
    readings: Table<OccupancyReading>,
}

impl InMemoryRepository {
    /// Creates a new empty in-memory repository.
    pub fn new() -> Self {
        Self::default()
    }
}

fn insert_new<T: Record + Clone>(table: &mut HashMap<Uuid, T>, record: &T) -> Result<()> {
    if table.contains_key(&record.id()) {
        return Err(RepositoryError::AlreadyExists {
            entity_type: T::ENTITY,
            id: record.id().to_string(),
        });
    }
    table.insert(record.id(), record.clone());
    Ok(())
}

/// Replaces the stored record when it is live and at `expected_version`.
fn replace_versioned<T: Record + Clone>(
    table: &mut HashMap<Uuid, T>,
    record: &T,
    expected_version: i64,
) -> Result<()> {
    let stored = table
        .get(&record.id())
        .ok_or_else(|| RepositoryError::not_found(T::ENTITY, record.id()))?;
    if stored.is_archived() {
        return Err(RepositoryError::archived(T::ENTITY, record.id()));
    }
    if stored.version() != expected_version {
        return Err(RepositoryError::version_conflict(
            T::ENTITY,
            record.id(),
            expected_version,
            stored.version(),
        ));
    }
    table.insert(record.id(), record.clone());
    Ok(())
}

fn archive_versioned<T: Record + Clone>(
    table: &mut HashMap<Uuid, T>,
    id: Uuid,
    actor: Option<Uuid>,
    at: DateTime<Utc>,
    expected_version: Option<i64>,
) -> Result<T> {
    let stored = table
        .get_mut(&id)
        .ok_or_else(|| RepositoryError::not_found(T::ENTITY, id))?;
    if stored.is_archived() {
        return Ok(stored.clone());
    }
    if let Some(expected) = expected_version {
        if stored.version() != expected {
            return Err(RepositoryError::version_conflict(
                T::ENTITY,
                id,
                expected,
                stored.version(),
            ));
        }
    }
    stored.mark_archived(actor, at);
    Ok(stored.clone())
}

#[async_trait]
impl PropertyRepository for InMemoryRepository {
    async fn get_property(&self, id: Uuid) -> Result<Option<Property>> {
        Ok(self.properties.read().await.get(&id).cloned())
    }

    async fn list_properties(&self, filter: &PropertyFilter) -> Result<Paginated<Property>> {
        let properties = self.properties.read().await;
        let mut matching: Vec<Property> = properties
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(filter.page.apply(matching))
    }

    async fn create_property(&self, property: &Property) -> Result<()> {
        insert_new(&mut *self.properties.write().await, property)
    }

    async fn update_property(&self, property: &Property, expected_version: i64) -> Result<()> {
        replace_versioned(
            &mut *self.properties.write().await,
            property,
            expected_version,
        )
    }

    async fn archive_property(
        &self,
        id: Uuid,
        actor: Option<Uuid>,
        at: DateTime<Utc>,
        expected_version: Option<i64>,
    ) -> Result<Property> {
        archive_versioned(
            &mut *self.properties.write().await,
            id,
            actor,
            at,
            expected_version,
        )
    }
}

#[async_trait]
impl FloorPlanRepository for InMemoryRepository {
    async fn get_floor_plan(&self, id: Uuid) -> Result<Option<FloorPlan>> {
        Ok(self.floor_plans.read().await.get(&id).cloned())
    }

    async fn list_floor_plans(&self, filter: &FloorPlanFilter) -> Result<Paginated<FloorPlan>> {
        let plans = self.floor_plans.read().await;
        let mut matching: Vec<FloorPlan> = plans
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            a.floor_number
                .cmp(&b.floor_number)
                .then_with(|| a.name.cmp(&b.name))
                .then(a.id.cmp(&b.id))
        });
        Ok(filter.page.apply(matching))
    }

    async fn create_floor_plan(&self, plan: &FloorPlan) -> Result<()> {
        insert_new(&mut *self.floor_plans.write().await, plan)
    }

    async fn create_floor_plans(&self, plans: &[FloorPlan]) -> Result<()> {
        let mut table = self.floor_plans.write().await;

        // Check everything before inserting anything.
        let mut seen = BTreeSet::new();
        for plan in plans {
            if table.contains_key(&plan.id) || !seen.insert(plan.id) {
                return Err(RepositoryError::AlreadyExists {
                    entity_type: FloorPlan::ENTITY,
                    id: plan.id.to_string(),
                });
            }
        }
        for plan in plans {
            table.insert(plan.id, plan.clone());
        }
        Ok(())
    }

    async fn update_floor_plan(&self, plan: &FloorPlan, expected_version: i64) -> Result<()> {
        replace_versioned(&mut *self.floor_plans.write().await, plan, expected_version)
    }

    async fn archive_floor_plan(
        &self,
        id: Uuid,
        actor: Option<Uuid>,
        at: DateTime<Utc>,
        expected_version: Option<i64>,
    ) -> Result<FloorPlan> {
        archive_versioned(
            &mut *self.floor_plans.write().await,
            id,
            actor,
            at,
            expected_version,
        )
    }
}

#[async_trait]
impl LeaseRepository for InMemoryRepository {
    async fn get_lease(&self, id: Uuid) -> Result<Option<Lease>> {
        Ok(self.leases.read().await.get(&id).cloned())
    }

    async fn list_leases(&self, filter: &LeaseFilter) -> Result<Paginated<Lease>> {
        let leases = self.leases.read().await;
        let mut matching: Vec<Lease> = leases
            .values()
            .filter(|l| filter.matches(l))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.start_date.cmp(&b.start_date).then(a.id.cmp(&b.id)));
        Ok(filter.page.apply(matching))
    }

    async fn create_lease(&self, lease: &Lease) -> Result<()> {
        insert_new(&mut *self.leases.write().await, lease)
    }

    async fn update_lease(&self, lease: &Lease, expected_version: i64) -> Result<()> {
        replace_versioned(&mut *self.leases.write().await, lease, expected_version)
    }

    async fn archive_lease(
        &self,
        id: Uuid,
        actor: Option<Uuid>,
        at: DateTime<Utc>,
        expected_version: Option<i64>,
    ) -> Result<Lease> {
        archive_versioned(
            &mut *self.leases.write().await,
            id,
            actor,
            at,
            expected_version,
        )
    }
}

fn email_taken(users: &HashMap<Uuid, User>, user: &User) -> bool {
    users
        .values()
        .any(|other| other.id != user.id && other.email == user.email)
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|user| user.email == email).cloned())
    }

    async fn list_users(&self, filter: &UserFilter) -> Result<Paginated<User>> {
        let users = self.users.read().await;
        let mut matching: Vec<User> = users
            .values()
            .filter(|u| filter.matches(u))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(filter.page.apply(matching))
    }

    async fn create_user(&self, user: &User) -> Result<()> {
        let mut users = self.users.write().await;
        if email_taken(&users, user) {
            return Err(RepositoryError::AlreadyExists {
                entity_type: User::ENTITY,
                id: user.email.clone(),
            });
        }
        insert_new(&mut *users, user)
    }

    async fn update_user(&self, user: &User, expected_version: i64) -> Result<()> {
        let mut users = self.users.write().await;
        if email_taken(&users, user) {
            return Err(RepositoryError::AlreadyExists {
                entity_type: User::ENTITY,
                id: user.email.clone(),
            });
        }
        replace_versioned(&mut *users, user, expected_version)
    }

    async fn archive_user(
        &self,
        id: Uuid,
        actor: Option<Uuid>,
        at: DateTime<Utc>,
        expected_version: Option<i64>,
    ) -> Result<User> {
        archive_versioned(
            &mut *self.users.write().await,
            id,
            actor,
            at,
            expected_version,
        )
    }
}

impl InMemoryRepository {
    async fn readings_in(
        &self,
        property_id: Uuid,
        range: TimeRange,
        include_invalidated: bool,
    ) -> Vec<OccupancyReading> {
        let readings = self.readings.read().await;
        let mut matching: Vec<OccupancyReading> = readings
            .values()
            .filter(|r| r.property_id == property_id && range.contains(r.recorded_at))
            .filter(|r| include_invalidated || r.is_counted())
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.recorded_at.cmp(&b.recorded_at).then(a.id.cmp(&b.id)));
        matching
    }
}

#[async_trait]
impl OccupancyRepository for InMemoryRepository {
    async fn get_reading(&self, id: Uuid) -> Result<Option<OccupancyReading>> {
        Ok(self.readings.read().await.get(&id).cloned())
    }

    async fn record_readings(&self, batch: &[OccupancyReading]) -> Result<()> {
        let mut readings = self.readings.write().await;

        let mut seen = BTreeSet::new();
        for reading in batch {
            if readings.contains_key(&reading.id) || !seen.insert(reading.id) {
                return Err(RepositoryError::AlreadyExists {
                    entity_type: "OccupancyReading",
                    id: reading.id.to_string(),
                });
            }
        }
        for reading in batch {
            readings.insert(reading.id, reading.clone());
        }
        Ok(())
    }

    async fn list_readings(
        &self,
        property_id: Uuid,
        range: TimeRange,
        include_invalidated: bool,
    ) -> Result<Vec<OccupancyReading>> {
        Ok(self
            .readings_in(property_id, range, include_invalidated)
            .await)
    }

    async fn latest_reading(&self, property_id: Uuid) -> Result<Option<OccupancyReading>> {
        let readings = self.readings.read().await;
        Ok(readings
            .values()
            .filter(|r| r.property_id == property_id && r.is_counted())
            .max_by(|a, b| a.recorded_at.cmp(&b.recorded_at).then(a.id.cmp(&b.id)))
            .cloned())
    }

    async fn hourly_rollup(
        &self,
        property_id: Uuid,
        range: TimeRange,
    ) -> Result<Vec<HourlyOccupancy>> {
        let readings = self.readings.read().await;
        let in_range: Vec<OccupancyReading> = readings
            .values()
            .filter(|r| r.property_id == property_id && r.is_counted())
            .filter(|r| range.contains(hour_bucket(r.recorded_at)))
            .cloned()
            .collect();
        Ok(rollup_hourly(&in_range))
    }

    async fn invalidate_reading(&self, id: Uuid) -> Result<OccupancyReading> {
        let mut readings = self.readings.write().await;
        let reading = readings
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::not_found("OccupancyReading", id))?;
        reading.status = ReadingStatus::Invalidated;
        Ok(reading.clone())
    }

    async fn purge_readings_before(&self, cutoff: DateTime<Utc>) -> Result<PurgeOutcome> {
        let mut readings = self.readings.write().await;
        let mut property_ids = BTreeSet::new();
        let before = readings.len();
        readings.retain(|_, r| {
            let keep = r.recorded_at >= cutoff;
            if !keep {
                property_ids.insert(r.property_id);
            }
            keep
        });
        Ok(PurgeOutcome {
            deleted: (before - readings.len()) as u64,
            property_ids: property_ids.into_iter().collect(),
        })
    }
}

#[async_trait]
impl HealthCheck for InMemoryRepository {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
