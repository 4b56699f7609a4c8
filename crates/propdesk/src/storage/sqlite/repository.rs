//! SQLite repository implementation.
//!
//! Implements the repository traits from `propdesk_core::storage` using SQLite.
//! Every check-then-write sequence runs inside one `rusqlite::Transaction`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use tokio_rusqlite::Connection;
use uuid::Uuid;

use propdesk_core::domain::{
    partition_month, FloorPlan, HourlyOccupancy, Lease, OccupancyReading, Property, Record, User,
};
use propdesk_core::storage::{
    FloorPlanFilter, FloorPlanRepository, HealthCheck, LeaseFilter, LeaseRepository, LeaseScope,
    OccupancyRepository, Page, Paginated, PropertyFilter, PropertyRepository, PurgeOutcome,
    RepositoryError, Result, TimeRange, UserFilter, UserRepository,
};

use super::conversions::{
    format_date, format_datetime, format_json, format_uuid, row_to_floor_plan, row_to_hourly,
    row_to_lease, row_to_property, row_to_reading, row_to_user,
};
use super::error::{map_rusqlite_error, map_tokio_rusqlite_error, map_tokio_rusqlite_error_with_id};
use super::schema;

const READING_ENTITY: &str = "OccupancyReading";

/// Helper to wrap rusqlite errors for tokio_rusqlite closures.
fn wrap_err(e: rusqlite::Error) -> tokio_rusqlite::Error {
    tokio_rusqlite::Error::Rusqlite(e)
}

/// Result of the work done inside a connection closure. The outer error is a
/// driver failure, the inner one a domain outcome such as a version conflict.
type Outcome<T> = std::result::Result<T, RepositoryError>;

/// A versioned entity stored in its own table.
trait StoredRecord: Record + Sized + Send + 'static {
    const TABLE: &'static str;
    const SELECT_BY_ID: &'static str;

    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

impl StoredRecord for Property {
    const TABLE: &'static str = "properties";
    const SELECT_BY_ID: &'static str = schema::SELECT_PROPERTY_BY_ID;

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        row_to_property(row)
    }
}

impl StoredRecord for FloorPlan {
    const TABLE: &'static str = "floor_plans";
    const SELECT_BY_ID: &'static str = schema::SELECT_FLOOR_PLAN_BY_ID;

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        row_to_floor_plan(row)
    }
}

impl StoredRecord for Lease {
    const TABLE: &'static str = "leases";
    const SELECT_BY_ID: &'static str = schema::SELECT_LEASE_BY_ID;

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        row_to_lease(row)
    }
}

impl StoredRecord for User {
    const TABLE: &'static str = "users";
    const SELECT_BY_ID: &'static str = schema::SELECT_USER_BY_ID;

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        row_to_user(row)
    }
}

fn fetch<T: StoredRecord>(conn: &rusqlite::Connection, id: &str) -> rusqlite::Result<Option<T>> {
    conn.query_row(T::SELECT_BY_ID, [id], T::from_row).optional()
}

/// Explains why a version guarded write touched no row.
fn write_miss<T: StoredRecord>(
    conn: &rusqlite::Connection,
    id: &str,
    expected_version: i64,
) -> rusqlite::Result<RepositoryError> {
    let current: Option<(i64, String)> = conn
        .query_row(&schema::select_version_and_status(T::TABLE), [id], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .optional()?;

    Ok(match current {
        None => RepositoryError::not_found(T::ENTITY, id),
        Some((_, status)) if status == "ARCHIVED" => RepositoryError::archived(T::ENTITY, id),
        Some((actual, _)) => {
            RepositoryError::version_conflict(T::ENTITY, id, expected_version, actual)
        }
    })
}

/// Status filter values bound to `?1` and `?2` of every listing query.
fn status_params(status: Option<&'static str>, include_archived: bool) -> Vec<Value> {
    vec![
        status.map_or(Value::Null, |s| Value::Text(s.to_string())),
        Value::Integer(i64::from(include_archived)),
    ]
}

fn insert_property(conn: &rusqlite::Connection, p: &Property) -> rusqlite::Result<usize> {
    conn.execute(
        schema::INSERT_PROPERTY,
        params![
            p.id.to_string(),
            p.name,
            p.address,
            p.status.as_str(),
            format_json(&p.metadata),
            format_uuid(p.audit.created_by),
            format_uuid(p.audit.updated_by),
            format_datetime(&p.audit.created_at),
            format_datetime(&p.audit.updated_at),
            p.version,
        ],
    )
}

fn insert_floor_plan(conn: &rusqlite::Connection, p: &FloorPlan) -> rusqlite::Result<usize> {
    conn.execute(
        schema::INSERT_FLOOR_PLAN,
        params![
            p.id.to_string(),
            p.property_id.to_string(),
            p.name,
            p.floor_number,
            p.width_m,
            p.length_m,
            p.area_sqm,
            p.capacity,
            p.status.as_str(),
            format_json(&p.metadata),
            format_uuid(p.audit.created_by),
            format_uuid(p.audit.updated_by),
            format_datetime(&p.audit.created_at),
            format_datetime(&p.audit.updated_at),
            p.version,
        ],
    )
}

fn insert_lease(conn: &rusqlite::Connection, l: &Lease) -> rusqlite::Result<usize> {
    conn.execute(
        schema::INSERT_LEASE,
        params![
            l.id.to_string(),
            l.property_id.to_string(),
            l.tenant_id.to_string(),
            l.unit,
            format_date(&l.start_date),
            format_date(&l.end_date),
            l.monthly_rent_cents,
            l.deposit_cents,
            l.currency,
            l.status.as_str(),
            format_json(&l.terms),
            format_uuid(l.audit.created_by),
            format_uuid(l.audit.updated_by),
            format_datetime(&l.audit.created_at),
            format_datetime(&l.audit.updated_at),
            l.version,
        ],
    )
}

fn insert_user(conn: &rusqlite::Connection, u: &User) -> rusqlite::Result<usize> {
    conn.execute(
        schema::INSERT_USER,
        params![
            u.id.to_string(),
            u.name,
            u.email,
            u.role.as_str(),
            u.status.as_str(),
            format_json(&u.metadata),
            format_uuid(u.audit.created_by),
            format_uuid(u.audit.updated_by),
            format_datetime(&u.audit.created_at),
            format_datetime(&u.audit.updated_at),
            u.version,
        ],
    )
}

fn insert_reading(conn: &rusqlite::Connection, r: &OccupancyReading) -> rusqlite::Result<usize> {
    conn.execute(
        schema::INSERT_READING,
        params![
            r.id.to_string(),
            r.property_id.to_string(),
            format_uuid(r.floor_plan_id),
            format_datetime(&r.recorded_at),
            partition_month(r.recorded_at),
            r.occupant_count,
            r.capacity,
            r.status.as_str(),
            format_json(&r.metadata),
            format_uuid(r.created_by),
            format_datetime(&r.created_at),
        ],
    )
}

/// Another user already holding `user`'s email, if any.
fn email_taken(conn: &rusqlite::Connection, user: &User) -> rusqlite::Result<bool> {
    let holder: Option<User> = conn
        .query_row(schema::SELECT_USER_BY_EMAIL, [&user.email], row_to_user)
        .optional()?;
    Ok(holder.is_some_and(|other| other.id != user.id))
}

fn email_conflict(user: &User) -> RepositoryError {
    RepositoryError::AlreadyExists {
        entity_type: User::ENTITY,
        id: user.email.clone(),
    }
}

/// SQLite-based repository implementation.
///
/// Provides async access to SQLite storage for all entity types.
pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    /// Creates a new repository with a file-based database.
    ///
    /// The database file will be created if it doesn't exist.
    /// Schema tables are created automatically.
    pub async fn new(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .await
            .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;

        Self::init_schema(&conn).await?;

        Ok(Self { conn })
    }

    /// Creates a new repository with an in-memory database.
    ///
    /// Useful for testing - data is lost when the connection is dropped.
    pub async fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;

        Self::init_schema(&conn).await?;

        Ok(Self { conn })
    }

    /// Initialize the database schema.
    async fn init_schema(conn: &Connection) -> Result<()> {
        conn.call(|conn| {
            conn.execute_batch(schema::CREATE_TABLES)
                .map_err(wrap_err)?;
            Ok(())
        })
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))
    }

    async fn get_record<T: StoredRecord>(&self, id: Uuid) -> Result<Option<T>> {
        let id_str = id.to_string();

        self.conn
            .call(move |conn| fetch::<T>(conn, &id_str).map_err(wrap_err))
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, T::ENTITY, id.to_string()))
    }

    /// Inserts all `records` in one transaction.
    async fn insert_all<T, F>(
        &self,
        entity: &'static str,
        records: Vec<T>,
        id_of: fn(&T) -> Uuid,
        insert: F,
    ) -> Result<()>
    where
        T: Send + 'static,
        F: Fn(&rusqlite::Connection, &T) -> rusqlite::Result<usize> + Send + 'static,
    {
        let outcome = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;
                for record in &records {
                    if let Err(e) = insert(&tx, record) {
                        let id = id_of(record).to_string();
                        return Ok(Err(map_rusqlite_error(&e, entity, &id)));
                    }
                }
                tx.commit().map_err(wrap_err)?;
                Ok(Ok(()))
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, entity))?;
        outcome
    }

    /// Runs a version guarded `write`, explaining a miss inside the same
    /// transaction.
    async fn update_record<T, F>(&self, id: Uuid, expected_version: i64, write: F) -> Result<()>
    where
        T: StoredRecord,
        F: FnOnce(&rusqlite::Connection) -> rusqlite::Result<Outcome<usize>> + Send + 'static,
    {
        let id_str = id.to_string();

        let outcome = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;
                let changed = match write(&tx).map_err(wrap_err)? {
                    Ok(changed) => changed,
                    Err(e) => return Ok(Err(e)),
                };
                if changed == 0 {
                    let miss = write_miss::<T>(&tx, &id_str, expected_version).map_err(wrap_err)?;
                    return Ok(Err(miss));
                }
                tx.commit().map_err(wrap_err)?;
                Ok(Ok(()))
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, T::ENTITY, id.to_string()))?;
        outcome
    }

    /// Archives a record in one read-check-write transaction.
    async fn archive_record<T: StoredRecord>(
        &self,
        id: Uuid,
        actor: Option<Uuid>,
        at: DateTime<Utc>,
        expected_version: Option<i64>,
    ) -> Result<T> {
        let id_str = id.to_string();

        let outcome = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;
                let Some(mut record) = fetch::<T>(&tx, &id_str).map_err(wrap_err)? else {
                    return Ok(Err(RepositoryError::not_found(T::ENTITY, &id_str)));
                };
                if record.is_archived() {
                    return Ok(Ok(record));
                }
                let current = record.version();
                if let Some(expected) = expected_version {
                    if current != expected {
                        return Ok(Err(RepositoryError::version_conflict(
                            T::ENTITY, &id_str, expected, current,
                        )));
                    }
                }

                record.mark_archived(actor, at);
                tx.execute(
                    &schema::archive_row(T::TABLE),
                    params![id_str, format_uuid(actor), format_datetime(&at), current],
                )
                .map_err(wrap_err)?;
                tx.commit().map_err(wrap_err)?;
                Ok(Ok(record))
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, T::ENTITY, id.to_string()))?;
        outcome
    }

    /// Runs a count query and a page query sharing the same filter values.
    ///
    /// `scope` is bound after the status values in the count query and after
    /// the page values in the select query.
    async fn list_records<T: StoredRecord>(
        &self,
        count_sql: &'static str,
        select_sql: &'static str,
        status: Option<&'static str>,
        include_archived: bool,
        scope: Option<Value>,
        page: Page,
    ) -> Result<Paginated<T>> {
        let (total, items) = self
            .conn
            .call(move |conn| {
                let mut count_params = status_params(status, include_archived);
                count_params.extend(scope.clone());
                let total: i64 = conn
                    .query_row(count_sql, params_from_iter(count_params), |row| row.get(0))
                    .map_err(wrap_err)?;

                let mut select_params = status_params(status, include_archived);
                select_params.push(Value::Integer(i64::from(page.limit)));
                select_params.push(Value::Integer(i64::from(page.offset)));
                select_params.extend(scope);

                let mut stmt = conn.prepare(select_sql).map_err(wrap_err)?;
                let rows = stmt
                    .query_map(params_from_iter(select_params), T::from_row)
                    .map_err(wrap_err)?;

                let mut items = Vec::new();
                for row_result in rows {
                    items.push(row_result.map_err(wrap_err)?);
                }
                Ok((total, items))
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, T::ENTITY))?;

        Ok(Paginated {
            items,
            total: u64::try_from(total).unwrap_or_default(),
            limit: page.limit,
            offset: page.offset,
        })
    }

    async fn query_readings(
        &self,
        sql: &'static str,
        values: Vec<Value>,
    ) -> Result<Vec<OccupancyReading>> {
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(sql).map_err(wrap_err)?;
                let rows = stmt
                    .query_map(params_from_iter(values), row_to_reading)
                    .map_err(wrap_err)?;

                let mut readings = Vec::new();
                for row_result in rows {
                    readings.push(row_result.map_err(wrap_err)?);
                }
                Ok(readings)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, READING_ENTITY))
    }
}

// ============================================================================
// PropertyRepository implementation
// ============================================================================

#[async_trait]
impl PropertyRepository for SqliteRepository {
    async fn get_property(&self, id: Uuid) -> Result<Option<Property>> {
        self.get_record(id).await
    }

    async fn list_properties(&self, filter: &PropertyFilter) -> Result<Paginated<Property>> {
        self.list_records(
            schema::COUNT_PROPERTIES,
            schema::SELECT_PROPERTIES,
            filter.status.map(|s| s.as_str()),
            filter.include_archived,
            None,
            filter.page,
        )
        .await
    }

    async fn create_property(&self, property: &Property) -> Result<()> {
        let property = property.clone();
        let id = property.id.to_string();

        self.conn
            .call(move |conn| insert_property(conn, &property).map_err(wrap_err))
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, Property::ENTITY, id))?;
        Ok(())
    }

    async fn update_property(&self, property: &Property, expected_version: i64) -> Result<()> {
        let p = property.clone();

        self.update_record::<Property, _>(property.id, expected_version, move |conn| {
            conn.execute(
                schema::UPDATE_PROPERTY,
                params![
                    p.id.to_string(),
                    p.name,
                    p.address,
                    p.status.as_str(),
                    format_json(&p.metadata),
                    format_uuid(p.audit.updated_by),
                    format_datetime(&p.audit.updated_at),
                    expected_version,
                ],
            )
            .map(Ok)
        })
        .await
    }

    async fn archive_property(
        &self,
        id: Uuid,
        actor: Option<Uuid>,
        at: DateTime<Utc>,
        expected_version: Option<i64>,
    ) -> Result<Property> {
        self.archive_record(id, actor, at, expected_version).await
    }
}

// ============================================================================
// FloorPlanRepository implementation
// ============================================================================

#[async_trait]
impl FloorPlanRepository for SqliteRepository {
    async fn get_floor_plan(&self, id: Uuid) -> Result<Option<FloorPlan>> {
        self.get_record(id).await
    }

    async fn list_floor_plans(&self, filter: &FloorPlanFilter) -> Result<Paginated<FloorPlan>> {
        self.list_records(
            schema::COUNT_FLOOR_PLANS,
            schema::SELECT_FLOOR_PLANS,
            filter.status.map(|s| s.as_str()),
            filter.include_archived,
            Some(Value::Text(filter.property_id.to_string())),
            filter.page,
        )
        .await
    }

    async fn create_floor_plan(&self, plan: &FloorPlan) -> Result<()> {
        let plan = plan.clone();
        let id = plan.id.to_string();

        self.conn
            .call(move |conn| insert_floor_plan(conn, &plan).map_err(wrap_err))
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, FloorPlan::ENTITY, id))?;
        Ok(())
    }

    async fn create_floor_plans(&self, plans: &[FloorPlan]) -> Result<()> {
        self.insert_all(
            FloorPlan::ENTITY,
            plans.to_vec(),
            |plan| plan.id,
            insert_floor_plan,
        )
        .await
    }

    async fn update_floor_plan(&self, plan: &FloorPlan, expected_version: i64) -> Result<()> {
        let p = plan.clone();

        self.update_record::<FloorPlan, _>(plan.id, expected_version, move |conn| {
            conn.execute(
                schema::UPDATE_FLOOR_PLAN,
                params![
                    p.id.to_string(),
                    p.name,
                    p.floor_number,
                    p.width_m,
                    p.length_m,
                    p.area_sqm,
                    p.capacity,
                    p.status.as_str(),
                    format_json(&p.metadata),
                    format_uuid(p.audit.updated_by),
                    format_datetime(&p.audit.updated_at),
                    expected_version,
                ],
            )
            .map(Ok)
        })
        .await
    }

    async fn archive_floor_plan(
        &self,
        id: Uuid,
        actor: Option<Uuid>,
        at: DateTime<Utc>,
        expected_version: Option<i64>,
    ) -> Result<FloorPlan> {
        self.archive_record(id, actor, at, expected_version).await
    }
}

// ============================================================================
// LeaseRepository implementation
// ============================================================================

#[async_trait]
impl LeaseRepository for SqliteRepository {
    async fn get_lease(&self, id: Uuid) -> Result<Option<Lease>> {
        self.get_record(id).await
    }

    async fn list_leases(&self, filter: &LeaseFilter) -> Result<Paginated<Lease>> {
        let (count_sql, select_sql, scope_id) = match filter.scope {
            LeaseScope::Property(id) => (
                schema::COUNT_LEASES_BY_PROPERTY,
                schema::SELECT_LEASES_BY_PROPERTY,
                id,
            ),
            LeaseScope::Tenant(id) => (
                schema::COUNT_LEASES_BY_TENANT,
                schema::SELECT_LEASES_BY_TENANT,
                id,
            ),
        };

        self.list_records(
            count_sql,
            select_sql,
            filter.status.map(|s| s.as_str()),
            filter.include_archived,
            Some(Value::Text(scope_id.to_string())),
            filter.page,
        )
        .await
    }

    async fn create_lease(&self, lease: &Lease) -> Result<()> {
        let lease = lease.clone();
        let id = lease.id.to_string();

        self.conn
            .call(move |conn| insert_lease(conn, &lease).map_err(wrap_err))
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, Lease::ENTITY, id))?;
        Ok(())
    }

    async fn update_lease(&self, lease: &Lease, expected_version: i64) -> Result<()> {
        let l = lease.clone();

        self.update_record::<Lease, _>(lease.id, expected_version, move |conn| {
            conn.execute(
                schema::UPDATE_LEASE,
                params![
                    l.id.to_string(),
                    l.unit,
                    format_date(&l.start_date),
                    format_date(&l.end_date),
                    l.monthly_rent_cents,
                    l.deposit_cents,
                    l.currency,
                    l.status.as_str(),
                    format_json(&l.terms),
                    format_uuid(l.audit.updated_by),
                    format_datetime(&l.audit.updated_at),
                    expected_version,
                ],
            )
            .map(Ok)
        })
        .await
    }

    async fn archive_lease(
        &self,
        id: Uuid,
        actor: Option<Uuid>,
        at: DateTime<Utc>,
        expected_version: Option<i64>,
    ) -> Result<Lease> {
        self.archive_record(id, actor, at, expected_version).await
    }
}

// ============================================================================
// UserRepository implementation
// ============================================================================

#[async_trait]
impl UserRepository for SqliteRepository {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        self.get_record(id).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = email.to_string();

        self.conn
            .call(move |conn| {
                conn.query_row(schema::SELECT_USER_BY_EMAIL, [&email], row_to_user)
                    .optional()
                    .map_err(wrap_err)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, User::ENTITY))
    }

    async fn list_users(&self, filter: &UserFilter) -> Result<Paginated<User>> {
        let role = filter
            .role
            .map_or(Value::Null, |r| Value::Text(r.as_str().to_string()));

        self.list_records(
            schema::COUNT_USERS,
            schema::SELECT_USERS,
            filter.status.map(|s| s.as_str()),
            filter.include_archived,
            Some(role),
            filter.page,
        )
        .await
    }

    async fn create_user(&self, user: &User) -> Result<()> {
        let user = user.clone();
        let id = user.id.to_string();

        let outcome = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;
                if email_taken(&tx, &user).map_err(wrap_err)? {
                    return Ok(Err(email_conflict(&user)));
                }
                insert_user(&tx, &user).map_err(wrap_err)?;
                tx.commit().map_err(wrap_err)?;
                Ok(Ok(()))
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, User::ENTITY, id))?;
        outcome
    }

    async fn update_user(&self, user: &User, expected_version: i64) -> Result<()> {
        let u = user.clone();

        self.update_record::<User, _>(user.id, expected_version, move |conn| {
            if email_taken(conn, &u)? {
                return Ok(Err(email_conflict(&u)));
            }
            conn.execute(
                schema::UPDATE_USER,
                params![
                    u.id.to_string(),
                    u.name,
                    u.email,
                    u.role.as_str(),
                    u.status.as_str(),
                    format_json(&u.metadata),
                    format_uuid(u.audit.updated_by),
                    format_datetime(&u.audit.updated_at),
                    expected_version,
                ],
            )
            .map(Ok)
        })
        .await
    }

    async fn archive_user(
        &self,
        id: Uuid,
        actor: Option<Uuid>,
        at: DateTime<Utc>,
        expected_version: Option<i64>,
    ) -> Result<User> {
        self.archive_record(id, actor, at, expected_version).await
    }
}

// ============================================================================
// OccupancyRepository implementation
// ============================================================================

#[async_trait]
impl OccupancyRepository for SqliteRepository {
    async fn get_reading(&self, id: Uuid) -> Result<Option<OccupancyReading>> {
        let id_str = id.to_string();

        self.conn
            .call(move |conn| {
                conn.query_row(schema::SELECT_READING_BY_ID, [&id_str], row_to_reading)
                    .optional()
                    .map_err(wrap_err)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, READING_ENTITY, id.to_string()))
    }

    async fn record_readings(&self, readings: &[OccupancyReading]) -> Result<()> {
        self.insert_all(
            READING_ENTITY,
            readings.to_vec(),
            |reading| reading.id,
            insert_reading,
        )
        .await
    }

    async fn list_readings(
        &self,
        property_id: Uuid,
        range: TimeRange,
        include_invalidated: bool,
    ) -> Result<Vec<OccupancyReading>> {
        self.query_readings(
            schema::SELECT_READINGS_IN_RANGE,
            vec![
                Value::Text(property_id.to_string()),
                Value::Text(format_datetime(&range.start)),
                Value::Text(format_datetime(&range.end)),
                Value::Integer(i64::from(include_invalidated)),
            ],
        )
        .await
    }

    async fn latest_reading(&self, property_id: Uuid) -> Result<Option<OccupancyReading>> {
        let readings = self
            .query_readings(
                schema::SELECT_LATEST_READING,
                vec![Value::Text(property_id.to_string())],
            )
            .await?;
        Ok(readings.into_iter().next())
    }

    async fn hourly_rollup(
        &self,
        property_id: Uuid,
        range: TimeRange,
    ) -> Result<Vec<HourlyOccupancy>> {
        let property_id = property_id.to_string();
        let start = format_datetime(&range.start);
        let end = format_datetime(&range.end);

        self.conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare(schema::SELECT_HOURLY_ROLLUP)
                    .map_err(wrap_err)?;
                let rows = stmt
                    .query_map([&property_id, &start, &end], row_to_hourly)
                    .map_err(wrap_err)?;

                let mut buckets = Vec::new();
                for row_result in rows {
                    buckets.push(row_result.map_err(wrap_err)?);
                }
                Ok(buckets)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, READING_ENTITY))
    }

    async fn invalidate_reading(&self, id: Uuid) -> Result<OccupancyReading> {
        let id_str = id.to_string();

        let outcome = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;
                tx.execute(schema::INVALIDATE_READING, [&id_str])
                    .map_err(wrap_err)?;
                let reading = tx
                    .query_row(schema::SELECT_READING_BY_ID, [&id_str], row_to_reading)
                    .optional()
                    .map_err(wrap_err)?;
                tx.commit().map_err(wrap_err)?;
                Ok(reading.ok_or_else(|| RepositoryError::not_found(READING_ENTITY, &id_str)))
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, READING_ENTITY, id.to_string()))?;
        outcome
    }

    async fn purge_readings_before(&self, cutoff: DateTime<Utc>) -> Result<PurgeOutcome> {
        let cutoff_str = format_datetime(&cutoff);
        let month = partition_month(cutoff);

        self.conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;

                let property_ids = {
                    let mut stmt = tx
                        .prepare(schema::SELECT_PURGED_PROPERTIES)
                        .map_err(wrap_err)?;
                    let rows = stmt
                        .query_map([&cutoff_str, &month], |row| row.get::<_, String>(0))
                        .map_err(wrap_err)?;

                    let mut ids = Vec::new();
                    for row_result in rows {
                        let raw = row_result.map_err(wrap_err)?;
                        let id = Uuid::parse_str(&raw).map_err(|e| {
                            tokio_rusqlite::Error::Other(Box::new(e))
                        })?;
                        ids.push(id);
                    }
                    ids
                };

                let deleted = tx
                    .execute(schema::PURGE_READINGS, [&cutoff_str, &month])
                    .map_err(wrap_err)?;
                tx.commit().map_err(wrap_err)?;

                Ok(PurgeOutcome {
                    deleted: deleted as u64,
                    property_ids,
                })
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, READING_ENTITY))
    }
}

#[async_trait]
impl HealthCheck for SqliteRepository {
    async fn ping(&self) -> Result<()> {
        self.conn
            .call(|conn| {
                conn.query_row(schema::PING, [], |row| row.get::<_, i64>(0))
                    .map_err(wrap_err)
            })
            .await
            .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, TimeZone};
    use propdesk_core::domain::{
        CreateFloorPlanRequest, CreateLeaseRequest, CreatePropertyRequest, CreateUserRequest,
        FloorPlanStatus, LeaseStatus, PropertyStatus, ReadingStatus, RecordOccupancyRequest,
        UserRole,
    };

    async fn repo() -> SqliteRepository {
        SqliteRepository::new_in_memory().await.unwrap()
    }

    async fn seeded_property(repo: &SqliteRepository, name: &str) -> Property {
        let property =
            CreatePropertyRequest::new(name, "1 Harbour St").into_property(None, Utc::now());
        repo.create_property(&property).await.unwrap();
        property
    }

    async fn seeded_user(repo: &SqliteRepository, email: &str) -> User {
        let user = CreateUserRequest::new("Tenant", email).into_user(None, Utc::now());
        repo.create_user(&user).await.unwrap();
        user
    }

    fn plan(property_id: Uuid, name: &str, floor: i32) -> FloorPlan {
        CreateFloorPlanRequest::new(property_id, name, floor, 20.0, 12.5)
            .into_floor_plan(None, Utc::now())
    }

    fn lease(property_id: Uuid, tenant_id: Uuid, start_month: u32) -> Lease {
        CreateLeaseRequest {
            property_id,
            tenant_id,
            unit: "4B".to_string(),
            start_date: NaiveDate::from_ymd_opt(2025, start_month, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, start_month, 1).unwrap(),
            monthly_rent_cents: 250_000,
            deposit_cents: 500_000,
            currency: "EUR".to_string(),
            terms: None,
        }
        .into_lease(None, Utc::now())
    }

    fn reading_at(property_id: Uuid, at: DateTime<Utc>, count: i64) -> OccupancyReading {
        let mut request = RecordOccupancyRequest::new(property_id, count);
        request.recorded_at = Some(at);
        request.into_reading(None, Utc::now())
    }

    #[tokio::test]
    async fn test_property_round_trip() {
        let repo = repo().await;
        let mut property = seeded_property(&repo, "Dockside").await;
        property.metadata = serde_json::json!({"wing": "east"});
        property.version = 2;
        repo.update_property(&property, 1).await.unwrap();

        let stored = repo.get_property(property.id).await.unwrap().unwrap();
        assert_eq!(stored, property);
        assert!(repo.get_property(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_property_id_already_exists() {
        let repo = repo().await;
        let property = seeded_property(&repo, "Dockside").await;

        let result = repo.create_property(&property).await;

        assert_eq!(
            result,
            Err(RepositoryError::AlreadyExists {
                entity_type: "Property",
                id: property.id.to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_update_explains_misses() {
        let repo = repo().await;
        let mut property = seeded_property(&repo, "Dockside").await;
        property.name = "Renamed".to_string();
        property.version = 2;

        let stale = repo.update_property(&property, 7).await;
        assert_eq!(
            stale,
            Err(RepositoryError::version_conflict("Property", property.id, 7, 1))
        );

        let mut ghost = property.clone();
        ghost.id = Uuid::new_v4();
        assert!(matches!(
            repo.update_property(&ghost, 1).await,
            Err(RepositoryError::NotFound { .. })
        ));

        repo.archive_property(property.id, None, Utc::now(), None)
            .await
            .unwrap();
        assert!(matches!(
            repo.update_property(&property, 2).await,
            Err(RepositoryError::Archived { .. })
        ));
    }

    #[tokio::test]
    async fn test_archive_is_idempotent_and_versioned() {
        let repo = repo().await;
        let property = seeded_property(&repo, "Dockside").await;
        let actor = Uuid::new_v4();

        let conflict = repo
            .archive_property(property.id, Some(actor), Utc::now(), Some(4))
            .await;
        assert!(matches!(conflict, Err(RepositoryError::VersionConflict { .. })));

        let archived = repo
            .archive_property(property.id, Some(actor), Utc::now(), Some(1))
            .await
            .unwrap();
        assert_eq!(archived.status, PropertyStatus::Archived);
        assert_eq!(archived.version, 2);
        assert_eq!(archived.audit.updated_by, Some(actor));

        let again = repo
            .archive_property(property.id, None, Utc::now(), Some(1))
            .await
            .unwrap();
        assert_eq!(again, archived);
        assert_eq!(repo.get_property(property.id).await.unwrap(), Some(archived));
    }

    #[tokio::test]
    async fn test_list_properties_filters_and_counts() {
        let repo = repo().await;
        seeded_property(&repo, "Bravo").await;
        seeded_property(&repo, "Alpha").await;
        let gone = seeded_property(&repo, "Charlie").await;
        repo.archive_property(gone.id, None, Utc::now(), None)
            .await
            .unwrap();

        let live = repo
            .list_properties(&PropertyFilter::default())
            .await
            .unwrap();
        let names: Vec<&str> = live.items.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Bravo"]);
        assert_eq!(live.total, 2);

        let everything = repo
            .list_properties(&PropertyFilter {
                include_archived: true,
                page: Page::new(Some(1), Some(2)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(everything.total, 3);
        assert_eq!(everything.items.len(), 1);
        assert_eq!(everything.items[0].name, "Charlie");

        let archived_only = repo
            .list_properties(&PropertyFilter {
                status: Some(PropertyStatus::Archived),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(archived_only.total, 1);
    }

    #[tokio::test]
    async fn test_floor_plans_bulk_insert_is_atomic() {
        let repo = repo().await;
        let property = seeded_property(&repo, "Dockside").await;
        let first = plan(property.id, "Lobby", 0);
        repo.create_floor_plan(&first).await.unwrap();

        let batch = vec![plan(property.id, "Level 2", 2), first.clone()];
        assert!(matches!(
            repo.create_floor_plans(&batch).await,
            Err(RepositoryError::AlreadyExists { .. })
        ));
        assert!(repo.get_floor_plan(batch[0].id).await.unwrap().is_none());

        let batch = vec![plan(property.id, "Level 2", 2), plan(property.id, "Level 1", 1)];
        repo.create_floor_plans(&batch).await.unwrap();

        let listed = repo
            .list_floor_plans(&FloorPlanFilter::new(property.id))
            .await
            .unwrap();
        let floors: Vec<i32> = listed.items.iter().map(|p| p.floor_number).collect();
        assert_eq!(floors, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_floor_plan_requires_existing_property() {
        let repo = repo().await;
        let orphan = plan(Uuid::new_v4(), "Lobby", 0);

        assert!(matches!(
            repo.create_floor_plan(&orphan).await,
            Err(RepositoryError::InvalidData(_))
        ));
    }

    #[tokio::test]
    async fn test_floor_plan_update_and_status_filter() {
        let repo = repo().await;
        let property = seeded_property(&repo, "Dockside").await;
        let mut lobby = plan(property.id, "Lobby", 0);
        repo.create_floor_plan(&lobby).await.unwrap();

        lobby.status = FloorPlanStatus::Published;
        lobby.width_m = 30.0;
        lobby.recompute_area();
        lobby.version = 2;
        repo.update_floor_plan(&lobby, 1).await.unwrap();

        let mut filter = FloorPlanFilter::new(property.id);
        filter.status = Some(FloorPlanStatus::Published);
        let published = repo.list_floor_plans(&filter).await.unwrap();
        assert_eq!(published.items, vec![lobby]);
    }

    #[tokio::test]
    async fn test_leases_scoped_by_property_and_tenant() {
        let repo = repo().await;
        let property = seeded_property(&repo, "Dockside").await;
        let other = seeded_property(&repo, "Quayside").await;
        let tenant = seeded_user(&repo, "tenant@example.com").await;

        let late = lease(property.id, tenant.id, 6);
        let early = lease(property.id, tenant.id, 2);
        let elsewhere = lease(other.id, tenant.id, 1);
        for l in [&late, &early, &elsewhere] {
            repo.create_lease(l).await.unwrap();
        }

        let by_property = repo
            .list_leases(&LeaseFilter::new(LeaseScope::Property(property.id)))
            .await
            .unwrap();
        let ids: Vec<Uuid> = by_property.items.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![early.id, late.id]);

        let by_tenant = repo
            .list_leases(&LeaseFilter::new(LeaseScope::Tenant(tenant.id)))
            .await
            .unwrap();
        assert_eq!(by_tenant.total, 3);
        assert_eq!(by_tenant.items[0].id, elsewhere.id);
    }

    #[tokio::test]
    async fn test_lease_update_round_trip() {
        let repo = repo().await;
        let property = seeded_property(&repo, "Dockside").await;
        let tenant = seeded_user(&repo, "tenant@example.com").await;
        let mut l = lease(property.id, tenant.id, 3);
        repo.create_lease(&l).await.unwrap();

        l.status = LeaseStatus::Active;
        l.terms = serde_json::json!({"pets": false});
        l.version = 2;
        repo.update_lease(&l, 1).await.unwrap();

        assert_eq!(repo.get_lease(l.id).await.unwrap(), Some(l));
    }

    #[tokio::test]
    async fn test_user_email_is_unique() {
        let repo = repo().await;
        seeded_user(&repo, "ada@example.com").await;
        let duplicate = CreateUserRequest::new("Other Ada", "ada@example.com")
            .into_user(None, Utc::now());

        assert_eq!(
            repo.create_user(&duplicate).await,
            Err(RepositoryError::AlreadyExists {
                entity_type: "User",
                id: "ada@example.com".to_string(),
            })
        );

        let mut bob = seeded_user(&repo, "bob@example.com").await;
        bob.email = "ada@example.com".to_string();
        bob.version = 2;
        assert!(matches!(
            repo.update_user(&bob, 1).await,
            Err(RepositoryError::AlreadyExists { .. })
        ));

        let found = repo
            .get_user_by_email("ada@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.name, "Tenant");
    }

    #[tokio::test]
    async fn test_list_users_by_role() {
        let repo = repo().await;
        seeded_user(&repo, "zed@example.com").await;
        let admin = CreateUserRequest::new("Admin", "admin@example.com")
            .with_role(UserRole::Admin)
            .into_user(None, Utc::now());
        repo.create_user(&admin).await.unwrap();

        let all = repo.list_users(&UserFilter::default()).await.unwrap();
        let emails: Vec<&str> = all.items.iter().map(|u| u.email.as_str()).collect();
        assert_eq!(emails, vec!["admin@example.com", "zed@example.com"]);

        let admins = repo
            .list_users(&UserFilter {
                role: Some(UserRole::Admin),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(admins.items, vec![admin]);
    }

    #[tokio::test]
    async fn test_readings_range_latest_and_rollup() {
        let repo = repo().await;
        let property = seeded_property(&repo, "Dockside").await;
        let base = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        repo.record_readings(&[
            reading_at(property.id, base + Duration::minutes(5), 10),
            reading_at(property.id, base + Duration::minutes(35), 20),
            reading_at(property.id, base + Duration::minutes(65), 30),
        ])
        .await
        .unwrap();

        let range = TimeRange::new(base, base + Duration::hours(2)).unwrap();
        let listed = repo.list_readings(property.id, range, false).await.unwrap();
        let counts: Vec<i64> = listed.iter().map(|r| r.occupant_count).collect();
        assert_eq!(counts, vec![10, 20, 30]);

        let latest = repo.latest_reading(property.id).await.unwrap().unwrap();
        assert_eq!(latest.occupant_count, 30);

        let rollup = repo.hourly_rollup(property.id, range).await.unwrap();
        assert_eq!(rollup.len(), 2);
        assert_eq!(rollup[0].hour, base);
        assert_eq!(rollup[0].reading_count, 2);
        assert!((rollup[0].avg_occupants - 15.0).abs() < f64::EPSILON);
        assert_eq!(rollup[0].min_occupants, 10);
        assert_eq!(rollup[1].max_occupants, 30);
    }

    #[tokio::test]
    async fn test_invalidate_reading() {
        let repo = repo().await;
        let property = seeded_property(&repo, "Dockside").await;
        let base = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let early = reading_at(property.id, base, 5);
        let late = reading_at(property.id, base + Duration::minutes(10), 50);
        repo.record_readings(&[early.clone(), late.clone()])
            .await
            .unwrap();

        let invalidated = repo.invalidate_reading(late.id).await.unwrap();
        assert_eq!(invalidated.status, ReadingStatus::Invalidated);
        assert_eq!(repo.invalidate_reading(late.id).await.unwrap(), invalidated);

        let latest = repo.latest_reading(property.id).await.unwrap().unwrap();
        assert_eq!(latest.id, early.id);

        let range = TimeRange::new(base, base + Duration::hours(1)).unwrap();
        assert_eq!(repo.list_readings(property.id, range, true).await.unwrap().len(), 2);

        assert!(matches!(
            repo.invalidate_reading(Uuid::new_v4()).await,
            Err(RepositoryError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_record_readings_all_or_nothing() {
        let repo = repo().await;
        let property = seeded_property(&repo, "Dockside").await;
        let good = reading_at(property.id, Utc::now(), 3);
        let orphan = reading_at(Uuid::new_v4(), Utc::now(), 4);

        assert!(repo.record_readings(&[good.clone(), orphan]).await.is_err());
        assert!(repo.get_reading(good.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_purge_reports_affected_properties() {
        let repo = repo().await;
        let old_property = seeded_property(&repo, "Old").await;
        let fresh_property = seeded_property(&repo, "Fresh").await;
        let now = Utc::now();
        repo.record_readings(&[
            reading_at(old_property.id, now - Duration::days(100), 1),
            reading_at(old_property.id, now - Duration::days(95), 2),
            reading_at(fresh_property.id, now - Duration::days(1), 3),
        ])
        .await
        .unwrap();

        let outcome = repo
            .purge_readings_before(now - Duration::days(90))
            .await
            .unwrap();

        assert_eq!(outcome.deleted, 2);
        assert_eq!(outcome.property_ids, vec![old_property.id]);
        assert!(repo.latest_reading(fresh_property.id).await.unwrap().is_some());
        assert!(repo.latest_reading(old_property.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ping() {
        let repo = repo().await;
        assert!(repo.ping().await.is_ok());
    }
}
