//! SQLite row conversion functions.
//!
//! Pure functions for converting between SQLite rows and domain types.
//! Column order follows the `SELECT` lists in `schema.rs`.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::Row;
use uuid::Uuid;

use propdesk_core::domain::{
    Audit, FloorPlan, HourlyOccupancy, Lease, OccupancyReading, Property, User,
};

/// Convert a SQLite row to a Property.
///
/// Expected columns: id, name, address, status, metadata, created_by,
/// updated_by, created_at, updated_at, version
pub fn row_to_property(row: &Row) -> rusqlite::Result<Property> {
    Ok(Property {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        name: row.get(1)?,
        address: row.get(2)?,
        status: parse_enum(&row.get::<_, String>(3)?)?,
        metadata: parse_json(&row.get::<_, String>(4)?)?,
        audit: audit_at(row, 5)?,
        version: row.get(9)?,
    })
}

/// Convert a SQLite row to a FloorPlan.
///
/// Expected columns: id, property_id, name, floor_number, width_m, length_m,
/// area_sqm, capacity, status, metadata, created_by, updated_by, created_at,
/// updated_at, version
pub fn row_to_floor_plan(row: &Row) -> rusqlite::Result<FloorPlan> {
    Ok(FloorPlan {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        property_id: parse_uuid(&row.get::<_, String>(1)?)?,
        name: row.get(2)?,
        floor_number: row.get(3)?,
        width_m: row.get(4)?,
        length_m: row.get(5)?,
        area_sqm: row.get(6)?,
        capacity: row.get(7)?,
        status: parse_enum(&row.get::<_, String>(8)?)?,
        metadata: parse_json(&row.get::<_, String>(9)?)?,
        audit: audit_at(row, 10)?,
        version: row.get(14)?,
    })
}

/// Convert a SQLite row to a Lease.
///
/// Expected columns: id, property_id, tenant_id, unit, start_date, end_date,
/// monthly_rent_cents, deposit_cents, currency, status, terms, created_by,
/// updated_by, created_at, updated_at, version
pub fn row_to_lease(row: &Row) -> rusqlite::Result<Lease> {
    Ok(Lease {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        property_id: parse_uuid(&row.get::<_, String>(1)?)?,
        tenant_id: parse_uuid(&row.get::<_, String>(2)?)?,
        unit: row.get(3)?,
        start_date: parse_date(&row.get::<_, String>(4)?)?,
        end_date: parse_date(&row.get::<_, String>(5)?)?,
        monthly_rent_cents: row.get(6)?,
        deposit_cents: row.get(7)?,
        currency: row.get(8)?,
        status: parse_enum(&row.get::<_, String>(9)?)?,
        terms: parse_json(&row.get::<_, String>(10)?)?,
        audit: audit_at(row, 11)?,
        version: row.get(15)?,
    })
}

/// Convert a SQLite row to a User.
///
/// Expected columns: id, name, email, role, status, metadata, created_by,
/// updated_by, created_at, updated_at, version
pub fn row_to_user(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        name: row.get(1)?,
        email: row.get(2)?,
        role: parse_enum(&row.get::<_, String>(3)?)?,
        status: parse_enum(&row.get::<_, String>(4)?)?,
        metadata: parse_json(&row.get::<_, String>(5)?)?,
        audit: audit_at(row, 6)?,
        version: row.get(10)?,
    })
}

/// Convert a SQLite row to an OccupancyReading.
///
/// Expected columns: id, property_id, floor_plan_id, recorded_at,
/// occupant_count, capacity, status, metadata, created_by, created_at
pub fn row_to_reading(row: &Row) -> rusqlite::Result<OccupancyReading> {
    let floor_plan_id: Option<String> = row.get(2)?;
    let created_by: Option<String> = row.get(8)?;

    Ok(OccupancyReading {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        property_id: parse_uuid(&row.get::<_, String>(1)?)?,
        floor_plan_id: floor_plan_id.as_deref().map(parse_uuid).transpose()?,
        recorded_at: parse_datetime(&row.get::<_, String>(3)?)?,
        occupant_count: row.get(4)?,
        capacity: row.get(5)?,
        status: parse_enum(&row.get::<_, String>(6)?)?,
        metadata: parse_json(&row.get::<_, String>(7)?)?,
        created_by: created_by.as_deref().map(parse_uuid).transpose()?,
        created_at: parse_datetime(&row.get::<_, String>(9)?)?,
    })
}

/// Convert a row of the `occupancy_hourly` view.
///
/// Expected columns: property_id, hour, reading_count, avg_occupants,
/// min_occupants, max_occupants
pub fn row_to_hourly(row: &Row) -> rusqlite::Result<HourlyOccupancy> {
    Ok(HourlyOccupancy {
        property_id: parse_uuid(&row.get::<_, String>(0)?)?,
        hour: parse_datetime(&row.get::<_, String>(1)?)?,
        reading_count: row.get(2)?,
        avg_occupants: row.get(3)?,
        min_occupants: row.get(4)?,
        max_occupants: row.get(5)?,
    })
}

/// Reads the four audit columns starting at `first`.
fn audit_at(row: &Row, first: usize) -> rusqlite::Result<Audit> {
    let created_by: Option<String> = row.get(first)?;
    let updated_by: Option<String> = row.get(first + 1)?;
    Ok(Audit {
        created_by: created_by.as_deref().map(parse_uuid).transpose()?,
        updated_by: updated_by.as_deref().map(parse_uuid).transpose()?,
        created_at: parse_datetime(&row.get::<_, String>(first + 2)?)?,
        updated_at: parse_datetime(&row.get::<_, String>(first + 3)?)?,
    })
}

fn conversion_error<E>(e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e))
}

fn parse_uuid(s: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(s).map_err(conversion_error)
}

/// Parse a date from ISO 8601 string (YYYY-MM-DD).
fn parse_date(s: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(conversion_error)
}

/// Parse a datetime from RFC 3339 string.
fn parse_datetime(s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(conversion_error)
}

/// Parse a stored status or role column.
fn parse_enum<T>(s: &str) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    s.parse().map_err(conversion_error)
}

fn parse_json(s: &str) -> rusqlite::Result<serde_json::Value> {
    serde_json::from_str(s).map_err(conversion_error)
}

/// Format a DateTime for SQLite storage.
///
/// Fixed width with nanoseconds so text comparison orders like time.
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Format a NaiveDate for SQLite storage (YYYY-MM-DD).
pub fn format_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn format_uuid(id: Option<Uuid>) -> Option<String> {
    id.map(|id| id.to_string())
}

pub fn format_json(value: &serde_json::Value) -> String {
    value.to_string()
}
