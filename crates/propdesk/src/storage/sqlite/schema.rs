//! SQLite schema definitions and SQL query constants.
//!
//! Pure data, no I/O. CHECK constraints mirror the validation rules of the
//! domain layer so rows written around the service layer are still sound.

/// SQL statement to create all tables, indexes and views.
pub const CREATE_TABLES: &str = r#"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS properties (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL CHECK (length(trim(name)) > 0 AND length(name) <= 200),
    address TEXT NOT NULL CHECK (length(trim(address)) > 0),
    status TEXT NOT NULL CHECK (status IN ('ACTIVE', 'INACTIVE', 'ARCHIVED')),
    metadata TEXT NOT NULL DEFAULT '{}'
        CHECK (json_valid(metadata) AND json_type(metadata) = 'object'),
    created_by TEXT,
    updated_by TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    version INTEGER NOT NULL DEFAULT 1 CHECK (version >= 1)
);

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL CHECK (length(trim(name)) > 0 AND length(name) <= 200),
    email TEXT NOT NULL UNIQUE CHECK (instr(email, '@') > 1),
    role TEXT NOT NULL CHECK (role IN ('ADMIN', 'MANAGER', 'TENANT', 'VIEWER')),
    status TEXT NOT NULL CHECK (status IN ('ACTIVE', 'SUSPENDED', 'ARCHIVED')),
    metadata TEXT NOT NULL DEFAULT '{}'
        CHECK (json_valid(metadata) AND json_type(metadata) = 'object'),
    created_by TEXT,
    updated_by TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    version INTEGER NOT NULL DEFAULT 1 CHECK (version >= 1)
);

CREATE TABLE IF NOT EXISTS floor_plans (
    id TEXT PRIMARY KEY,
    property_id TEXT NOT NULL REFERENCES properties(id),
    name TEXT NOT NULL CHECK (length(trim(name)) > 0 AND length(name) <= 200),
    floor_number INTEGER NOT NULL CHECK (floor_number BETWEEN -10 AND 300),
    width_m REAL NOT NULL CHECK (width_m > 0 AND width_m <= 10000),
    length_m REAL NOT NULL CHECK (length_m > 0 AND length_m <= 10000),
    area_sqm REAL NOT NULL CHECK (area_sqm > 0),
    capacity INTEGER CHECK (capacity IS NULL OR capacity >= 0),
    status TEXT NOT NULL CHECK (status IN ('DRAFT', 'PUBLISHED', 'ARCHIVED')),
    metadata TEXT NOT NULL DEFAULT '{}'
        CHECK (json_valid(metadata) AND json_type(metadata) = 'object'),
    created_by TEXT,
    updated_by TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    version INTEGER NOT NULL DEFAULT 1 CHECK (version >= 1)
);

CREATE TABLE IF NOT EXISTS leases (
    id TEXT PRIMARY KEY,
    property_id TEXT NOT NULL REFERENCES properties(id),
    tenant_id TEXT NOT NULL REFERENCES users(id),
    unit TEXT NOT NULL CHECK (length(trim(unit)) > 0 AND length(unit) <= 50),
    start_date TEXT NOT NULL,
    end_date TEXT NOT NULL,
    monthly_rent_cents INTEGER NOT NULL CHECK (monthly_rent_cents >= 0),
    deposit_cents INTEGER NOT NULL DEFAULT 0 CHECK (deposit_cents >= 0),
    currency TEXT NOT NULL CHECK (length(currency) = 3 AND currency = upper(currency)),
    status TEXT NOT NULL
        CHECK (status IN ('PENDING', 'ACTIVE', 'TERMINATED', 'EXPIRED', 'ARCHIVED')),
    terms TEXT NOT NULL DEFAULT '{}'
        CHECK (json_valid(terms) AND json_type(terms) = 'object'),
    created_by TEXT,
    updated_by TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    version INTEGER NOT NULL DEFAULT 1 CHECK (version >= 1),
    CHECK (end_date > start_date)
);

-- Month partitioned time series. `partition_month` is YYYY-MM of recorded_at.
CREATE TABLE IF NOT EXISTS occupancy_readings (
    id TEXT PRIMARY KEY,
    property_id TEXT NOT NULL REFERENCES properties(id),
    floor_plan_id TEXT REFERENCES floor_plans(id),
    recorded_at TEXT NOT NULL,
    partition_month TEXT NOT NULL,
    occupant_count INTEGER NOT NULL CHECK (occupant_count >= 0),
    capacity INTEGER CHECK (capacity IS NULL OR capacity > 0),
    status TEXT NOT NULL CHECK (status IN ('RECORDED', 'INVALIDATED')),
    metadata TEXT NOT NULL DEFAULT '{}'
        CHECK (json_valid(metadata) AND json_type(metadata) = 'object'),
    created_by TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_floor_plans_property ON floor_plans(property_id, floor_number);
CREATE INDEX IF NOT EXISTS idx_leases_property ON leases(property_id, start_date);
CREATE INDEX IF NOT EXISTS idx_leases_tenant ON leases(tenant_id, start_date);
CREATE INDEX IF NOT EXISTS idx_readings_property_time
    ON occupancy_readings(property_id, recorded_at);
CREATE INDEX IF NOT EXISTS idx_readings_partition
    ON occupancy_readings(partition_month, recorded_at);

CREATE VIEW IF NOT EXISTS occupancy_hourly AS
SELECT
    property_id,
    strftime('%Y-%m-%dT%H:00:00.000000000Z', recorded_at) AS hour,
    COUNT(*) AS reading_count,
    AVG(occupant_count) AS avg_occupants,
    MIN(occupant_count) AS min_occupants,
    MAX(occupant_count) AS max_occupants
FROM occupancy_readings
WHERE status = 'RECORDED'
GROUP BY property_id, hour;
"#;

// Shared status filter: ?1 explicit status (nullable), ?2 include archived.
// Page is always ?3 (limit) and ?4 (offset).

// Property queries
pub const INSERT_PROPERTY: &str = r#"
INSERT INTO properties (id, name, address, status, metadata, created_by, updated_by, created_at, updated_at, version)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
"#;

pub const SELECT_PROPERTY_BY_ID: &str = r#"
SELECT id, name, address, status, metadata, created_by, updated_by, created_at, updated_at, version
FROM properties
WHERE id = ?1
"#;

pub const SELECT_PROPERTIES: &str = r#"
SELECT id, name, address, status, metadata, created_by, updated_by, created_at, updated_at, version
FROM properties
WHERE ((?1 IS NOT NULL AND status = ?1) OR (?1 IS NULL AND (?2 OR status != 'ARCHIVED')))
ORDER BY name, id
LIMIT ?3 OFFSET ?4
"#;

pub const COUNT_PROPERTIES: &str = r#"
SELECT COUNT(*)
FROM properties
WHERE ((?1 IS NOT NULL AND status = ?1) OR (?1 IS NULL AND (?2 OR status != 'ARCHIVED')))
"#;

pub const UPDATE_PROPERTY: &str = r#"
UPDATE properties
SET name = ?2, address = ?3, status = ?4, metadata = ?5, updated_by = ?6, updated_at = ?7,
    version = version + 1
WHERE id = ?1 AND version = ?8 AND status != 'ARCHIVED'
"#;

// Floor plan queries
pub const INSERT_FLOOR_PLAN: &str = r#"
INSERT INTO floor_plans (id, property_id, name, floor_number, width_m, length_m, area_sqm, capacity, status, metadata, created_by, updated_by, created_at, updated_at, version)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
"#;

pub const SELECT_FLOOR_PLAN_BY_ID: &str = r#"
SELECT id, property_id, name, floor_number, width_m, length_m, area_sqm, capacity, status, metadata, created_by, updated_by, created_at, updated_at, version
FROM floor_plans
WHERE id = ?1
"#;

pub const SELECT_FLOOR_PLANS: &str = r#"
SELECT id, property_id, name, floor_number, width_m, length_m, area_sqm, capacity, status, metadata, created_by, updated_by, created_at, updated_at, version
FROM floor_plans
WHERE property_id = ?5
  AND ((?1 IS NOT NULL AND status = ?1) OR (?1 IS NULL AND (?2 OR status != 'ARCHIVED')))
ORDER BY floor_number, name, id
LIMIT ?3 OFFSET ?4
"#;

pub const COUNT_FLOOR_PLANS: &str = r#"
SELECT COUNT(*)
FROM floor_plans
WHERE property_id = ?3
  AND ((?1 IS NOT NULL AND status = ?1) OR (?1 IS NULL AND (?2 OR status != 'ARCHIVED')))
"#;

pub const UPDATE_FLOOR_PLAN: &str = r#"
UPDATE floor_plans
SET name = ?2, floor_number = ?3, width_m = ?4, length_m = ?5, area_sqm = ?6, capacity = ?7,
    status = ?8, metadata = ?9, updated_by = ?10, updated_at = ?11, version = version + 1
WHERE id = ?1 AND version = ?12 AND status != 'ARCHIVED'
"#;

// Lease queries
pub const INSERT_LEASE: &str = r#"
INSERT INTO leases (id, property_id, tenant_id, unit, start_date, end_date, monthly_rent_cents, deposit_cents, currency, status, terms, created_by, updated_by, created_at, updated_at, version)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
"#;

pub const SELECT_LEASE_BY_ID: &str = r#"
SELECT id, property_id, tenant_id, unit, start_date, end_date, monthly_rent_cents, deposit_cents, currency, status, terms, created_by, updated_by, created_at, updated_at, version
FROM leases
WHERE id = ?1
"#;

pub const SELECT_LEASES_BY_PROPERTY: &str = r#"
SELECT id, property_id, tenant_id, unit, start_date, end_date, monthly_rent_cents, deposit_cents, currency, status, terms, created_by, updated_by, created_at, updated_at, version
FROM leases
WHERE property_id = ?5
  AND ((?1 IS NOT NULL AND status = ?1) OR (?1 IS NULL AND (?2 OR status != 'ARCHIVED')))
ORDER BY start_date, id
LIMIT ?3 OFFSET ?4
"#;

pub const COUNT_LEASES_BY_PROPERTY: &str = r#"
SELECT COUNT(*)
FROM leases
WHERE property_id = ?3
  AND ((?1 IS NOT NULL AND status = ?1) OR (?1 IS NULL AND (?2 OR status != 'ARCHIVED')))
"#;

pub const SELECT_LEASES_BY_TENANT: &str = r#"
SELECT id, property_id, tenant_id, unit, start_date, end_date, monthly_rent_cents, deposit_cents, currency, status, terms, created_by, updated_by, created_at, updated_at, version
FROM leases
WHERE tenant_id = ?5
  AND ((?1 IS NOT NULL AND status = ?1) OR (?1 IS NULL AND (?2 OR status != 'ARCHIVED')))
ORDER BY start_date, id
LIMIT ?3 OFFSET ?4
"#;

pub const COUNT_LEASES_BY_TENANT: &str = r#"
SELECT COUNT(*)
FROM leases
WHERE tenant_id = ?3
  AND ((?1 IS NOT NULL AND status = ?1) OR (?1 IS NULL AND (?2 OR status != 'ARCHIVED')))
"#;

pub const UPDATE_LEASE: &str = r#"
UPDATE leases
SET unit = ?2, start_date = ?3, end_date = ?4, monthly_rent_cents = ?5, deposit_cents = ?6,
    currency = ?7, status = ?8, terms = ?9, updated_by = ?10, updated_at = ?11,
    version = version + 1
WHERE id = ?1 AND version = ?12 AND status != 'ARCHIVED'
"#;

// User queries
pub const INSERT_USER: &str = r#"
INSERT INTO users (id, name, email, role, status, metadata, created_by, updated_by, created_at, updated_at, version)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
"#;

pub const SELECT_USER_BY_ID: &str = r#"
SELECT id, name, email, role, status, metadata, created_by, updated_by, created_at, updated_at, version
FROM users
WHERE id = ?1
"#;

pub const SELECT_USER_BY_EMAIL: &str = r#"
SELECT id, name, email, role, status, metadata, created_by, updated_by, created_at, updated_at, version
FROM users
WHERE email = ?1
"#;

pub const SELECT_USERS: &str = r#"
SELECT id, name, email, role, status, metadata, created_by, updated_by, created_at, updated_at, version
FROM users
WHERE (?5 IS NULL OR role = ?5)
  AND ((?1 IS NOT NULL AND status = ?1) OR (?1 IS NULL AND (?2 OR status != 'ARCHIVED')))
ORDER BY email
LIMIT ?3 OFFSET ?4
"#;

pub const COUNT_USERS: &str = r#"
SELECT COUNT(*)
FROM users
WHERE (?3 IS NULL OR role = ?3)
  AND ((?1 IS NOT NULL AND status = ?1) OR (?1 IS NULL AND (?2 OR status != 'ARCHIVED')))
"#;

pub const UPDATE_USER: &str = r#"
UPDATE users
SET name = ?2, email = ?3, role = ?4, status = ?5, metadata = ?6, updated_by = ?7,
    updated_at = ?8, version = version + 1
WHERE id = ?1 AND version = ?9 AND status != 'ARCHIVED'
"#;

// Occupancy queries
pub const INSERT_READING: &str = r#"
INSERT INTO occupancy_readings (id, property_id, floor_plan_id, recorded_at, partition_month, occupant_count, capacity, status, metadata, created_by, created_at)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
"#;

pub const SELECT_READING_BY_ID: &str = r#"
SELECT id, property_id, floor_plan_id, recorded_at, occupant_count, capacity, status, metadata, created_by, created_at
FROM occupancy_readings
WHERE id = ?1
"#;

pub const SELECT_READINGS_IN_RANGE: &str = r#"
SELECT id, property_id, floor_plan_id, recorded_at, occupant_count, capacity, status, metadata, created_by, created_at
FROM occupancy_readings
WHERE property_id = ?1 AND recorded_at >= ?2 AND recorded_at < ?3
  AND (?4 OR status = 'RECORDED')
ORDER BY recorded_at, id
"#;

pub const SELECT_LATEST_READING: &str = r#"
SELECT id, property_id, floor_plan_id, recorded_at, occupant_count, capacity, status, metadata, created_by, created_at
FROM occupancy_readings
WHERE property_id = ?1 AND status = 'RECORDED'
ORDER BY recorded_at DESC, id DESC
LIMIT 1
"#;

pub const SELECT_HOURLY_ROLLUP: &str = r#"
SELECT property_id, hour, reading_count, avg_occupants, min_occupants, max_occupants
FROM occupancy_hourly
WHERE property_id = ?1 AND hour >= ?2 AND hour < ?3
ORDER BY hour
"#;

pub const INVALIDATE_READING: &str = r#"
UPDATE occupancy_readings
SET status = 'INVALIDATED'
WHERE id = ?1
"#;

pub const SELECT_PURGED_PROPERTIES: &str = r#"
SELECT DISTINCT property_id
FROM occupancy_readings
WHERE partition_month <= ?2 AND recorded_at < ?1
ORDER BY property_id
"#;

pub const PURGE_READINGS: &str = r#"
DELETE FROM occupancy_readings
WHERE partition_month <= ?2 AND recorded_at < ?1
"#;

pub const PING: &str = "SELECT 1";

/// Columns looked up after an optimistic write touched no row.
pub fn select_version_and_status(table: &str) -> String {
    format!("SELECT version, status FROM {table} WHERE id = ?1")
}

/// Marks a row archived if it is still at the expected version.
pub fn archive_row(table: &str) -> String {
    format!(
        "UPDATE {table} SET status = 'ARCHIVED', updated_by = ?2, updated_at = ?3, \
         version = version + 1 WHERE id = ?1 AND version = ?4"
    )
}
