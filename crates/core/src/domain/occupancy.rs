use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::common::{check_blob, empty_object, UnknownVariant};
use super::error::ValidationErrors;

/// How far ahead of the server clock a reading may be stamped, in minutes.
pub const MAX_CLOCK_SKEW_MINUTES: i64 = 5;

/// Whether a reading still counts towards rollups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReadingStatus {
    #[default]
    Recorded,
    Invalidated,
}

impl ReadingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadingStatus::Recorded => "RECORDED",
            ReadingStatus::Invalidated => "INVALIDATED",
        }
    }
}

impl fmt::Display for ReadingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReadingStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RECORDED" => Ok(ReadingStatus::Recorded),
            "INVALIDATED" => Ok(ReadingStatus::Invalidated),
            other => Err(UnknownVariant::new("reading status", other)),
        }
    }
}

/// One headcount sample for a property, optionally narrowed to a floor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupancyReading {
    pub id: Uuid,
    pub property_id: Uuid,
    pub floor_plan_id: Option<Uuid>,
    pub recorded_at: DateTime<Utc>,
    pub occupant_count: i64,
    pub capacity: Option<i64>,
    pub status: ReadingStatus,
    pub metadata: serde_json::Value,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl OccupancyReading {
    /// Occupants over capacity, when capacity is known.
    pub fn utilization(&self) -> Option<f64> {
        self.capacity
            .filter(|c| *c > 0)
            .map(|c| self.occupant_count as f64 / c as f64)
    }

    pub fn is_counted(&self) -> bool {
        self.status == ReadingStatus::Recorded
    }
}

/// A single reading inside an ingestion batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordOccupancyRequest {
    pub property_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor_plan_id: Option<Uuid>,
    /// Defaults to the ingestion time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<DateTime<Utc>>,
    pub occupant_count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl RecordOccupancyRequest {
    pub fn new(property_id: Uuid, occupant_count: i64) -> Self {
        Self {
            property_id,
            floor_plan_id: None,
            recorded_at: None,
            occupant_count,
            capacity: None,
            metadata: None,
        }
    }

    pub fn into_reading(self, actor: Option<Uuid>, now: DateTime<Utc>) -> OccupancyReading {
        OccupancyReading {
            id: Uuid::new_v4(),
            property_id: self.property_id,
            floor_plan_id: self.floor_plan_id,
            recorded_at: self.recorded_at.unwrap_or(now),
            occupant_count: self.occupant_count,
            capacity: self.capacity,
            status: ReadingStatus::default(),
            metadata: self.metadata.unwrap_or_else(empty_object),
            created_by: actor,
            created_at: now,
        }
    }
}

/// Request payload for ingesting a batch of readings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestOccupancyRequest {
    pub readings: Vec<RecordOccupancyRequest>,
}

/// Aggregate of the counted readings of one property within one hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyOccupancy {
    pub property_id: Uuid,
    pub hour: DateTime<Utc>,
    pub reading_count: i64,
    pub avg_occupants: f64,
    pub min_occupants: i64,
    pub max_occupants: i64,
}

/// Truncates a timestamp to the start of its hour.
pub fn hour_bucket(at: DateTime<Utc>) -> DateTime<Utc> {
    at.duration_trunc(Duration::hours(1)).unwrap_or(at)
}

/// Month partition a reading belongs to, as `YYYY-MM`.
pub fn partition_month(at: DateTime<Utc>) -> String {
    at.format("%Y-%m").to_string()
}

/// The instant before which readings fall out of retention.
///
/// `None` when the window reaches past the earliest representable instant.
pub fn retention_cutoff(now: DateTime<Utc>, retention_days: u32) -> Option<DateTime<Utc>> {
    now.checked_sub_signed(Duration::try_days(i64::from(retention_days))?)
}

/// Groups counted readings into hourly buckets, ordered by hour.
pub fn rollup_hourly(readings: &[OccupancyReading]) -> Vec<HourlyOccupancy> {
    let mut buckets: BTreeMap<(DateTime<Utc>, Uuid), Vec<i64>> = BTreeMap::new();
    for reading in readings.iter().filter(|r| r.is_counted()) {
        buckets
            .entry((hour_bucket(reading.recorded_at), reading.property_id))
            .or_default()
            .push(reading.occupant_count);
    }

    buckets
        .into_iter()
        .map(|((hour, property_id), counts)| {
            let total: i64 = counts.iter().sum();
            HourlyOccupancy {
                property_id,
                hour,
                reading_count: counts.len() as i64,
                avg_occupants: total as f64 / counts.len() as f64,
                min_occupants: counts.iter().copied().min().unwrap_or(0),
                max_occupants: counts.iter().copied().max().unwrap_or(0),
            }
        })
        .collect()
}

/// Validates a reading against the clock at `now`.
pub fn validate_reading(
    reading: &OccupancyReading,
    now: DateTime<Utc>,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    errors.check(
        reading.occupant_count < 0,
        "occupant_count",
        "cannot be negative",
    );
    if let Some(capacity) = reading.capacity {
        errors.check(capacity <= 0, "capacity", "must be positive");
    }
    errors.check(
        reading.recorded_at > now + Duration::minutes(MAX_CLOCK_SKEW_MINUTES),
        "recorded_at",
        "cannot be in the future",
    );
    check_blob(&mut errors, "metadata", &reading.metadata);
    errors.into_result()
}
