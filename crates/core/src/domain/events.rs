use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::occupancy::OccupancyReading;

/// Live occupancy change pushed to subscribers of a property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OccupancyEvent {
    /// A batch of readings was ingested for the property.
    ReadingsRecorded {
        property_id: Uuid,
        readings: Vec<OccupancyReading>,
    },
    /// A reading was marked invalid and no longer counts.
    ReadingInvalidated { property_id: Uuid, reading_id: Uuid },
}

impl OccupancyEvent {
    pub fn readings_recorded(property_id: Uuid, readings: Vec<OccupancyReading>) -> Self {
        OccupancyEvent::ReadingsRecorded {
            property_id,
            readings,
        }
    }

    pub fn reading_invalidated(property_id: Uuid, reading_id: Uuid) -> Self {
        OccupancyEvent::ReadingInvalidated {
            property_id,
            reading_id,
        }
    }

    pub fn property_id(&self) -> Uuid {
        match self {
            OccupancyEvent::ReadingsRecorded { property_id, .. }
            | OccupancyEvent::ReadingInvalidated { property_id, .. } => *property_id,
        }
    }

    /// SSE event name.
    pub fn event_type(&self) -> &'static str {
        match self {
            OccupancyEvent::ReadingsRecorded { .. } => "readings_recorded",
            OccupancyEvent::ReadingInvalidated { .. } => "reading_invalidated",
        }
    }

    /// Most recent counted reading carried by the event, if any.
    pub fn latest_reading(&self) -> Option<&OccupancyReading> {
        match self {
            OccupancyEvent::ReadingsRecorded { readings, .. } => readings
                .iter()
                .filter(|r| r.is_counted())
                .max_by_key(|r| r.recorded_at),
            OccupancyEvent::ReadingInvalidated { .. } => None,
        }
    }
}
