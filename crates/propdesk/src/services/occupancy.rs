use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use propdesk_core::domain::{
    retention_cutoff, validate_reading, FloorPlan, HourlyOccupancy, IngestOccupancyRequest,
    OccupancyReading, Record, ValidationErrors,
};
use propdesk_core::storage::{
    FloorPlanRepository, OccupancyRepository, PropertyRepository, RepositoryError, TimeRange,
};

use super::{check_batch_size, check_property, Actor, Result};

/// Result of a retention run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionReport {
    pub cutoff: DateTime<Utc>,
    pub retention_days: u32,
    pub deleted: u64,
    pub property_ids: Vec<Uuid>,
}

#[derive(Clone)]
pub struct OccupancyService {
    readings: Arc<dyn OccupancyRepository>,
    properties: Arc<dyn PropertyRepository>,
    floor_plans: Arc<dyn FloorPlanRepository>,
    max_batch_size: usize,
    retention_days: u32,
}

impl OccupancyService {
    pub fn new(
        readings: Arc<dyn OccupancyRepository>,
        properties: Arc<dyn PropertyRepository>,
        floor_plans: Arc<dyn FloorPlanRepository>,
        max_batch_size: usize,
        retention_days: u32,
    ) -> Self {
        Self {
            readings,
            properties,
            floor_plans,
            max_batch_size,
            retention_days,
        }
    }

    /// Validates and stores a batch of readings in one transaction.
    ///
    /// Readings without `recorded_at` are stamped with the ingestion time.
    /// A reading narrowed to a floor must name a live floor plan of the same
    /// property.
    pub async fn ingest(
        &self,
        request: IngestOccupancyRequest,
        actor: Actor,
    ) -> Result<Vec<OccupancyReading>> {
        check_batch_size("readings", request.readings.len(), self.max_batch_size)?;

        let now = Utc::now();
        let readings: Vec<OccupancyReading> = request
            .readings
            .into_iter()
            .map(|r| r.into_reading(actor.id(), now))
            .collect();

        let mut errors = ValidationErrors::new();
        let mut parents: HashMap<Uuid, ValidationErrors> = HashMap::new();
        for (index, reading) in readings.iter().enumerate() {
            let prefix = format!("readings[{index}]");
            if let Err(reading_errors) = validate_reading(reading, now) {
                errors.extend_prefixed(&prefix, reading_errors);
            }

            if !parents.contains_key(&reading.property_id) {
                let mut parent = ValidationErrors::new();
                check_property(
                    &*self.properties,
                    &mut parent,
                    "property_id",
                    reading.property_id,
                )
                .await?;
                parents.insert(reading.property_id, parent);
            }
            if let Some(parent) = parents.get(&reading.property_id) {
                errors.extend_prefixed(&prefix, parent.clone());
            }

            if let Some(floor_plan_id) = reading.floor_plan_id {
                let plan = self.floor_plans.get_floor_plan(floor_plan_id).await?;
                if let Some(message) = floor_plan_problem(plan.as_ref(), reading.property_id) {
                    errors.push(format!("{prefix}.floor_plan_id"), message);
                }
            }
        }
        errors.into_result()?;

        self.readings.record_readings(&readings).await?;

        tracing::info!(count = readings.len(), "Ingested occupancy readings");
        Ok(readings)
    }

    pub async fn get(&self, id: Uuid) -> Result<OccupancyReading> {
        self.readings
            .get_reading(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("OccupancyReading", id).into())
    }

    pub async fn list(
        &self,
        property_id: Uuid,
        range: TimeRange,
        include_invalidated: bool,
    ) -> Result<Vec<OccupancyReading>> {
        Ok(self
            .readings
            .list_readings(property_id, range, include_invalidated)
            .await?)
    }

    pub async fn latest(&self, property_id: Uuid) -> Result<Option<OccupancyReading>> {
        Ok(self.readings.latest_reading(property_id).await?)
    }

    pub async fn rollup(&self, property_id: Uuid, range: TimeRange) -> Result<Vec<HourlyOccupancy>> {
        Ok(self.readings.hourly_rollup(property_id, range).await?)
    }

    /// Marks a reading invalid. The row stays; it just stops counting.
    pub async fn invalidate(&self, id: Uuid, actor: Actor) -> Result<OccupancyReading> {
        let reading = self.readings.invalidate_reading(id).await?;

        tracing::info!(
            reading_id = %id,
            property_id = %reading.property_id,
            actor = ?actor.id(),
            "Invalidated occupancy reading"
        );
        Ok(reading)
    }

    /// Deletes readings older than the retention window.
    ///
    /// `retention_days` overrides the configured window for this run.
    pub async fn purge_expired(&self, retention_days: Option<u32>) -> Result<RetentionReport> {
        let retention_days = retention_days.unwrap_or(self.retention_days);
        if retention_days == 0 {
            return Err(ValidationErrors::single("retention_days", "must be at least 1").into());
        }

        let cutoff = retention_cutoff(Utc::now(), retention_days)
            .ok_or_else(|| ValidationErrors::single("retention_days", "is too large"))?;
        let outcome = self.readings.purge_readings_before(cutoff).await?;

        tracing::info!(
            %cutoff,
            retention_days,
            deleted = outcome.deleted,
            properties = outcome.property_ids.len(),
            "Purged expired occupancy readings"
        );
        Ok(RetentionReport {
            cutoff,
            retention_days,
            deleted: outcome.deleted,
            property_ids: outcome.property_ids,
        })
    }
}

fn floor_plan_problem(plan: Option<&FloorPlan>, property_id: Uuid) -> Option<&'static str> {
    match plan {
        None => Some("floor plan does not exist"),
        Some(plan) if plan.property_id != property_id => {
            Some("floor plan belongs to another property")
        }
        Some(plan) if plan.is_archived() => Some("floor plan is archived"),
        Some(_) => None,
    }
}
