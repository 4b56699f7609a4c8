//! Cached occupancy repository decorator.
//!
//! Wraps an `OccupancyRepository` with cache-aside reads for the latest
//! reading and hourly rollups, and publishes occupancy events for real-time
//! subscribers.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use propdesk_core::cache::{
    occupancy_latest_key, occupancy_rollup_key, property_occupancy_pattern, Cache, CachePubSub,
};
use propdesk_core::domain::{HourlyOccupancy, OccupancyEvent, OccupancyReading};
use propdesk_core::storage::{OccupancyRepository, PurgeOutcome, Result, TimeRange};

use super::LookAside;

/// Cached occupancy repository decorator.
///
/// Raw reading listings are not cached. Every write drops the cached
/// aggregates of the affected properties and then publishes an event.
///
/// # Type Parameters
///
/// * `R` - The underlying repository implementation
/// * `C` - The cache implementation
/// * `P` - The pub/sub implementation for cross-instance event propagation
pub struct CachedOccupancyRepository<R, C, P>
where
    R: OccupancyRepository,
    C: Cache,
    P: CachePubSub,
{
    repository: Arc<R>,
    cache: LookAside<C>,
    pubsub: Arc<P>,
}

impl<R, C, P> CachedOccupancyRepository<R, C, P>
where
    R: OccupancyRepository,
    C: Cache,
    P: CachePubSub,
{
    /// Creates a new cached occupancy repository.
    ///
    /// # Arguments
    ///
    /// * `repository` - The underlying repository to cache
    /// * `cache` - The cache implementation
    /// * `pubsub` - The pub/sub implementation for event propagation
    /// * `ttl` - Time-to-live for cached aggregates
    pub fn new(repository: Arc<R>, cache: Arc<C>, pubsub: Arc<P>, ttl: Duration) -> Self {
        Self {
            repository,
            cache: LookAside::new(cache, ttl),
            pubsub,
        }
    }

    async fn publish(&self, event: OccupancyEvent) {
        let property_id = event.property_id();
        if let Err(err) = self.pubsub.publish(property_id, &event).await {
            tracing::warn!(
                %property_id,
                event_type = event.event_type(),
                error = %err,
                "Failed to publish occupancy event"
            );
        }
    }
}

#[async_trait]
impl<R, C, P> OccupancyRepository for CachedOccupancyRepository<R, C, P>
where
    R: OccupancyRepository + 'static,
    C: Cache + 'static,
    P: CachePubSub + 'static,
{
    async fn get_reading(&self, id: Uuid) -> Result<Option<OccupancyReading>> {
        self.repository.get_reading(id).await
    }

    async fn record_readings(&self, readings: &[OccupancyReading]) -> Result<()> {
        // 1. Persist the whole batch
        self.repository.record_readings(readings).await?;

        let mut by_property: BTreeMap<Uuid, Vec<OccupancyReading>> = BTreeMap::new();
        for reading in readings {
            by_property
                .entry(reading.property_id)
                .or_default()
                .push(reading.clone());
        }

        // 2. Invalidate, then 3. publish, per property
        for (property_id, batch) in by_property {
            self.cache
                .invalidate_pattern(&property_occupancy_pattern(property_id))
                .await;
            self.publish(OccupancyEvent::readings_recorded(property_id, batch))
                .await;
        }

        tracing::debug!(count = readings.len(), "Occupancy readings recorded");
        Ok(())
    }

    async fn list_readings(
        &self,
        property_id: Uuid,
        range: TimeRange,
        include_invalidated: bool,
    ) -> Result<Vec<OccupancyReading>> {
        self.repository
            .list_readings(property_id, range, include_invalidated)
            .await
    }

    async fn latest_reading(&self, property_id: Uuid) -> Result<Option<OccupancyReading>> {
        self.cache
            .record(occupancy_latest_key(property_id), || {
                self.repository.latest_reading(property_id)
            })
            .await
    }

    async fn hourly_rollup(
        &self,
        property_id: Uuid,
        range: TimeRange,
    ) -> Result<Vec<HourlyOccupancy>> {
        self.cache
            .value(occupancy_rollup_key(property_id, &range), || {
                self.repository.hourly_rollup(property_id, range)
            })
            .await
    }

    async fn invalidate_reading(&self, id: Uuid) -> Result<OccupancyReading> {
        let reading = self.repository.invalidate_reading(id).await?;

        self.cache
            .invalidate_pattern(&property_occupancy_pattern(reading.property_id))
            .await;
        self.publish(OccupancyEvent::reading_invalidated(
            reading.property_id,
            reading.id,
        ))
        .await;

        tracing::debug!(reading_id = %id, property_id = %reading.property_id, "Reading invalidated");
        Ok(reading)
    }

    async fn purge_readings_before(&self, cutoff: DateTime<Utc>) -> Result<PurgeOutcome> {
        let outcome = self.repository.purge_readings_before(cutoff).await?;

        for property_id in &outcome.property_ids {
            self.cache
                .invalidate_pattern(&property_occupancy_pattern(*property_id))
                .await;
        }

        tracing::debug!(%cutoff, deleted = outcome.deleted, "Occupancy readings purged");
        Ok(outcome)
    }
}
