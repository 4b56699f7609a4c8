//! Occupancy API operations.

use chrono::{DateTime, Utc};
use propdesk_core::domain::{
    HourlyOccupancy, IngestOccupancyRequest, OccupancyReading, RecordOccupancyRequest,
};
use reqwest::{header, Method};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{handle_response, PropdeskClient};
use crate::error::{ClientError, Result};

const OCCUPANCY_PATH: &str = "/api/v1/occupancy";

/// Window over a property's readings. Missing bounds use the server defaults
/// (the last 24 hours).
#[derive(Debug, Clone, Serialize)]
pub struct ReadingsQuery {
    pub property_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub include_invalidated: bool,
}

impl ReadingsQuery {
    pub fn new(property_id: Uuid) -> Self {
        Self {
            property_id,
            from: None,
            to: None,
            include_invalidated: false,
        }
    }
}

/// Outcome of a retention run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionReport {
    pub cutoff: DateTime<Utc>,
    pub retention_days: u32,
    pub deleted: u64,
    pub property_ids: Vec<Uuid>,
}

#[derive(Serialize)]
struct PropertyParam {
    property_id: Uuid,
}

#[derive(Serialize)]
struct StreamParams {
    property_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_event_id: Option<u64>,
}

impl PropdeskClient {
    /// Ingest a batch of readings.
    pub async fn ingest_readings(
        &self,
        readings: Vec<RecordOccupancyRequest>,
    ) -> Result<Vec<OccupancyReading>> {
        let response = self
            .request(Method::POST, OCCUPANCY_PATH)
            .json(&IngestOccupancyRequest { readings })
            .send()
            .await?;
        handle_response(response).await
    }

    /// Readings of a property inside a window, ordered by time.
    pub async fn list_readings(&self, query: &ReadingsQuery) -> Result<Vec<OccupancyReading>> {
        let response = self
            .request(Method::GET, OCCUPANCY_PATH)
            .query(query)
            .send()
            .await?;
        handle_response(response).await
    }

    /// Most recent counted reading, `None` when the property has none.
    pub async fn latest_reading(&self, property_id: Uuid) -> Result<Option<OccupancyReading>> {
        let response = self
            .request(Method::GET, &format!("{OCCUPANCY_PATH}/latest"))
            .query(&PropertyParam { property_id })
            .send()
            .await?;
        handle_response(response).await
    }

    /// Hourly aggregates of a property's counted readings.
    pub async fn hourly_rollup(&self, query: &ReadingsQuery) -> Result<Vec<HourlyOccupancy>> {
        let response = self
            .request(Method::GET, &format!("{OCCUPANCY_PATH}/rollup"))
            .query(query)
            .send()
            .await?;
        handle_response(response).await
    }

    /// Get reading by ID.
    pub async fn get_reading(&self, id: Uuid) -> Result<OccupancyReading> {
        let response = self
            .request(Method::GET, &format!("{OCCUPANCY_PATH}/{id}"))
            .send()
            .await?;
        handle_response(response).await
    }

    /// Mark a reading invalid. Repeating the call is harmless.
    pub async fn invalidate_reading(&self, id: Uuid) -> Result<OccupancyReading> {
        let response = self
            .request(Method::DELETE, &format!("{OCCUPANCY_PATH}/{id}"))
            .send()
            .await?;
        handle_response(response).await
    }

    /// Purge readings older than the retention window. `retention_days`
    /// overrides the server's configured window for this run.
    pub async fn purge_readings(&self, retention_days: Option<u32>) -> Result<RetentionReport> {
        let mut builder = self.request(Method::POST, &format!("{OCCUPANCY_PATH}/retention"));
        if let Some(days) = retention_days {
            builder = builder.json(&serde_json::json!({ "retention_days": days }));
        }
        handle_response(builder.send().await?).await
    }

    /// Open the SSE endpoint for a property. The response body is the raw
    /// event stream; see [`crate::stream`] for the reconnecting consumer.
    pub async fn open_occupancy_stream(
        &self,
        property_id: Uuid,
        last_event_id: Option<u64>,
    ) -> Result<reqwest::Response> {
        let response = self
            .request(Method::GET, &format!("{OCCUPANCY_PATH}/stream"))
            .query(&StreamParams {
                property_id,
                last_event_id,
            })
            .header(header::ACCEPT, "text/event-stream")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::ServerError {
                status: response.status().as_u16(),
                message: "Failed to connect to SSE endpoint".to_string(),
            });
        }
        Ok(response)
    }
}
