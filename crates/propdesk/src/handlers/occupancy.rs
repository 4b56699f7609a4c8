//! Occupancy ingestion, queries, retention and the live event stream.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        Response,
    },
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use propdesk_core::domain::{IngestOccupancyRequest, ValidationErrors};
use propdesk_core::storage::TimeRange;

use super::{response, AppError};
use crate::{
    context::RequestContext,
    state::{AppState, StoredEvent},
};

/// Window used when a query gives no `from`.
const DEFAULT_WINDOW_HOURS: i64 = 24;

/// Interval between SSE keep-alive comments.
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Query parameters selecting a property's readings inside a window.
#[derive(Debug, Deserialize)]
pub struct ReadingsQuery {
    pub property_id: Uuid,
    /// Window start (default: 24 hours before `to`)
    pub from: Option<DateTime<Utc>>,
    /// Window end (default: now)
    pub to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub include_invalidated: bool,
}

impl ReadingsQuery {
    fn range(&self) -> Result<TimeRange, ValidationErrors> {
        let to = self.to.unwrap_or_else(Utc::now);
        match self.from {
            Some(from) => TimeRange::new(from, to)
                .map_err(|_| ValidationErrors::single("to", "must be after from")),
            None => TimeRange::last_hours(to, DEFAULT_WINDOW_HOURS)
                .ok_or_else(|| ValidationErrors::single("to", "is out of range")),
        }
    }
}

/// Query parameters naming a single property.
#[derive(Debug, Deserialize)]
pub struct PropertyQuery {
    pub property_id: Uuid,
}

/// POST /api/v1/occupancy
pub async fn ingest_readings(
    State(state): State<AppState>,
    ctx: RequestContext,
    payload: Result<Json<IngestOccupancyRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload?;
    tracing::debug!(request_id = %ctx.request_id, readings = request.readings.len(), "Received occupancy batch");

    let readings = state.occupancy.ingest(request, ctx.actor).await?;
    Ok(response::uncached(StatusCode::CREATED, readings))
}

/// GET /api/v1/occupancy?property_id=&from=&to=
pub async fn list_readings(
    State(state): State<AppState>,
    query: Result<Query<ReadingsQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(query) = query?;
    let range = query.range()?;

    let readings = state
        .occupancy
        .list(query.property_id, range, query.include_invalidated)
        .await?;
    Ok(response::cached(readings, state.cache_ttl_secs))
}

/// GET /api/v1/occupancy/latest?property_id=
///
/// `data` is null when the property has no counted reading.
pub async fn latest_reading(
    State(state): State<AppState>,
    query: Result<Query<PropertyQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(query) = query?;

    let latest = state.occupancy.latest(query.property_id).await?;
    Ok(response::cached(latest, state.cache_ttl_secs))
}

/// GET /api/v1/occupancy/rollup?property_id=&from=&to=
pub async fn hourly_rollup(
    State(state): State<AppState>,
    query: Result<Query<ReadingsQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(query) = query?;
    let range = query.range()?;

    let rollup = state.occupancy.rollup(query.property_id, range).await?;
    Ok(response::cached(rollup, state.cache_ttl_secs))
}

/// GET /api/v1/occupancy/{id}
pub async fn get_reading(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(id) = path?;

    let reading = state.occupancy.get(id).await?;
    Ok(response::cached(reading, state.cache_ttl_secs))
}

/// DELETE /api/v1/occupancy/{id}
pub async fn invalidate_reading(
    State(state): State<AppState>,
    ctx: RequestContext,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(id) = path?;

    let reading = state.occupancy.invalidate(id, ctx.actor).await?;
    Ok(response::uncached(StatusCode::OK, reading))
}

#[derive(Debug, Default, Deserialize)]
struct RetentionRequest {
    retention_days: Option<u32>,
}

/// POST /api/v1/occupancy/retention
///
/// An optional `{ "retention_days": n }` body overrides the configured
/// window for this run.
pub async fn purge_readings(
    State(state): State<AppState>,
    ctx: RequestContext,
    body: Bytes,
) -> Result<Response, AppError> {
    let request: RetentionRequest = if body.iter().all(u8::is_ascii_whitespace) {
        RetentionRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|err| ValidationErrors::single("body", format!("invalid JSON: {err}")))?
    };
    tracing::debug!(request_id = %ctx.request_id, "Received retention request");

    let report = state.occupancy.purge_expired(request.retention_days).await?;
    Ok(response::uncached(StatusCode::OK, report))
}

/// Query parameters for the SSE events endpoint.
#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    /// Property to subscribe to.
    pub property_id: Uuid,
    /// Last event ID received (for reconnection catch-up).
    pub last_event_id: Option<u64>,
}

fn last_event_id_header(headers: &HeaderMap) -> Option<u64> {
    headers
        .get("last-event-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Whether history no longer holds every event after `last_event_id`.
fn has_history_gap(last_event_id: u64, oldest: u64) -> bool {
    last_event_id > 0 && oldest > last_event_id.saturating_add(1)
}

fn to_sse(stored: &StoredEvent) -> Event {
    let data = serde_json::to_string(&stored.event).unwrap_or_default();
    Event::default()
        .id(stored.id.to_string())
        .event(stored.event.event_type())
        .data(data)
}

/// GET /api/v1/occupancy/stream?property_id=&last_event_id=
///
/// Replays history newer than `last_event_id` (or the `Last-Event-ID`
/// header), then streams live events until the client leaves or the server
/// shuts down.
pub async fn occupancy_stream(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<StreamQuery>, QueryRejection>,
) -> Result<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>, AppError> {
    let Query(query) = query?;
    let property_id = query.property_id;
    let last_event_id = query
        .last_event_id
        .or_else(|| last_event_id_header(&headers))
        .unwrap_or(0);

    state.ensure_event_listener(property_id);

    // Subscribe before reading history so nothing falls between the two.
    let mut live_rx = state.subscribe_live();
    let mut shutdown_rx = state.subscribe_shutdown();

    let oldest = state.oldest_event_id();
    if has_history_gap(last_event_id, oldest) {
        tracing::debug!(%property_id, last_event_id, oldest, "Replay starts after a history gap");
    }
    tracing::info!(%property_id, last_event_id, "SSE session started");

    let stream = async_stream::stream! {
        let mut last_sent = last_event_id;

        for stored in state.get_events_since(property_id, last_event_id) {
            last_sent = stored.id;
            yield Ok(to_sse(&stored));
        }

        loop {
            tokio::select! {
                result = live_rx.recv() => {
                    match result {
                        Ok(stored) if stored.property_id == property_id && stored.id > last_sent => {
                            last_sent = stored.id;
                            yield Ok(to_sse(&stored));
                        }
                        Ok(_) => {}
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            tracing::warn!(%property_id, lagged = n, "SSE session lagged, replaying history");
                            for stored in state.get_events_since(property_id, last_sent) {
                                last_sent = stored.id;
                                yield Ok(to_sse(&stored));
                            }
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!(%property_id, "SSE session received shutdown signal");
                    break;
                }
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL)))
}
