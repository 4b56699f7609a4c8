//! Reconnecting live occupancy stream.
//!
//! [`watch_occupancy`] keeps one SSE session per property open for as long as
//! the caller polls it:
//!
//! - reconnects with a doubling delay (500 ms up to 30 s), reset once a
//!   connection succeeds
//! - resumes after the last event it delivered, so replays are not duplicated
//! - coalesces bursts of events into one [`OccupancySnapshot`] per debounce
//!   window (250 ms)
//! - pings `/livez` every 30 s while connected; a failed ping drops the
//!   session and reconnects

mod backoff;
mod snapshot;
mod sse;

use std::time::Duration;

use serde::Serialize;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::StreamExt;
use uuid::Uuid;

use crate::client::PropdeskClient;

pub use backoff::Backoff;
pub use snapshot::OccupancySnapshot;
pub use sse::{decode_occupancy, SseFrame, SseParser};

use snapshot::{Debounce, SnapshotState};

/// Tuning for [`watch_occupancy`].
#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// Resume after this event id on the first connection.
    pub last_event_id: Option<u64>,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub debounce: Duration,
    pub ping_interval: Duration,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            last_event_id: None,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            debounce: Duration::from_millis(250),
            ping_interval: Duration::from_secs(30),
        }
    }
}

/// Item produced by [`watch_occupancy`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamUpdate {
    /// A session is open; events after `last_event_id` will follow.
    Connected { property_id: Uuid, last_event_id: u64 },
    /// State after a debounce window closed.
    Snapshot(OccupancySnapshot),
    /// The session ended or could not be opened.
    Disconnected {
        reason: String,
        attempt: u32,
        retry_in_ms: u64,
    },
}

/// Watch live occupancy of a property. The stream never ends on its own;
/// drop it to stop reconnecting.
pub fn watch_occupancy(
    client: PropdeskClient,
    property_id: Uuid,
    options: StreamOptions,
) -> impl futures_core::Stream<Item = StreamUpdate> {
    async_stream::stream! {
        let mut backoff = Backoff::new(options.initial_backoff, options.max_backoff);
        let mut state = SnapshotState::new(property_id, options.last_event_id.unwrap_or(0));

        loop {
            let resume = Some(state.last_event_id()).filter(|id| *id > 0);

            let reason = match client.open_occupancy_stream(property_id, resume).await {
                Ok(response) => {
                    backoff.reset();
                    tracing::info!(%property_id, last_event_id = state.last_event_id(), "Occupancy stream connected");
                    yield StreamUpdate::Connected {
                        property_id,
                        last_event_id: state.last_event_id(),
                    };

                    let mut bytes = response.bytes_stream();
                    let mut parser = SseParser::default();
                    let mut debounce = Debounce::new(options.debounce);
                    let mut ping = tokio::time::interval_at(
                        Instant::now() + options.ping_interval,
                        options.ping_interval,
                    );
                    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

                    let reason = loop {
                        let flush_at = debounce.deadline();

                        tokio::select! {
                            chunk = bytes.next() => match chunk {
                                Some(Ok(chunk)) => {
                                    for frame in parser.push(&chunk) {
                                        match decode_occupancy(&frame) {
                                            Ok((id, event)) => {
                                                if state.apply(id, &event) {
                                                    debounce.mark(Instant::now());
                                                }
                                            }
                                            Err(err) => {
                                                tracing::warn!(%property_id, error = %err, "Skipping malformed event");
                                            }
                                        }
                                    }
                                }
                                Some(Err(err)) => break err.to_string(),
                                None => break "server closed the stream".to_string(),
                            },
                            _ = tokio::time::sleep_until(flush_at.unwrap_or_else(Instant::now)), if flush_at.is_some() => {
                                if debounce.fire(Instant::now()) {
                                    yield StreamUpdate::Snapshot(deliver(&client, &mut state).await);
                                }
                            }
                            _ = ping.tick() => {
                                if let Err(err) = client.livez().await {
                                    break format!("liveness ping failed: {err}");
                                }
                                tracing::trace!(%property_id, "Liveness ping ok");
                            }
                        }
                    };

                    if debounce.flush() {
                        yield StreamUpdate::Snapshot(deliver(&client, &mut state).await);
                    }
                    reason
                }
                Err(err) => err.to_string(),
            };

            let retry_in = backoff.next_delay();
            tracing::warn!(%property_id, %reason, attempt = backoff.attempts(), retry_in_ms = retry_in.as_millis() as u64, "Occupancy stream disconnected");
            yield StreamUpdate::Disconnected {
                reason,
                attempt: backoff.attempts(),
                retry_in_ms: retry_in.as_millis() as u64,
            };
            tokio::time::sleep(retry_in).await;
        }
    }
}

/// Refetch the latest reading when an invalidation removed it, then emit.
async fn deliver(client: &PropdeskClient, state: &mut SnapshotState) -> OccupancySnapshot {
    if state.is_stale() {
        match client.latest_reading(state.property_id()).await {
            Ok(latest) => state.set_latest(latest),
            Err(err) => {
                tracing::warn!(property_id = %state.property_id(), error = %err, "Failed to refetch latest reading");
            }
        }
    }
    state.take()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::convert::Infallible;
    use std::sync::{Arc, Mutex};

    use axum::{
        body::{Body, Bytes},
        extract::{Query, State},
        http::{header, StatusCode},
        response::{IntoResponse, Response},
        routing::get,
        Router,
    };
    use chrono::Utc;
    use propdesk_core::domain::{OccupancyEvent, RecordOccupancyRequest};

    use super::*;

    #[derive(Clone)]
    struct Stub {
        property_id: Uuid,
        resumed_from: Arc<Mutex<Vec<Option<String>>>>,
    }

    fn frame(id: u64, event: &OccupancyEvent) -> String {
        format!(
            "id: {id}\nevent: {}\ndata: {}\n\n",
            event.event_type(),
            serde_json::to_string(event).unwrap()
        )
    }

    fn recorded(property_id: Uuid, count: i64) -> OccupancyEvent {
        OccupancyEvent::readings_recorded(
            property_id,
            vec![RecordOccupancyRequest::new(property_id, count).into_reading(None, Utc::now())],
        )
    }

    /// Sends every event after `last_event_id` up to 3, then closes.
    async fn finite_stream(
        State(stub): State<Stub>,
        Query(params): Query<HashMap<String, String>>,
    ) -> Response {
        let resume = params.get("last_event_id").cloned();
        stub.resumed_from.lock().unwrap().push(resume.clone());

        let after: u64 = resume.and_then(|v| v.parse().ok()).unwrap_or(0);
        let body: String = (after + 1..=3)
            .take(2)
            .map(|id| frame(id, &recorded(stub.property_id, id as i64 * 10)))
            .collect();
        ([(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
    }

    /// Keeps the session open without sending anything.
    async fn idle_stream() -> Response {
        let body = Body::from_stream(tokio_stream::pending::<Result<Bytes, Infallible>>());
        ([(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
    }

    async fn spawn(router: Router) -> PropdeskClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        PropdeskClient::new(format!("http://{addr}"))
    }

    fn fast_options() -> StreamOptions {
        StreamOptions {
            last_event_id: None,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(40),
            debounce: Duration::from_millis(20),
            ping_interval: Duration::from_secs(30),
        }
    }

    async fn next(
        stream: &mut (impl futures_core::Stream<Item = StreamUpdate> + Unpin),
    ) -> StreamUpdate {
        tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("stream stalled")
            .expect("stream ended")
    }

    #[tokio::test]
    async fn test_coalesces_and_resumes_after_reconnect() {
        let property_id = Uuid::new_v4();
        let stub = Stub {
            property_id,
            resumed_from: Arc::new(Mutex::new(Vec::new())),
        };
        let router = Router::new()
            .route("/api/v1/occupancy/stream", get(finite_stream))
            .route("/livez", get(|| async { StatusCode::OK }))
            .with_state(stub.clone());
        let client = spawn(router).await;

        let mut stream = Box::pin(watch_occupancy(client, property_id, fast_options()));

        assert_eq!(
            next(&mut stream).await,
            StreamUpdate::Connected {
                property_id,
                last_event_id: 0
            }
        );
        match next(&mut stream).await {
            StreamUpdate::Snapshot(snapshot) => {
                assert_eq!(snapshot.coalesced, 2);
                assert_eq!(snapshot.last_event_id, 2);
                assert_eq!(snapshot.latest.map(|r| r.occupant_count), Some(20));
            }
            other => panic!("expected snapshot, got {other:?}"),
        }
        assert!(matches!(
            next(&mut stream).await,
            StreamUpdate::Disconnected { attempt: 1, retry_in_ms: 10, .. }
        ));
        assert_eq!(
            next(&mut stream).await,
            StreamUpdate::Connected {
                property_id,
                last_event_id: 2
            }
        );
        match next(&mut stream).await {
            StreamUpdate::Snapshot(snapshot) => {
                assert_eq!(snapshot.coalesced, 1);
                assert_eq!(snapshot.last_event_id, 3);
            }
            other => panic!("expected snapshot, got {other:?}"),
        }
        // Backoff restarted after the successful reconnect.
        assert!(matches!(
            next(&mut stream).await,
            StreamUpdate::Disconnected { attempt: 1, .. }
        ));

        let resumed = stub.resumed_from.lock().unwrap().clone();
        assert_eq!(resumed[0], None);
        assert_eq!(resumed[1].as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_failed_ping_forces_reconnect() {
        let router = Router::new()
            .route("/api/v1/occupancy/stream", get(idle_stream))
            .route(
                "/livez",
                get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
            );
        let client = spawn(router).await;
        let options = StreamOptions {
            ping_interval: Duration::from_millis(50),
            ..fast_options()
        };

        let mut stream = Box::pin(watch_occupancy(client, Uuid::new_v4(), options));

        assert!(matches!(
            next(&mut stream).await,
            StreamUpdate::Connected { .. }
        ));
        match next(&mut stream).await {
            StreamUpdate::Disconnected { reason, .. } => {
                assert!(reason.contains("liveness ping failed"), "{reason}");
            }
            other => panic!("expected disconnect, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_server_backs_off() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = PropdeskClient::new(format!("http://{addr}"));

        let mut stream = Box::pin(watch_occupancy(client, Uuid::new_v4(), fast_options()));

        let delays: Vec<u64> = {
            let mut delays = Vec::new();
            for _ in 0..4 {
                match next(&mut stream).await {
                    StreamUpdate::Disconnected { retry_in_ms, .. } => delays.push(retry_in_ms),
                    other => panic!("expected disconnect, got {other:?}"),
                }
            }
            delays
        };
        assert_eq!(delays, vec![10, 20, 40, 40]);
    }
}
