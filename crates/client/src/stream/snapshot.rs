use std::time::Duration;

use propdesk_core::domain::{OccupancyEvent, OccupancyReading};
use serde::Serialize;
use tokio::time::Instant;
use uuid::Uuid;

/// Live occupancy state of one property, delivered after each debounce window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OccupancySnapshot {
    pub property_id: Uuid,
    /// Id of the newest event folded in. Reconnects resume after it.
    pub last_event_id: u64,
    /// Newest counted reading seen, if known.
    pub latest: Option<OccupancyReading>,
    /// Readings invalidated during the window.
    pub invalidated: Vec<Uuid>,
    /// Number of events coalesced into this snapshot.
    pub coalesced: usize,
}

/// Folds events into the running snapshot.
#[derive(Debug, Clone)]
pub(crate) struct SnapshotState {
    snapshot: OccupancySnapshot,
    stale: bool,
}

impl SnapshotState {
    pub fn new(property_id: Uuid, last_event_id: u64) -> Self {
        Self {
            snapshot: OccupancySnapshot {
                property_id,
                last_event_id,
                latest: None,
                invalidated: Vec::new(),
                coalesced: 0,
            },
            stale: false,
        }
    }

    pub fn property_id(&self) -> Uuid {
        self.snapshot.property_id
    }

    pub fn last_event_id(&self) -> u64 {
        self.snapshot.last_event_id
    }

    /// True when the latest reading was invalidated and must be refetched.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Applies an event. Returns false for duplicates (replayed ids) and
    /// events of other properties.
    pub fn apply(&mut self, id: u64, event: &OccupancyEvent) -> bool {
        if id <= self.snapshot.last_event_id || event.property_id() != self.snapshot.property_id {
            return false;
        }
        self.snapshot.last_event_id = id;
        self.snapshot.coalesced += 1;

        match event {
            OccupancyEvent::ReadingsRecorded { .. } => {
                if let Some(candidate) = event.latest_reading() {
                    let newer = self
                        .snapshot
                        .latest
                        .as_ref()
                        .is_none_or(|current| candidate.recorded_at >= current.recorded_at);
                    if newer {
                        self.snapshot.latest = Some(candidate.clone());
                        self.stale = false;
                    }
                }
            }
            OccupancyEvent::ReadingInvalidated { reading_id, .. } => {
                self.snapshot.invalidated.push(*reading_id);
                if self
                    .snapshot
                    .latest
                    .as_ref()
                    .is_some_and(|r| r.id == *reading_id)
                {
                    self.snapshot.latest = None;
                    self.stale = true;
                }
            }
        }
        true
    }

    /// Replaces the latest reading after a refetch.
    pub fn set_latest(&mut self, latest: Option<OccupancyReading>) {
        self.snapshot.latest = latest;
        self.stale = false;
    }

    /// Emits the snapshot and starts a new window.
    pub fn take(&mut self) -> OccupancySnapshot {
        let snapshot = self.snapshot.clone();
        self.snapshot.invalidated.clear();
        self.snapshot.coalesced = 0;
        snapshot
    }
}

/// Trailing-edge debounce: the first event opens a window, the snapshot is
/// flushed when it closes.
#[derive(Debug, Clone)]
pub(crate) struct Debounce {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    /// Records an event at `now`, opening a window if none is open.
    pub fn mark(&mut self, now: Instant) {
        if self.deadline.is_none() {
            self.deadline = Some(now + self.window);
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Closes the window if it has elapsed at `now`.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(at) if at <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Closes the window unconditionally, reporting whether one was open.
    pub fn flush(&mut self) -> bool {
        self.deadline.take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use propdesk_core::domain::RecordOccupancyRequest;

    fn reading(property_id: Uuid, count: i64, minutes_ago: i64) -> OccupancyReading {
        let now = Utc::now();
        let mut request = RecordOccupancyRequest::new(property_id, count);
        request.recorded_at = Some(now - ChronoDuration::minutes(minutes_ago));
        request.into_reading(None, now)
    }

    #[test]
    fn test_latest_reading_wins_within_window() {
        let property_id = Uuid::new_v4();
        let mut state = SnapshotState::new(property_id, 0);

        state.apply(
            1,
            &OccupancyEvent::readings_recorded(property_id, vec![reading(property_id, 4, 5)]),
        );
        state.apply(
            2,
            &OccupancyEvent::readings_recorded(property_id, vec![reading(property_id, 9, 1)]),
        );
        // Late arrival of an older sample does not replace the newer one.
        state.apply(
            3,
            &OccupancyEvent::readings_recorded(property_id, vec![reading(property_id, 2, 30)]),
        );

        let snapshot = state.take();
        assert_eq!(snapshot.latest.map(|r| r.occupant_count), Some(9));
        assert_eq!(snapshot.last_event_id, 3);
        assert_eq!(snapshot.coalesced, 3);
        assert_eq!(state.take().coalesced, 0);
    }

    #[test]
    fn test_replayed_ids_are_ignored() {
        let property_id = Uuid::new_v4();
        let mut state = SnapshotState::new(property_id, 5);
        let event = OccupancyEvent::readings_recorded(property_id, vec![reading(property_id, 1, 0)]);

        assert!(!state.apply(5, &event));
        assert!(!state.apply(
            6,
            &OccupancyEvent::reading_invalidated(Uuid::new_v4(), Uuid::new_v4())
        ));
        assert!(state.apply(6, &event));
        assert_eq!(state.last_event_id(), 6);
    }

    #[test]
    fn test_invalidating_latest_marks_stale() {
        let property_id = Uuid::new_v4();
        let latest = reading(property_id, 7, 0);
        let mut state = SnapshotState::new(property_id, 0);
        state.apply(
            1,
            &OccupancyEvent::readings_recorded(property_id, vec![latest.clone()]),
        );

        state.apply(
            2,
            &OccupancyEvent::reading_invalidated(property_id, latest.id),
        );

        assert!(state.is_stale());
        state.set_latest(None);
        assert!(!state.is_stale());
        let snapshot = state.take();
        assert_eq!(snapshot.invalidated, vec![latest.id]);
        assert!(snapshot.latest.is_none());
    }

    #[test]
    fn test_debounce_window() {
        let start = Instant::now();
        let window = Duration::from_millis(250);
        let mut debounce = Debounce::new(window);
        assert!(!debounce.fire(start));

        debounce.mark(start);
        debounce.mark(start + Duration::from_millis(100));
        assert_eq!(debounce.deadline(), Some(start + window));

        assert!(!debounce.fire(start + Duration::from_millis(200)));
        assert!(debounce.fire(start + window));
        assert_eq!(debounce.deadline(), None);

        debounce.mark(start + Duration::from_millis(300));
        assert!(debounce.flush());
        assert!(!debounce.flush());
    }
}
