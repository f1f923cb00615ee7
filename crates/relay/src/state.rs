use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use positions::{Beacon, Position};
use realtime::{Result, bad_request};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

/// How long a trip's latest position is kept after its last beacon.
pub const RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

const CHANNEL_CAPACITY: usize = 1024;

/// Message published to stream subscribers for each accepted beacon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamPayload {
    pub trip_id: String,
    pub lat: f64,
    pub lon: f64,
    pub speed_kph: f64,
    pub ts: i64,
}

#[derive(Debug, Clone)]
struct Entry {
    position: Position,
    stored_at: i64,
}

/// Shared relay state.
#[derive(Debug, Clone)]
pub struct RelayState {
    latest: Arc<DashMap<String, Entry>>,
    tx: broadcast::Sender<String>,
    retention: Duration,
}

impl Default for RelayState {
    fn default() -> Self {
        Self::new(RETENTION)
    }
}

impl RelayState {
    #[must_use]
    pub fn new(retention: Duration) -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { latest: Arc::new(DashMap::new()), tx, retention }
    }

    /// Store the beacon as its trip's latest position and publish it to all
    /// current subscribers. Expired trips are evicted first.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` when the trip id is empty or a coordinate is not
    /// finite.
    #[allow(clippy::cast_possible_truncation)]
    pub fn record(&self, beacon: Beacon) -> Result<StreamPayload> {
        if beacon.trip_id.trim().is_empty() {
            return Err(bad_request!("trip_id is required"));
        }
        if !beacon.lat.is_finite() || !beacon.lon.is_finite() {
            return Err(bad_request!("invalid coordinates for trip {}", beacon.trip_id));
        }

        let now = Utc::now().timestamp();
        let ts = beacon.timestamp.filter(|ts| ts.is_finite()).map_or(now, |ts| ts as i64);
        let payload = StreamPayload {
            trip_id: beacon.trip_id,
            lat: beacon.lat,
            lon: beacon.lon,
            speed_kph: beacon.speed_kph.unwrap_or_default(),
            ts,
        };

        let position = Position {
            trip_id: payload.trip_id.clone(),
            lat: payload.lat,
            lon: payload.lon,
            speed_kph: payload.speed_kph,
            last_seen: ts,
        };
        self.evict(now);
        self.latest.insert(payload.trip_id.clone(), Entry { position, stored_at: now });

        let data = serde_json::to_string(&payload)?;
        if self.tx.send(data).is_err() {
            trace!(trip_id = %payload.trip_id, "no stream subscribers");
        }

        Ok(payload)
    }

    /// Latest retained position per trip, ordered by trip id. Expired entries
    /// are evicted.
    #[must_use]
    pub fn positions(&self) -> Vec<Position> {
        self.evict(Utc::now().timestamp());

        let mut positions =
            self.latest.iter().map(|entry| entry.position.clone()).collect::<Vec<_>>();
        positions.sort_by(|a, b| a.trip_id.cmp(&b.trip_id));
        positions
    }

    fn evict(&self, now: i64) {
        let retention = i64::try_from(self.retention.as_secs()).unwrap_or(i64::MAX);
        let cutoff = now.saturating_sub(retention);
        self.latest.retain(|_, entry| entry.stored_at > cutoff);
    }

    /// Receive every payload published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_latest() {
        let state = RelayState::default();
        state.record(Beacon::new("T1", 1.0, 1.0, 10.0)).expect("should record");
        state.record(Beacon::new("T1", 2.0, 2.0, 20.0)).expect("should record");

        let positions = state.positions();
        assert_eq!(positions.len(), 1);
        assert!((positions[0].lat - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn expired_positions_evicted() {
        let state = RelayState::new(Duration::ZERO);
        state.record(Beacon::new("T1", 1.0, 1.0, 10.0)).expect("should record");
        assert!(state.positions().is_empty());
    }

    #[test]
    fn record_evicts_expired() {
        let state = RelayState::new(Duration::ZERO);
        state.record(Beacon::new("T1", 1.0, 1.0, 10.0)).expect("should record");
        state.record(Beacon::new("T2", 2.0, 2.0, 10.0)).expect("should record");
        state.record(Beacon::new("T3", 3.0, 3.0, 10.0)).expect("should record");

        assert_eq!(state.latest.len(), 1);
        assert!(state.latest.contains_key("T3"));
    }

    #[test]
    fn rejects_blank_trip() {
        let state = RelayState::default();
        assert!(state.record(Beacon::new(" ", 1.0, 1.0, 0.0)).is_err());
        assert!(state.record(Beacon::new("T1", f64::NAN, 1.0, 0.0)).is_err());
    }
}
