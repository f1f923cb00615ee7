use realtime::Error;
use serde::{Deserialize, Serialize};

/// Latest known position of a trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub trip_id: String,
    pub lat: f64,
    pub lon: f64,
    pub speed_kph: f64,

    /// Epoch seconds of the report.
    pub last_seen: i64,
}

/// A position event as pushed by the aggregator stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionEvent {
    pub trip_id: String,
    pub lat: f64,
    pub lon: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_kph: Option<f64>,

    /// Epoch seconds; may be fractional.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<f64>,
}

impl PositionEvent {
    /// Convert into a [`Position`], defaulting a missing speed to 0 and a
    /// missing (or non-finite) timestamp to `received_at`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn into_position(self, received_at: i64) -> Position {
        let last_seen =
            self.ts.filter(|ts| ts.is_finite()).map_or(received_at, |ts| ts.floor() as i64);

        Position {
            trip_id: self.trip_id,
            lat: self.lat,
            lon: self.lon,
            speed_kph: self.speed_kph.unwrap_or_default(),
            last_seen,
        }
    }
}

impl TryFrom<&str> for PositionEvent {
    type Error = Error;

    fn try_from(data: &str) -> Result<Self, Self::Error> {
        Ok(serde_json::from_str(data)?)
    }
}
