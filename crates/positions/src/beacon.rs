//! # Driver Beacon
//!
//! Producer side of the position stream: a driver (or simulator) reports its
//! location, which the aggregator fans out to stream subscribers.

use anyhow::Context;
use bytes::Bytes;
use http::Method;
use http::header::CONTENT_TYPE;
use realtime::{HttpRequest, Result, bad_gateway};
use serde::{Deserialize, Serialize};

/// A position report from a vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Beacon {
    pub trip_id: String,
    pub lat: f64,
    pub lon: f64,

    #[serde(default)]
    pub speed_kph: Option<f64>,

    /// Epoch seconds; the aggregator stamps its own clock when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
}

impl Beacon {
    #[must_use]
    pub fn new(trip_id: impl Into<String>, lat: f64, lon: f64, speed_kph: f64) -> Self {
        Self { trip_id: trip_id.into(), lat, lon, speed_kph: Some(speed_kph), timestamp: None }
    }
}

/// Post a beacon to `{base_url}/realtime/driver/beacon`.
///
/// # Errors
///
/// Returns an error when the request cannot be built or sent, or when the
/// aggregator responds with a non-success status.
pub async fn send<P: HttpRequest>(provider: &P, base_url: &str, beacon: &Beacon) -> Result<()> {
    let url = format!("{}/realtime/driver/beacon", base_url.trim_end_matches('/'));
    let body = serde_json::to_vec(beacon)?;

    let request = http::Request::builder()
        .method(Method::POST)
        .uri(url)
        .header(CONTENT_TYPE, "application/json")
        .body(Bytes::from(body))
        .context("building beacon request")?;
    let response = provider.fetch(request).await.context("sending beacon")?;

    if !response.status().is_success() {
        return Err(bad_gateway!("beacon rejected with status {}", response.status()));
    }
    Ok(())
}
