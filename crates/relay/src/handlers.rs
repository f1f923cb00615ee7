use std::convert::Infallible;
use std::time::Duration;

use axum::Json;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, stream};
use positions::{Beacon, Position};
use realtime::HttpError;
use serde_json::{Value, json};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::RelayState;

/// Interval between keep-alive comments on idle streams.
const HEARTBEAT: Duration = Duration::from_secs(15);

/// `POST /realtime/driver/beacon`
///
/// # Errors
///
/// Returns a 400 response when the beacon is invalid.
pub async fn driver_beacon(
    State(state): State<RelayState>, Json(beacon): Json<Beacon>,
) -> Result<Json<Value>, HttpError> {
    let payload = state.record(beacon)?;
    info!(monotonic_counter.beacons_received = 1, trip_id = %payload.trip_id);
    Ok(Json(json!({ "ok": true })))
}

/// `GET /realtime/positions`
pub async fn list_positions(State(state): State<RelayState>) -> Json<Vec<Position>> {
    Json(state.positions())
}

/// `GET /realtime/stream`
pub async fn stream(
    State(state): State<RelayState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = stream::unfold(state.subscribe(), |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(data) => return Some((Ok(Event::default().data(data)), rx)),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "stream subscriber lagging, skipping events");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(events).keep_alive(KeepAlive::new().interval(HEARTBEAT).text("ping"))
}
