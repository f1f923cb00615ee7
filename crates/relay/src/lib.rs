//! # Position Relay
//!
//! Accepts driver beacons, keeps the latest position per trip and fans every
//! beacon out to `text/event-stream` subscribers.

mod handlers;
mod state;

use axum::Router;
use axum::routing::{get, post};

pub use self::handlers::*;
pub use self::state::{RETENTION, RelayState, StreamPayload};

/// Build the relay router.
pub fn router(state: RelayState) -> Router {
    Router::new()
        .route("/realtime/driver/beacon", post(driver_beacon))
        .route("/realtime/positions", get(list_positions))
        .route("/realtime/stream", get(stream))
        .with_state(state)
}
