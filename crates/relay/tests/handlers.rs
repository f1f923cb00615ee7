#![allow(missing_docs)]

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use http::StatusCode;
use positions::{Beacon, PositionEvent};
use pretty_assertions::assert_eq;
use relay::{RelayState, StreamPayload, driver_beacon, list_positions};
use serde_json::json;

// Should store the beacon and publish it to stream subscribers.
#[tokio::test]
async fn beacon_published() {
    let state = RelayState::default();
    let mut rx = state.subscribe();

    let beacon = Beacon { timestamp: Some(1_700_000_000.0), ..Beacon::new("T1", 6.8, 79.9, 40.0) };
    let Json(reply) =
        driver_beacon(State(state.clone()), Json(beacon)).await.expect("should accept beacon");
    assert_eq!(reply, json!({"ok": true}));

    let data = rx.recv().await.expect("should publish");
    let payload: StreamPayload = serde_json::from_str(&data).expect("should deserialize");
    assert_eq!(
        payload,
        StreamPayload {
            trip_id: "T1".to_string(),
            lat: 6.8,
            lon: 79.9,
            speed_kph: 40.0,
            ts: 1_700_000_000
        }
    );

    // the published payload is what the ingestor consumes
    let event = PositionEvent::try_from(data.as_str()).expect("should parse");
    assert_eq!(event.into_position(0).last_seen, 1_700_000_000);
}

// Should list the latest position of every trip.
#[tokio::test]
async fn positions_listed() {
    let state = RelayState::default();
    for beacon in [
        Beacon::new("T2", 1.0, 1.0, 0.0),
        Beacon::new("T1", 2.0, 2.0, 0.0),
        Beacon { speed_kph: None, ..Beacon::new("T1", 3.0, 3.0, 0.0) },
    ] {
        driver_beacon(State(state.clone()), Json(beacon)).await.expect("should accept beacon");
    }

    let Json(positions) = list_positions(State(state)).await;
    assert_eq!(positions.len(), 2);
    assert_eq!(positions[0].trip_id, "T1");
    assert!((positions[0].lat - 3.0).abs() < f64::EPSILON);
    assert!(positions[0].speed_kph.abs() < f64::EPSILON);
    assert_eq!(positions[1].trip_id, "T2");
}

// Should reject a beacon without a trip id.
#[tokio::test]
async fn blank_trip_rejected() {
    let state = RelayState::default();
    let Err(err) = driver_beacon(State(state.clone()), Json(Beacon::new("", 1.0, 1.0, 0.0))).await
    else {
        panic!("should reject beacon");
    };

    assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    assert!(state.positions().is_empty());
}
