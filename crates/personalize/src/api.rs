//! # Companion API
//!
//! Client for the preference, suggestion and transport endpoints. The base
//! URL is read from the `API_BASE_URL` config key.
//!
//! The `fetch_*` functions surface every failure; the `load_*` variants fall
//! back to defaults so a dashboard can start without the remote service.

use anyhow::Context;
use bytes::Bytes;
use http::header::{CACHE_CONTROL, CONTENT_TYPE};
use http::{Method, StatusCode};
use realtime::{Config, HttpRequest, Result, bad_gateway};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::{Preferences, Suggestion};

const PREFERENCES: &str = "/api/preferences";
const SUGGESTIONS: &str = "/api/suggestions";
const TRANSPORT: &str = "/api/transport";

/// A bus or train in the transport snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta_min: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupancy: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Current state of the transport network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportSnapshot {
    #[serde(default)]
    pub buses: Vec<Vehicle>,

    #[serde(default)]
    pub trains: Vec<Vehicle>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Fetch the user's preferences. Weights are clamped to `[0, 100]`.
///
/// # Errors
///
/// Returns an error when the request fails, the service responds with a
/// non-success status, or the body is not a preferences document.
pub async fn fetch_preferences<P>(provider: &P) -> Result<Preferences>
where
    P: Config + HttpRequest,
{
    let body = send(provider, Method::GET, PREFERENCES, None).await?;
    let preferences: Preferences = serde_json::from_slice(&body)?;
    Ok(preferences.clamped())
}

/// Fetch the user's preferences, falling back to defaults on any failure.
pub async fn load_preferences<P>(provider: &P) -> Preferences
where
    P: Config + HttpRequest,
{
    match fetch_preferences(provider).await {
        Ok(preferences) => preferences,
        Err(e) => {
            warn!(monotonic_counter.preference_load_failures = 1, error = %e, "using default preferences");
            Preferences::default()
        }
    }
}

/// Write the user's preferences.
///
/// # Errors
///
/// Returns an error when the request fails or the service responds with a
/// non-success status.
pub async fn save_preferences<P>(provider: &P, preferences: &Preferences) -> Result<()>
where
    P: Config + HttpRequest,
{
    let body = serde_json::to_vec(preferences)?;
    send(provider, Method::PUT, PREFERENCES, Some(body)).await?;
    Ok(())
}

/// Fetch suggestion candidates in server order. Entries that are not valid
/// suggestions are skipped.
///
/// # Errors
///
/// Returns an error when the request fails, the service responds with a
/// non-success status, or the body is not valid JSON.
pub async fn fetch_suggestions<P>(provider: &P) -> Result<Vec<Suggestion>>
where
    P: Config + HttpRequest,
{
    let body = send(provider, Method::GET, SUGGESTIONS, None).await?;
    let Value::Array(entries) = serde_json::from_slice::<Value>(&body)? else {
        debug!("suggestions response is not a list");
        return Ok(Vec::new());
    };

    let suggestions = entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value(entry) {
            Ok(suggestion) => Some(suggestion),
            Err(e) => {
                debug!(monotonic_counter.suggestions_dropped = 1, error = %e, "skipping suggestion");
                None
            }
        })
        .collect();
    Ok(suggestions)
}

/// Fetch suggestion candidates, falling back to none on any failure.
pub async fn load_suggestions<P>(provider: &P) -> Vec<Suggestion>
where
    P: Config + HttpRequest,
{
    match fetch_suggestions(provider).await {
        Ok(suggestions) => suggestions,
        Err(e) => {
            warn!(monotonic_counter.suggestion_load_failures = 1, error = %e, "no suggestions available");
            Vec::new()
        }
    }
}

/// Ask the service to apply a suggestion to the stored preferences.
///
/// # Errors
///
/// Returns an error when the request fails or the service responds with a
/// non-success status.
pub async fn apply_suggestion<P>(provider: &P, suggestion_id: &str) -> Result<Value>
where
    P: Config + HttpRequest,
{
    let body = serde_json::to_vec(&json!({
        "suggestionId": suggestion_id,
        "applyPayload": true,
    }))?;
    let body = send(provider, Method::POST, SUGGESTIONS, Some(body)).await?;
    if body.is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(&body)?)
}

/// Fetch the transport snapshot.
///
/// # Errors
///
/// Returns an error when the request fails, the service responds with a
/// non-success status, or the body is not a transport snapshot.
pub async fn fetch_transport<P>(provider: &P) -> Result<TransportSnapshot>
where
    P: Config + HttpRequest,
{
    let body = send(provider, Method::GET, TRANSPORT, None).await?;
    Ok(serde_json::from_slice(&body)?)
}

async fn send<P>(provider: &P, method: Method, path: &str, body: Option<Vec<u8>>) -> Result<Bytes>
where
    P: Config + HttpRequest,
{
    let base_url = Config::get(provider, "API_BASE_URL").await.context("getting `API_BASE_URL`")?;
    let url = format!("{}{path}", base_url.trim_end_matches('/'));

    let mut builder = http::Request::builder().method(method.clone()).uri(url).header(CACHE_CONTROL, "no-store");
    if body.is_some() {
        builder = builder.header(CONTENT_TYPE, "application/json");
    }
    let request = builder.body(body.map(Bytes::from).unwrap_or_default()).context("building request")?;

    let response =
        HttpRequest::fetch(provider, request).await.with_context(|| format!("{method} {path}"))?;
    let status = response.status();
    let body = response.into_body();

    if !status.is_success() {
        return Err(bad_gateway!("{method} {path} returned {status}: {}", error_message(status, &body)));
    }
    Ok(body)
}

fn error_message(status: StatusCode, body: &[u8]) -> String {
    serde_json::from_slice::<ErrorBody>(body).map_or_else(
        |_| status.canonical_reason().unwrap_or("unknown error").to_string(),
        |body| body.error,
    )
}
