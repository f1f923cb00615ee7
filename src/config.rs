//! Environment configuration, with defaults for local development.

pub fn get_aggregator_url() -> String {
    std::env::var("AGGREGATOR_URL").unwrap_or_else(|_| {
        let default = "http://localhost:8000".to_string();
        tracing::trace!("AGGREGATOR_URL not set, using default: {default}");
        default
    })
}

pub fn get_api_base_url() -> String {
    std::env::var("API_BASE_URL").unwrap_or_else(|_| {
        let default = "http://localhost:3000".to_string();
        tracing::trace!("API_BASE_URL not set, using default: {default}");
        default
    })
}

pub fn get_relay_addr() -> String {
    std::env::var("RELAY_ADDR").unwrap_or_else(|_| {
        let default = "0.0.0.0:8000".to_string();
        tracing::trace!("RELAY_ADDR not set, using default: {default}");
        default
    })
}

/// Look up a configuration key. Known keys always resolve; anything else is
/// read from the environment.
#[must_use]
pub fn get(key: &str) -> Option<String> {
    match key {
        "AGGREGATOR_URL" => Some(get_aggregator_url()),
        "API_BASE_URL" => Some(get_api_base_url()),
        "RELAY_ADDR" => Some(get_relay_addr()),
        _ => std::env::var(key).ok().filter(|value| !value.trim().is_empty()),
    }
}
