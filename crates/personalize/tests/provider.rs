#![allow(missing_docs)]
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, anyhow};
use bytes::Bytes;
use http::{Method, Request, Response};
use personalize::Notifier;
use realtime::{Config, HttpRequest};
use serde_json::Value;

pub const BASE_URL: &str = "http://companion.test";

/// An outbound request as seen by the mock.
#[derive(Clone, Debug)]
pub struct Recorded {
    pub method: Method,
    pub uri: String,
    pub body: Bytes,
}

impl Recorded {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("body should be json")
    }
}

/// Responds to `(method, path)` with a canned status and body. Unrouted
/// requests fail at the transport level.
#[derive(Clone, Default)]
pub struct MockProvider {
    routes: Arc<Mutex<HashMap<(Method, String), (u16, String)>>>,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl MockProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn route(self, method: Method, path: &str, status: u16, body: &str) -> Self {
        self.routes.lock().expect("lock").insert((method, path.to_string()), (status, body.to_string()));
        self
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().expect("lock").clone()
    }

    pub fn requests_to(&self, method: &Method, path: &str) -> Vec<Recorded> {
        let uri = format!("{BASE_URL}{path}");
        self.requests().into_iter().filter(|r| &r.method == method && r.uri == uri).collect()
    }
}

impl Config for MockProvider {
    async fn get(&self, key: &str) -> Result<String> {
        match key {
            "API_BASE_URL" => Ok(format!("{BASE_URL}/")),
            _ => Err(anyhow!("unknown config key {key}")),
        }
    }
}

impl HttpRequest for MockProvider {
    async fn fetch(&self, request: Request<Bytes>) -> Result<Response<Bytes>> {
        let (parts, body) = request.into_parts();
        let key = (parts.method.clone(), parts.uri.path().to_string());
        self.requests.lock().expect("lock").push(Recorded {
            method: parts.method,
            uri: parts.uri.to_string(),
            body,
        });

        let route = self.routes.lock().expect("lock").get(&key).cloned();
        let (status, body) = route.ok_or_else(|| anyhow!("connection refused"))?;
        Response::builder().status(status).body(Bytes::from(body)).context("failed to build response")
    }
}

/// Collects confirmations.
#[derive(Clone, Default)]
pub struct MockNotifier {
    messages: Arc<Mutex<Vec<(String, bool)>>>,
}

impl MockNotifier {
    pub fn messages(&self) -> Vec<(String, bool)> {
        self.messages.lock().expect("lock").clone()
    }
}

impl Notifier for MockNotifier {
    fn confirm(&self, message: &str, speak: bool) {
        self.messages.lock().expect("lock").push((message.to_string(), speak));
    }
}
