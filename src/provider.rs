use anyhow::{Context, Result, anyhow};
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use http::header::{ACCEPT, CACHE_CONTROL};
use http::{Request, Response};
use realtime::{ChunkStream, Config, HttpRequest, PushSource};
use reqwest::Client;

use crate::config;

/// Host capabilities backed by `reqwest` and the process environment.
#[derive(Clone, Debug)]
pub struct Provider {
    client: Client,
}

impl Provider {
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be initialised.
    pub fn new() -> Result<Self> {
        let client = Client::builder().build().context("building HTTP client")?;
        Ok(Self { client })
    }
}

impl HttpRequest for Provider {
    async fn fetch(&self, request: Request<Bytes>) -> Result<Response<Bytes>> {
        let (parts, body) = request.into_parts();
        let url = parts.uri.to_string();
        tracing::debug!(method = %parts.method, %url, "outbound request");

        let response = self
            .client
            .request(parts.method, &url)
            .headers(parts.headers)
            .body(body)
            .send()
            .await
            .with_context(|| format!("requesting {url}"))?;

        let mut builder = Response::builder().status(response.status());
        if let Some(headers) = builder.headers_mut() {
            headers.extend(response.headers().clone());
        }
        let body = response.bytes().await.with_context(|| format!("reading body from {url}"))?;
        builder.body(body).context("building response")
    }
}

impl PushSource for Provider {
    async fn subscribe(&self, url: &str, last_event_id: Option<&str>) -> Result<ChunkStream> {
        let mut request =
            self.client.get(url).header(ACCEPT, "text/event-stream").header(CACHE_CONTROL, "no-cache");
        if let Some(id) = last_event_id {
            request = request.header("Last-Event-ID", id);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("connecting to {url}"))?
            .error_for_status()
            .with_context(|| format!("connecting to {url}"))?;

        Ok(response.bytes_stream().map_err(|e| anyhow!(e).context("reading event stream")).boxed())
    }
}

impl Config for Provider {
    async fn get(&self, key: &str) -> Result<String> {
        config::get(key).ok_or_else(|| anyhow!("{key} is not set"))
    }
}
