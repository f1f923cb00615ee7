#![allow(missing_docs)]
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, anyhow};
use bytes::Bytes;
use futures::channel::mpsc::UnboundedReceiver;
use futures::{StreamExt, stream};
use http::{Method, Request, Response};
use realtime::{ChunkStream, HttpRequest, PushSource};

/// Scripted behaviour of one connection attempt.
pub enum Connection {
    /// The connection attempt fails.
    Refused,
    /// The server sends the chunks, then closes the stream.
    Chunks(Vec<Result<Bytes, String>>),
    /// Chunks are forwarded from a test-owned channel.
    Channel(UnboundedReceiver<Bytes>),
}

/// An outbound request as seen by the mock.
#[derive(Clone, Debug)]
pub struct Recorded {
    pub method: Method,
    pub uri: String,
    pub body: Bytes,
}

#[derive(Clone, Default)]
pub struct MockProvider {
    connections: Arc<Mutex<VecDeque<Connection>>>,
    subscriptions: Arc<Mutex<Vec<(String, Option<String>)>>>,
    requests: Arc<Mutex<Vec<Recorded>>>,
    status: u16,
}

impl MockProvider {
    #[must_use]
    pub fn new(connections: Vec<Connection>) -> Self {
        Self {
            connections: Arc::new(Mutex::new(connections.into())),
            status: 200,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn subscriptions(&self) -> Vec<(String, Option<String>)> {
        self.subscriptions.lock().expect("lock").clone()
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().expect("lock").clone()
    }
}

/// Format a JSON payload as a single SSE message.
pub fn message(payload: &str) -> Result<Bytes, String> {
    Ok(Bytes::from(format!("data: {payload}\n\n")))
}

impl PushSource for MockProvider {
    async fn subscribe(&self, url: &str, last_event_id: Option<&str>) -> Result<ChunkStream> {
        self.subscriptions
            .lock()
            .expect("lock")
            .push((url.to_string(), last_event_id.map(ToString::to_string)));

        let next = self.connections.lock().expect("lock").pop_front();
        match next {
            None | Some(Connection::Refused) => Err(anyhow!("connection refused")),
            Some(Connection::Chunks(chunks)) => {
                Ok(stream::iter(chunks.into_iter().map(|chunk| chunk.map_err(|e| anyhow!(e))))
                    .boxed())
            }
            Some(Connection::Channel(rx)) => Ok(rx.map(Ok).boxed()),
        }
    }
}

impl HttpRequest for MockProvider {
    async fn fetch(&self, request: Request<Bytes>) -> Result<Response<Bytes>> {
        let (parts, body) = request.into_parts();
        let recorded = Recorded { method: parts.method, uri: parts.uri.to_string(), body };
        self.requests.lock().expect("lock").push(recorded);
        Response::builder()
            .status(self.status)
            .body(Bytes::from_static(b"{\"ok\":true}"))
            .context("failed to build response")
    }
}
