//! # Provider
//!
//! Provider defines external data interfaces for the crate.

use anyhow::Result;
use bytes::Bytes;
use futures::stream::BoxStream;
use http::{Request, Response};

/// The `HttpRequest` trait defines the behavior for fetching data from a source.
pub trait HttpRequest: Send + Sync {
    /// Make outbound HTTP request.
    fn fetch(&self, request: Request<Bytes>) -> impl Future<Output = Result<Response<Bytes>>> + Send;
}

/// The `Config` trait is used by implementers to provide configuration from
/// the host to dependent crates.
pub trait Config: Send + Sync {
    /// Request configuration setting.
    fn get(&self, key: &str) -> impl Future<Output = Result<String>> + Send;
}

/// Raw body chunks of a long-lived server-push response.
pub type ChunkStream = BoxStream<'static, Result<Bytes>>;

/// The `PushSource` trait opens a unidirectional server-push connection.
///
/// Each call opens a fresh connection; dropping the returned stream closes it.
pub trait PushSource: Send + Sync {
    /// Open a `text/event-stream` connection to `url`, resuming after
    /// `last_event_id` when the server supports it.
    fn subscribe(
        &self, url: &str, last_event_id: Option<&str>,
    ) -> impl Future<Output = Result<ChunkStream>> + Send;
}
