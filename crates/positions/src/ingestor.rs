//! # Stream Ingestor
//!
//! Keeps a [`PositionStore`] current from the aggregator's position stream.

use std::collections::VecDeque;

use chrono::Utc;
use futures::{Stream, StreamExt, stream};
use realtime::{ChunkStream, PushSource};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::sse::Decoder;
use crate::{Position, PositionEvent, PositionStore, Reconnect};

/// Starts position subscriptions against a push source.
pub struct StreamIngestor<S> {
    source: S,
    reconnect: Reconnect,
}

impl<S: PushSource + 'static> StreamIngestor<S> {
    #[must_use]
    pub fn new(source: S) -> Self {
        Self { source, reconnect: Reconnect::default() }
    }

    #[must_use]
    pub const fn reconnect(mut self, reconnect: Reconnect) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Lazily connect to `{base_url}/realtime/stream`, yielding parsed
    /// positions in arrival order.
    #[must_use]
    pub fn events(self, base_url: &str) -> Events<S> {
        let url = format!("{}/realtime/stream", base_url.trim_end_matches('/'));
        Events {
            source: self.source,
            reconnect: self.reconnect,
            url,
            decoder: Decoder::new(),
            stream: None,
            pending: VecDeque::new(),
            failures: 0,
            reconnecting: false,
        }
    }

    /// Subscribe and apply every received position to `store` until the
    /// returned [`Subscription`] is stopped or dropped.
    #[must_use]
    pub fn start(self, base_url: &str, store: PositionStore) -> Subscription {
        let mut events = self.events(base_url);
        let handle = tokio::spawn(async move {
            while let Some(position) = events.next().await {
                trace!(trip_id = %position.trip_id, "position received");
                store.upsert(position);
            }
        });
        Subscription { handle }
    }
}

/// Restartable sequence of positions read from a push source.
///
/// Connection loss is handled internally according to the [`Reconnect`]
/// policy; the sequence only ends once the policy gives up.
pub struct Events<S> {
    source: S,
    reconnect: Reconnect,
    url: String,
    decoder: Decoder,
    stream: Option<ChunkStream>,
    pending: VecDeque<Position>,
    failures: u32,
    reconnecting: bool,
}

impl<S: PushSource> Events<S> {
    /// Next position, connecting or reconnecting as required.
    pub async fn next(&mut self) -> Option<Position> {
        loop {
            if let Some(position) = self.pending.pop_front() {
                return Some(position);
            }

            let Some(stream) = self.stream.as_mut() else {
                self.connect().await?;
                continue;
            };

            let received = stream.next().await;
            match received {
                Some(Ok(chunk)) => self.decode(&chunk),
                Some(Err(err)) => {
                    warn!(error = %err, url = %self.url, "position stream failed");
                    self.disconnect();
                }
                None => {
                    debug!(url = %self.url, "position stream closed by server");
                    self.disconnect();
                }
            }
        }
    }

    /// Adapt into a [`Stream`].
    pub fn into_stream(self) -> impl Stream<Item = Position> + Send
    where
        S: 'static,
    {
        stream::unfold(self, |mut events| async move {
            events.next().await.map(|position| (position, events))
        })
    }

    async fn connect(&mut self) -> Option<()> {
        loop {
            if self.reconnecting {
                let Some(delay) = self.reconnect.next_delay(self.failures, self.decoder.retry())
                else {
                    warn!(url = %self.url, failures = self.failures, "giving up on position stream");
                    return None;
                };
                self.failures = self.failures.saturating_add(1);
                debug!(url = %self.url, delay_ms = delay.as_millis(), "reconnecting position stream");
                tokio::time::sleep(delay).await;
            }
            self.reconnecting = true;

            match self.source.subscribe(&self.url, self.decoder.last_event_id()).await {
                Ok(stream) => {
                    info!(url = %self.url, "position stream connected");
                    self.failures = 0;
                    self.stream = Some(stream);
                    return Some(());
                }
                Err(err) => {
                    warn!(
                        monotonic_counter.position_stream_errors = 1,
                        error = %err,
                        url = %self.url,
                        "failed to open position stream"
                    );
                }
            }
        }
    }

    fn disconnect(&mut self) {
        self.stream = None;
        self.decoder.reset();
    }

    fn decode(&mut self, chunk: &[u8]) {
        for event in self.decoder.feed(chunk) {
            if !event.is_message() {
                continue;
            }

            match PositionEvent::try_from(event.data.as_str()) {
                Ok(event) => self.pending.push_back(event.into_position(Utc::now().timestamp())),
                Err(err) => {
                    trace!(
                        monotonic_counter.positions_dropped = 1,
                        error = %err,
                        "dropping malformed position event"
                    );
                }
            }
        }
    }
}

/// Handle to a running subscription.
///
/// The connection is closed, and the store no longer mutated, once the
/// handle is stopped or dropped.
#[derive(Debug)]
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Subscription {
    /// Close the connection and wait for the ingest task to wind down.
    pub async fn stop(mut self) {
        self.handle.abort();
        let _ = (&mut self.handle).await;
    }

    /// Whether the subscription ended on its own (reconnect policy exhausted).
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
