//! Request dispatch with retry and multi-server failover.
//!
//! The [`Dispatcher`] sends one logical request and reports its progress
//! as a stream of [`DispatchEvent`]s. It owns the transport-level policy:
//!
//! - Broken pipes and connection resets are retried on the same server
//!   while the active server's retry budget allows it (negative budgets
//!   never run out).
//! - A refused connection moves to the next alternate server, in declared
//!   order, with that server's own retry budget.
//! - Anything else ends the request.
//!
//! # Event Ordering
//!
//! A request produces `Response`, zero or more `Data`, then `End`; or
//! `Error` then `End`. A body error after the response head yields
//! `Response`, `Data`..., `Error`, `End`. `Retry` and `Alternate` may
//! precede either sequence. Failed attempts never emit `Response`.
//!
//! # Example
//!
//! ```rust,ignore
//! use couch_api::clients::{DispatchEvent, HttpMethod, RawRequest};
//!
//! let mut events = client.raw_request(RawRequest::new(HttpMethod::Get, "/db/attachment.png"));
//! while let Some(event) = events.recv().await {
//!     match event {
//!         DispatchEvent::Response(head) => println!("status {}", head.status),
//!         DispatchEvent::Data(chunk) => file.write_all(&chunk)?,
//!         DispatchEvent::Error(e) => eprintln!("{e}"),
//!         DispatchEvent::End => break,
//!         DispatchEvent::Retry | DispatchEvent::Alternate { .. } => {}
//!     }
//! }
//! ```

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;

use crate::clients::errors::TransportError;
use crate::clients::http_client::SDK_VERSION;
use crate::clients::http_request::{RawRequest, RequestBody};
use crate::clients::transport::{Transport, TransportRequest, TransportResponse};
use crate::config::ConnectionConfig;
use crate::response::ResponseMeta;

/// Events buffered ahead of a slow consumer before the dispatch task waits.
const EVENT_BUFFER: usize = 64;

/// Progress notifications for one dispatched request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchEvent {
    /// Response headers and status are available.
    Response(ResponseMeta),
    /// A chunk of the response body.
    Data(Bytes),
    /// The request has finished. Always the last event.
    End,
    /// The request failed. Followed by `End`.
    Error(TransportError),
    /// Another attempt is about to start.
    Retry,
    /// The next attempt targets the alternate server at this index.
    Alternate {
        /// Index into the primary's alternates list.
        server: usize,
    },
}

/// The receiving end of a dispatched request.
///
/// Implements [`Stream`]; [`recv`](Self::recv) is provided for callers that
/// do not want to pull in stream combinators.
#[derive(Debug)]
pub struct DispatchEvents {
    rx: mpsc::Receiver<DispatchEvent>,
}

impl DispatchEvents {
    /// Waits for the next event. Returns `None` after `End` has been received.
    pub async fn recv(&mut self) -> Option<DispatchEvent> {
        self.rx.recv().await
    }
}

impl Stream for DispatchEvents {
    type Item = DispatchEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Sending half of [`DispatchEvents`].
struct EventSender(mpsc::Sender<DispatchEvent>);

impl EventSender {
    async fn emit(&self, event: DispatchEvent) {
        // A dropped receiver does not cancel the request.
        let _ = self.0.send(event).await;
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Retry,
    Failover(usize),
    Fail,
}

/// Mutable state of the dispatch loop.
#[derive(Debug)]
struct DispatchAttempt<'a> {
    /// `None` for the primary, otherwise an index into `primary.alternates()`.
    server: Option<usize>,
    remaining_retries: i32,
    active: &'a ConnectionConfig,
    primary: &'a ConnectionConfig,
}

impl<'a> DispatchAttempt<'a> {
    fn new(primary: &'a ConnectionConfig) -> Self {
        Self {
            server: None,
            remaining_retries: primary.retry(),
            active: primary,
            primary,
        }
    }

    fn decide(&mut self, error: &TransportError) -> Decision {
        if error.is_retryable() && self.remaining_retries != 0 {
            if self.remaining_retries > 0 {
                self.remaining_retries -= 1;
            }
            return Decision::Retry;
        }

        if error.triggers_failover() {
            let next = self.server.map_or(0, |index| index + 1);
            if let Some(alternate) = self.primary.alternates().get(next) {
                self.server = Some(next);
                self.active = alternate;
                self.remaining_retries = alternate.retry();
                return Decision::Failover(next);
            }
        }

        Decision::Fail
    }
}

/// A request body that can be handed out once per attempt.
struct ReplayableBody(Option<RequestBody>);

impl ReplayableBody {
    /// Returns the body for the next attempt, or `None` once a stream has
    /// been consumed.
    fn for_attempt(&mut self) -> Option<RequestBody> {
        match self.0.as_ref()? {
            RequestBody::Empty => Some(RequestBody::Empty),
            RequestBody::Bytes(bytes) => Some(RequestBody::Bytes(bytes.clone())),
            RequestBody::Stream(_) => self.0.take(),
        }
    }

    const fn can_replay(&self) -> bool {
        self.0.is_some()
    }
}

/// Builds the header set for one attempt against `active`.
///
/// Precedence, lowest first: `Host` and `User-Agent`, configured headers,
/// basic auth, call headers. Names are lowercased so collisions resolve
/// regardless of case.
fn attempt_headers(
    active: &ConnectionConfig,
    call_headers: &HashMap<String, String>,
) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    headers.insert("host".to_string(), active.host().to_string());
    headers.insert(
        "user-agent".to_string(),
        format!("couch-api-rust/{SDK_VERSION}"),
    );
    for (key, value) in active.headers() {
        headers.insert(key.to_lowercase(), value.clone());
    }
    if let Some(credentials) = active.credentials() {
        headers.insert("authorization".to_string(), credentials.basic_auth_header());
    }
    for (key, value) in call_headers {
        headers.insert(key.to_lowercase(), value.clone());
    }
    headers
}

/// Sends requests according to a [`ConnectionConfig`] over a [`Transport`].
///
/// Cloning is cheap; clones share the configuration and transport.
#[derive(Clone)]
pub struct Dispatcher {
    config: Arc<ConnectionConfig>,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// Verify Dispatcher is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Dispatcher>();
};

impl Dispatcher {
    /// Creates a dispatcher.
    #[must_use]
    pub fn new(config: ConnectionConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config: Arc::new(config),
            transport,
        }
    }

    /// Returns the primary connection configuration.
    #[must_use]
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Dispatches a request on the Tokio runtime and returns its events.
    ///
    /// The request runs to completion even if the returned
    /// [`DispatchEvents`] is dropped. While it is held, at most a small
    /// number of events are buffered ahead of the consumer.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    #[must_use]
    pub fn dispatch(&self, request: RawRequest) -> DispatchEvents {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let this = self.clone();
        tokio::spawn(async move { this.run(request, EventSender(tx)).await });
        DispatchEvents { rx }
    }

    async fn run(self, request: RawRequest, events: EventSender) {
        let path_and_query = request.path_and_query();
        let method = request.method;
        let mut call_headers: HashMap<String, String> = request
            .headers
            .into_iter()
            .map(|(key, value)| (key.to_lowercase(), value))
            .collect();
        call_headers.insert("connection".to_string(), "keep-alive".to_string());
        if request.body.is_stream() {
            call_headers.insert("transfer-encoding".to_string(), "chunked".to_string());
        }
        let mut body = ReplayableBody(Some(request.body));
        let mut attempt = DispatchAttempt::new(&self.config);

        loop {
            let Some(attempt_body) = body.for_attempt() else {
                // Unreachable: replay is checked before every retry.
                events.emit(DispatchEvent::End).await;
                return;
            };

            let url = format!("{}{}", attempt.active.base_url(), path_and_query);
            tracing::debug!(%method, %url, server = ?attempt.server, "dispatching request");

            let outcome = self
                .transport
                .send(TransportRequest {
                    method,
                    url,
                    headers: attempt_headers(attempt.active, &call_headers),
                    body: attempt_body,
                })
                .await;

            let error = match outcome {
                Ok(response) => {
                    Self::stream_response(response, &events).await;
                    return;
                }
                Err(error) => error.normalized(),
            };

            let decision = attempt.decide(&error);
            if decision != Decision::Fail && !body.can_replay() {
                tracing::warn!(
                    code = %error.code(),
                    "streamed request body cannot be replayed, giving up"
                );
                events.emit(DispatchEvent::Error(error)).await;
                events.emit(DispatchEvent::End).await;
                return;
            }

            match decision {
                Decision::Retry => {
                    tracing::debug!(
                        code = %error.code(),
                        remaining = attempt.remaining_retries,
                        "retrying request on the same server"
                    );
                    events.emit(DispatchEvent::Retry).await;
                }
                Decision::Failover(server) => {
                    tracing::warn!(
                        code = %error.code(),
                        server,
                        host = attempt.active.host(),
                        "server refused connection, failing over to alternate"
                    );
                    events.emit(DispatchEvent::Retry).await;
                    events.emit(DispatchEvent::Alternate { server }).await;
                }
                Decision::Fail => {
                    tracing::debug!(code = %error.code(), "request failed");
                    events.emit(DispatchEvent::Error(error)).await;
                    events.emit(DispatchEvent::End).await;
                    return;
                }
            }
        }
    }

    async fn stream_response(response: TransportResponse, events: &EventSender) {
        let TransportResponse {
            status,
            headers,
            mut body,
        } = response;

        events
            .emit(DispatchEvent::Response(ResponseMeta::new(status, headers)))
            .await;
        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(bytes) => events.emit(DispatchEvent::Data(bytes)).await,
                Err(error) => {
                    events.emit(DispatchEvent::Error(error)).await;
                    break;
                }
            }
        }
        events.emit(DispatchEvent::End).await;
    }
}
