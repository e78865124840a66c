//! HTTP client types for talking to a document database server.
//!
//! # Overview
//!
//! The main types in this module are:
//!
//! - [`HttpClient`]: the async client; JSON in, shaped results out
//! - [`HttpRequest`]: a JSON request to be sent through the client
//! - [`RawRequest`]: an opaque-body request for attachment streaming
//! - [`Dispatcher`]: sends one request with retry and failover, reporting
//!   [`DispatchEvent`]s
//! - [`Transport`]: the seam between the dispatcher and the network, with
//!   [`ReqwestTransport`] as the default
//! - [`HttpError`]: the unified error type
//!
//! # Example
//!
//! ```rust,ignore
//! use couch_api::clients::{HttpClient, HttpMethod, HttpRequest};
//! use couch_api::ConnectionConfig;
//!
//! let client = HttpClient::new(ConnectionConfig::default())?;
//!
//! let request = HttpRequest::builder(HttpMethod::Get, "/albums/_changes")
//!     .query_param("since", 0)
//!     .build()?;
//!
//! let reply = client.request(request).await?;
//! ```
//!
//! # Retry Behavior
//!
//! Failures are handled per attempt by the [`Dispatcher`]:
//!
//! - **`ECONNRESET` / `EPIPE`**: retried on the same server while the
//!   server's `retry` budget lasts (a negative budget retries forever)
//! - **`ECONNREFUSED`**: moves to the next alternate server, which brings
//!   its own budget
//! - **Anything else**: returned immediately
//!
//! The default budget is 1, meaning one retry. Configure it with
//! [`ConnectionConfigBuilder::retry`](crate::config::ConnectionConfigBuilder::retry).

mod dispatcher;
mod errors;
mod http_client;
mod http_request;
mod server;
mod transport;

pub use dispatcher::{DispatchEvent, DispatchEvents, Dispatcher};
pub use errors::{
    ErrorCode, HttpError, InvalidHttpRequestError, TransportError, CONNRESET_MESSAGE,
};
pub use http_client::{HttpClient, Reply, SDK_VERSION};
pub use http_request::{
    normalize_path, BodyStream, DesignFunction, HttpMethod, HttpRequest, HttpRequestBuilder,
    Query, QueryValue, RawRequest, RequestBody,
};
pub use transport::{
    ReqwestTransport, ResponseStream, Transport, TransportRequest, TransportResponse,
};
