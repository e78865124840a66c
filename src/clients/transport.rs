//! The transport seam between the dispatcher and the network.
//!
//! A [`Transport`] sends exactly one HTTP attempt and reports either the
//! response head plus a body chunk stream, or a [`TransportError`]. Retry
//! and failover live in the dispatcher, never in a transport.
//!
//! [`ReqwestTransport`] is the default implementation. Tests and embedders
//! can supply their own through
//! [`HttpClient::with_transport`](crate::clients::HttpClient::with_transport).

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;

use crate::clients::errors::{ErrorCode, TransportError};
use crate::clients::http_request::{HttpMethod, RequestBody};
use crate::config::ConnectionConfig;

/// Response body chunks as delivered by a transport.
pub type ResponseStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// One attempt of a request, fully resolved for a specific server.
#[derive(Debug)]
pub struct TransportRequest {
    /// The HTTP method.
    pub method: HttpMethod,
    /// Absolute URL including the normalized path and query string.
    pub url: String,
    /// Final headers. Names are lowercase.
    pub headers: HashMap<String, String>,
    /// The body for this attempt.
    pub body: RequestBody,
}

/// A response whose headers have arrived and whose body is still streaming.
pub struct TransportResponse {
    /// The HTTP status code.
    pub status: u16,
    /// Response headers with lowercase names.
    pub headers: HashMap<String, String>,
    /// The body, chunk by chunk.
    pub body: ResponseStream,
}

impl fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Sends a single request attempt.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends the request and resolves once response headers are available.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when no response was received.
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

/// [`Transport`] backed by a pooled `reqwest` client.
///
/// Connections are kept alive and reused; `max_sockets` from the
/// configuration bounds the idle pool per server.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

// Verify ReqwestTransport is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ReqwestTransport>();
};

impl ReqwestTransport {
    /// Creates a transport for the given configuration.
    ///
    /// # Errors
    ///
    /// Returns the `reqwest` error if the client cannot be created (e.g. TLS
    /// initialization failure).
    pub fn new(config: &ConnectionConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .pool_max_idle_per_host(config.max_sockets())
            .build()?;
        Ok(Self { client })
    }

    /// Wraps an existing `reqwest` client.
    #[must_use]
    pub const fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|e| TransportError::new(ErrorCode::Other("EMETHOD".to_string()), e.to_string()))?;

        let mut builder = self.client.request(method, &request.url);
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Bytes(bytes) => builder.body(bytes),
            RequestBody::Stream(stream) => builder.body(reqwest::Body::wrap_stream(stream)),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&e))?;

        let status = response.status().as_u16();
        let headers = flatten_headers(response.headers());
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| TransportError::from_reqwest(&e)))
            .boxed();

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

/// Collapses a header map to one value per lowercase name; repeats are
/// joined with `", "`.
fn flatten_headers(headers: &reqwest::header::HeaderMap) -> HashMap<String, String> {
    let mut result: HashMap<String, String> = HashMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        result
            .entry(name.as_str().to_lowercase())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};

    #[test]
    fn test_flatten_headers_lowercases_and_joins() {
        let mut headers = HeaderMap::new();
        headers.insert("ETag", HeaderValue::from_static("\"1-abc\""));
        headers.append("Vary", HeaderValue::from_static("Accept"));
        headers.append("Vary", HeaderValue::from_static("Origin"));

        let flat = flatten_headers(&headers);
        assert_eq!(flat.get("etag"), Some(&"\"1-abc\"".to_string()));
        assert_eq!(flat.get("vary"), Some(&"Accept, Origin".to_string()));
    }

    #[test]
    fn test_transport_builds_from_config() {
        let config = ConnectionConfig::builder().max_sockets(4).build().unwrap();
        assert!(ReqwestTransport::new(&config).is_ok());
    }
}
