//! Request types for the CouchDB API client.
//!
//! This module provides the [`HttpRequest`] type and its builder for the
//! JSON request facade, and [`RawRequest`] for the dispatcher, which passes
//! bodies through as opaque bytes or streams.

use std::collections::HashMap;
use std::fmt;
use std::pin::Pin;

use bytes::Bytes;
use futures::Stream;
use serde::{Serialize, Serializer};

use crate::clients::errors::InvalidHttpRequestError;

/// HTTP methods used by the document database API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// Retrieve a document, view or server resource.
    Get,
    /// Retrieve headers only (e.g. a document's current revision).
    Head,
    /// Create documents or run queries with a body.
    Post,
    /// Create or update a document or database.
    Put,
    /// Remove a document or database.
    Delete,
    /// Copy a document server-side.
    Copy,
}

impl HttpMethod {
    /// Returns the method name as sent on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Copy => "COPY",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single query string value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryValue {
    /// A string value, sent percent-encoded.
    Text(String),
    /// A boolean, sent as `true` or `false`.
    Bool(bool),
    /// An integer.
    Int(i64),
}

impl fmt::Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for QueryValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<i32> for QueryValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

/// Query parameters, kept in insertion order.
///
/// # Example
///
/// ```rust
/// use couch_api::clients::Query;
///
/// let query = Query::new()
///     .param("include_docs", true)
///     .param("limit", 10)
///     .param("startkey", "\"a b\"");
/// assert_eq!(
///     query.to_query_string(),
///     "include_docs=true&limit=10&startkey=%22a%20b%22"
/// );
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Query(Vec<(String, QueryValue)>);

impl Query {
    /// Creates an empty query.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends a parameter.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.0.push((key.into(), value.into()));
        self
    }

    /// Returns `true` when there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the value of the first parameter named `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Serializes the parameters as `key=value&...`, percent-encoding both sides.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        self.0
            .iter()
            .map(|(key, value)| {
                format!(
                    "{}={}",
                    urlencoding::encode(key),
                    urlencoding::encode(&value.to_string())
                )
            })
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl<K: Into<String>, V: Into<QueryValue>> FromIterator<(K, V)> for Query {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// A stream of body chunks forwarded to the server as they arrive.
pub type BodyStream =
    Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send + Sync + 'static>>;

/// The body of a [`RawRequest`].
#[derive(Default)]
pub enum RequestBody {
    /// No body.
    #[default]
    Empty,
    /// A complete body written in one piece.
    Bytes(Bytes),
    /// A chunked body. Can only be sent once.
    Stream(BodyStream),
}

impl RequestBody {
    /// Wraps a chunk stream.
    pub fn stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, std::io::Error>> + Send + Sync + 'static,
    {
        Self::Stream(Box::pin(stream))
    }

    /// Returns `true` for streamed bodies.
    #[must_use]
    pub const fn is_stream(&self) -> bool {
        matches!(self, Self::Stream(_))
    }
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(value))
    }
}

impl From<String> for RequestBody {
    fn from(value: String) -> Self {
        Self::Bytes(Bytes::from(value))
    }
}

impl From<Bytes> for RequestBody {
    fn from(value: Bytes) -> Self {
        Self::Bytes(value)
    }
}

/// A request as handed to the dispatcher: no JSON handling, opaque body.
#[derive(Debug)]
pub struct RawRequest {
    /// The HTTP method.
    pub method: HttpMethod,
    /// The request path; normalized before sending.
    pub path: String,
    /// Query parameters.
    pub query: Option<Query>,
    /// Headers supplied by the caller. These win over configured headers.
    pub headers: HashMap<String, String>,
    /// The request body.
    pub body: RequestBody,
}

impl RawRequest {
    /// Creates a request with no query, headers or body.
    #[must_use]
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            headers: HashMap::new(),
            body: RequestBody::Empty,
        }
    }

    /// Returns the normalized path with the serialized query appended.
    #[must_use]
    pub fn path_and_query(&self) -> String {
        let path = normalize_path(&self.path);
        match &self.query {
            Some(query) if !query.is_empty() => format!("{path}?{}", query.to_query_string()),
            _ => path,
        }
    }
}

/// Normalizes a request path.
///
/// An embedded `http://` or `https://` prefix is removed, runs of slashes
/// collapse to one, and the result always starts with `/`.
///
/// # Example
///
/// ```rust
/// use couch_api::clients::normalize_path;
///
/// assert_eq!(normalize_path("db//doc"), "/db/doc");
/// assert_eq!(normalize_path("http://db/_all_docs"), "/db/_all_docs");
/// assert_eq!(normalize_path(""), "/");
/// ```
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let stripped = ["https://", "http://"]
        .iter()
        .filter_map(|prefix| path.find(prefix).map(|at| (at, prefix.len())))
        .min_by_key(|&(at, _)| at)
        .map_or_else(
            || path.to_string(),
            |(at, len)| format!("{}{}", &path[..at], &path[at + len..]),
        );

    let mut normalized = String::with_capacity(stripped.len() + 1);
    if !stripped.starts_with('/') {
        normalized.push('/');
    }
    for c in stripped.chars() {
        if c == '/' && normalized.ends_with('/') {
            continue;
        }
        normalized.push(c);
    }
    normalized
}

/// Source text of a view or design function embedded in a document body.
///
/// Serializes as the plain source string, which is how design documents
/// store `map`, `reduce` and `validate_doc_update` functions.
///
/// # Example
///
/// ```rust
/// use couch_api::clients::DesignFunction;
/// use serde_json::json;
///
/// let map = DesignFunction::new("function (doc) { emit(doc._id, 1); }");
/// let design = json!({ "views": { "all": { "map": map } } });
/// assert_eq!(design["views"]["all"]["map"], "function (doc) { emit(doc._id, 1); }");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DesignFunction(String);

impl DesignFunction {
    /// Wraps function source text.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }

    /// Returns the source text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.0
    }
}

impl Serialize for DesignFunction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl From<DesignFunction> for serde_json::Value {
    fn from(value: DesignFunction) -> Self {
        Self::String(value.0)
    }
}

/// A JSON request to be sent through [`HttpClient`](crate::clients::HttpClient).
///
/// Use [`HttpRequest::builder`] to construct requests.
///
/// # Example
///
/// ```rust
/// use couch_api::clients::{HttpRequest, HttpMethod};
/// use serde_json::json;
///
/// let request = HttpRequest::builder(HttpMethod::Put, "/albums/bob")
///     .body(json!({"title": "Kaya"}))
///     .header("X-Request-Source", "docs")
///     .build()
///     .unwrap();
/// assert!(request.body.is_some());
/// ```
#[derive(Clone, Debug)]
pub struct HttpRequest {
    /// The HTTP method for this request.
    pub http_method: HttpMethod,
    /// The request path.
    pub path: String,
    /// The JSON body, if any.
    pub body: Option<serde_json::Value>,
    /// Query parameters.
    pub query: Option<Query>,
    /// Additional headers to include in the request.
    pub extra_headers: Option<HashMap<String, String>>,
}

impl HttpRequest {
    /// Creates a new builder for constructing an `HttpRequest`.
    #[must_use]
    pub fn builder(method: HttpMethod, path: impl Into<String>) -> HttpRequestBuilder {
        HttpRequestBuilder::new(method, path)
    }

    /// Validates the request.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidHttpRequestError::BodyNotAllowed`] for a `HEAD`
    /// request with a body.
    pub fn verify(&self) -> Result<(), InvalidHttpRequestError> {
        if self.http_method == HttpMethod::Head && self.body.is_some() {
            return Err(InvalidHttpRequestError::BodyNotAllowed {
                method: self.http_method.to_string(),
            });
        }
        Ok(())
    }
}

/// Builder for constructing [`HttpRequest`] instances.
#[derive(Debug)]
pub struct HttpRequestBuilder {
    http_method: HttpMethod,
    path: String,
    body: Option<serde_json::Value>,
    query: Option<Query>,
    extra_headers: Option<HashMap<String, String>>,
}

impl HttpRequestBuilder {
    fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            http_method: method,
            path: path.into(),
            body: None,
            query: None,
            extra_headers: None,
        }
    }

    /// Sets the JSON body.
    #[must_use]
    pub fn body(mut self, body: impl Into<serde_json::Value>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serializes any `Serialize` value as the JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidHttpRequestError::InvalidBody`] if serialization fails.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, InvalidHttpRequestError> {
        let value = serde_json::to_value(body).map_err(|e| InvalidHttpRequestError::InvalidBody {
            reason: e.to_string(),
        })?;
        self.body = Some(value);
        Ok(self)
    }

    /// Sets all query parameters at once.
    #[must_use]
    pub fn query(mut self, query: Query) -> Self {
        self.query = Some(query);
        self
    }

    /// Adds a single query parameter.
    #[must_use]
    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        let query = self.query.take().unwrap_or_default();
        self.query = Some(query.param(key, value));
        self
    }

    /// Sets all extra headers at once.
    #[must_use]
    pub fn extra_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.extra_headers = Some(headers);
        self
    }

    /// Adds a single extra header.
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Builds the [`HttpRequest`], validating it in the process.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidHttpRequestError`] if the request fails validation.
    pub fn build(self) -> Result<HttpRequest, InvalidHttpRequestError> {
        let request = HttpRequest {
            http_method: self.http_method,
            path: self.path,
            body: self.body,
            query: self.query,
            extra_headers: self.extra_headers,
        };
        request.verify()?;
        Ok(request)
    }
}
