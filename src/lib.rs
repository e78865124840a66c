//! # CouchDB API Rust Client
//!
//! An async client for CouchDB-style document database REST APIs, with
//! retry and multi-server failover built into every request.
//!
//! ## Overview
//!
//! This crate provides:
//! - Type-safe connection settings via [`ConnectionConfig`] and [`ConnectionConfigBuilder`]
//! - A request dispatcher that retries reset connections and fails over to
//!   alternate servers, reporting progress as [`DispatchEvent`]s
//! - Response normalization: documents, view rows, changes feeds, UUID lists
//!   and error bodies each come back as one variant of [`NormalizedResult`]
//! - Streaming request and response bodies for attachments
//!
//! ## Quick Start
//!
//! ```rust
//! use couch_api::{ConnectionConfig, Credentials};
//!
//! let backup = ConnectionConfig::builder()
//!     .host("backup.local")
//!     .retry(3)
//!     .build()
//!     .unwrap();
//!
//! let config = ConnectionConfig::builder()
//!     .host("https://db.local")
//!     .port(6984)
//!     .credentials(Credentials::new("admin", "secret").unwrap())
//!     .alternate(backup)
//!     .build()
//!     .unwrap();
//!
//! assert!(config.secure());
//! assert_eq!(config.base_url(), "https://db.local:6984");
//! ```
//!
//! ## Making Requests
//!
//! ```rust,ignore
//! use couch_api::{ConnectionConfig, HttpClient, HttpMethod, HttpRequest, NormalizedResult, ViewRows};
//!
//! let client = HttpClient::new(ConnectionConfig::from_url("http://localhost:5984")?)?;
//!
//! // Save a document
//! client.put("/albums/bob", serde_json::json!({"title": "Kaya"})).await?;
//!
//! // Query a view
//! let request = HttpRequest::builder(HttpMethod::Get, "/albums/_design/albums/_view/by_title")
//!     .query_param("include_docs", true)
//!     .build()?;
//!
//! if let Some(NormalizedResult::Rows(rows)) = client.request(request).await?.into_normalized() {
//!     for doc in rows.to_array() {
//!         println!("{doc}");
//!     }
//! }
//! ```
//!
//! ## Error Handling
//!
//! Every call returns [`HttpError`]. Transport failures carry an
//! [`ErrorCode`]; server rejections carry an [`ErrorResult`] with the
//! status and the server's `error`/`reason` fields.
//!
//! ## Design Principles
//!
//! - **No global state**: Configuration is instance-based and passed explicitly
//! - **Fail-fast validation**: Configuration is validated on construction
//! - **Thread-safe**: All types are `Send + Sync`
//! - **Async-first**: Designed for use with Tokio async runtime

pub mod clients;
pub mod config;
pub mod error;
pub mod response;
pub mod util;

// Re-export public types at crate root for convenience
pub use config::{ConnectionConfig, ConnectionConfigBuilder, Credentials};
pub use error::ConfigError;

// Re-export HTTP client types
pub use clients::{
    DispatchEvent, DispatchEvents, ErrorCode, HttpClient, HttpError, HttpMethod, HttpRequest,
    HttpRequestBuilder, InvalidHttpRequestError, Query, RawRequest, Reply, RequestBody,
    TransportError,
};

// Re-export response types
pub use response::{
    normalize, ChangesResult, Document, ErrorResult, ListResult, NormalizedResult, ResponseMeta,
    RowsResult, UuidsResult, ViewRows,
};
