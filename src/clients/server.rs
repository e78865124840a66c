//! Server-level endpoints.
//!
//! These wrappers always shape their results the same way, whether or not
//! the connection is in raw mode.

use serde_json::Value;

use crate::clients::errors::HttpError;
use crate::clients::http_client::{Exchange, HttpClient};
use crate::clients::http_request::{HttpMethod, HttpRequest};
use crate::response::{Document, ResponseMeta};

impl HttpClient {
    async fn fetch(&self, request: HttpRequest) -> Result<(ResponseMeta, Value), HttpError> {
        let Exchange { meta, json } = self.exchange(request).await?;
        let json = json.ok_or(HttpError::UnexpectedResponse {
            expected: "a response body",
        })?;
        Ok((meta, json))
    }

    async fn fetch_document(&self, request: HttpRequest) -> Result<Document, HttpError> {
        let (meta, json) = self.fetch(request).await?;
        Ok(Document::new(json, Some(meta)))
    }

    /// Lists all databases (`GET /_all_dbs`).
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::UnexpectedResponse`] if the body is not an array
    /// of names, otherwise as [`request`](Self::request).
    pub async fn databases(&self) -> Result<Vec<String>, HttpError> {
        let request = HttpRequest::builder(HttpMethod::Get, "/_all_dbs").build()?;
        let unexpected = || HttpError::UnexpectedResponse {
            expected: "an array of database names",
        };
        let Value::Array(items) = self.fetch(request).await?.1 else {
            return Err(unexpected());
        };
        items
            .into_iter()
            .map(|item| match item {
                Value::String(name) => Ok(name),
                _ => Err(unexpected()),
            })
            .collect()
    }

    /// Returns the server welcome document (`GET /`).
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn info(&self) -> Result<Document, HttpError> {
        self.fetch_document(HttpRequest::builder(HttpMethod::Get, "/").build()?)
            .await
    }

    /// Returns server statistics (`GET /_stats`).
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn stats(&self) -> Result<Document, HttpError> {
        self.fetch_document(HttpRequest::builder(HttpMethod::Get, "/_stats").build()?)
            .await
    }

    /// Returns the server configuration (`GET /_config`).
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn server_config(&self) -> Result<Document, HttpError> {
        self.fetch_document(HttpRequest::builder(HttpMethod::Get, "/_config").build()?)
            .await
    }

    /// Lists running tasks such as replications and compactions
    /// (`GET /_active_tasks`).
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::UnexpectedResponse`] if the body is not an
    /// array, otherwise as [`request`](Self::request).
    pub async fn active_tasks(&self) -> Result<Vec<Value>, HttpError> {
        let request = HttpRequest::builder(HttpMethod::Get, "/_active_tasks").build()?;
        match self.fetch(request).await?.1 {
            Value::Array(tasks) => Ok(tasks),
            _ => Err(HttpError::UnexpectedResponse {
                expected: "an array of tasks",
            }),
        }
    }

    /// Asks the server for fresh UUIDs (`GET /_uuids`).
    ///
    /// Without a count the server returns one.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::UnexpectedResponse`] if the body has no `uuids`
    /// array, otherwise as [`request`](Self::request).
    pub async fn uuids(&self, count: Option<u32>) -> Result<Vec<String>, HttpError> {
        let mut builder = HttpRequest::builder(HttpMethod::Get, "/_uuids");
        if let Some(count) = count.filter(|&count| count > 0) {
            builder = builder.query_param("count", count);
        }
        let (_, json) = self.fetch(builder.build()?).await?;
        json.get("uuids")
            .and_then(Value::as_array)
            .map(|uuids| {
                uuids
                    .iter()
                    .filter_map(Value::as_str)
                    .map(ToString::to_string)
                    .collect()
            })
            .ok_or(HttpError::UnexpectedResponse {
                expected: "a uuids array",
            })
    }

    /// Triggers a replication (`POST /_replicate`).
    ///
    /// `options` is sent as-is, e.g.
    /// `{"source": "albums", "target": "http://backup:5984/albums"}`.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn replicate(&self, options: Value) -> Result<Document, HttpError> {
        let request = HttpRequest::builder(HttpMethod::Post, "/_replicate")
            .body(options)
            .build()?;
        self.fetch_document(request).await
    }
}
