//! Normalization of parsed response bodies.
//!
//! The document database answers with several JSON shapes: plain documents,
//! view results with `rows`, changes feeds with `results`, UUID lists and
//! error bodies. [`normalize`] maps each onto one variant of
//! [`NormalizedResult`], attaching the HTTP status and headers as
//! [`ResponseMeta`].
//!
//! # Shape Resolution
//!
//! Checked in order:
//!
//! 1. An object with a truthy `error` field: [`ErrorResult`]
//! 2. An object with a `rows` array: [`RowsResult`]
//! 3. An object with a `results` array: [`ChangesResult`]
//! 4. An object with a `uuids` array: [`UuidsResult`]
//! 5. A top-level array: [`ListResult`]
//! 6. Anything else: [`Document`]
//!
//! # Example
//!
//! ```rust
//! use couch_api::response::{normalize, NormalizedResult, ViewRows};
//! use serde_json::json;
//!
//! let result = normalize(json!({"rows": [{"id": "a", "key": "k", "value": 1}]}), None);
//! let NormalizedResult::Rows(rows) = result else { panic!("expected rows") };
//! assert_eq!(rows.len(), 1);
//! assert_eq!(rows.to_array(), vec![json!(1)]);
//! ```

mod document;
mod error;
mod rows;

pub use document::Document;
pub use error::ErrorResult;
pub use rows::{RowsResult, ViewRows};

use std::collections::HashMap;

use serde_json::{Map, Value};

/// HTTP status and headers of the response a result was built from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseMeta {
    /// The HTTP status code.
    pub status: u16,
    /// Response headers with lowercase names.
    pub headers: HashMap<String, String>,
}

impl ResponseMeta {
    /// Creates response metadata. Header names are lowercased.
    #[must_use]
    pub fn new(status: u16, headers: HashMap<String, String>) -> Self {
        let headers = headers
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v))
            .collect();
        Self { status, headers }
    }

    /// Looks up a header, ignoring case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    /// Returns the `ETag` header without surrounding quotes.
    ///
    /// For documents this is the current revision.
    #[must_use]
    pub fn etag(&self) -> Option<&str> {
        self.header("etag").map(|tag| tag.trim_matches('"'))
    }

    /// Returns `true` for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status <= 299
    }

    /// Renders `{"status": <code>, <header>: <value>, ...}`.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("status".to_string(), Value::from(self.status));
        for (key, value) in &self.headers {
            map.insert(key.clone(), Value::String(value.clone()));
        }
        Value::Object(map)
    }
}

/// A changes feed: ordered change entries plus the feed's high-water mark.
#[derive(Clone, Debug, PartialEq)]
pub struct ChangesResult {
    results: Vec<Value>,
    last_seq: Option<Value>,
    json: Value,
    meta: Option<ResponseMeta>,
}

impl ChangesResult {
    /// Returns the change entries.
    #[must_use]
    pub fn results(&self) -> &[Value] {
        &self.results
    }

    /// Returns `last_seq`, if the feed reported one.
    #[must_use]
    pub const fn last_seq(&self) -> Option<&Value> {
        self.last_seq.as_ref()
    }

    /// Returns the number of change entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns `true` when the feed has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Iterates over the change entries.
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.results.iter()
    }

    /// Returns the full parsed body.
    #[must_use]
    pub const fn json(&self) -> &Value {
        &self.json
    }

    /// Returns the response metadata.
    #[must_use]
    pub const fn meta(&self) -> Option<&ResponseMeta> {
        self.meta.as_ref()
    }
}

/// A list of UUIDs from the `_uuids` endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UuidsResult {
    uuids: Vec<String>,
    meta: Option<ResponseMeta>,
}

impl UuidsResult {
    /// Returns the UUIDs.
    #[must_use]
    pub fn uuids(&self) -> &[String] {
        &self.uuids
    }

    /// Consumes the result, returning the UUIDs.
    #[must_use]
    pub fn into_uuids(self) -> Vec<String> {
        self.uuids
    }

    /// Returns the number of UUIDs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.uuids.len()
    }

    /// Returns `true` when no UUIDs were returned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.uuids.is_empty()
    }

    /// Returns the response metadata.
    #[must_use]
    pub const fn meta(&self) -> Option<&ResponseMeta> {
        self.meta.as_ref()
    }
}

/// A top-level JSON array, e.g. from `_all_dbs`.
#[derive(Clone, Debug, PartialEq)]
pub struct ListResult {
    items: Vec<Value>,
    meta: Option<ResponseMeta>,
}

impl ListResult {
    /// Returns the items.
    #[must_use]
    pub fn items(&self) -> &[Value] {
        &self.items
    }

    /// Consumes the result, returning the items.
    #[must_use]
    pub fn into_items(self) -> Vec<Value> {
        self.items
    }

    /// Returns the number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` when the array is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates over the items.
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }

    /// Returns the response metadata.
    #[must_use]
    pub const fn meta(&self) -> Option<&ResponseMeta> {
        self.meta.as_ref()
    }
}

/// A response body shaped by [`normalize`].
#[derive(Clone, Debug, PartialEq)]
pub enum NormalizedResult {
    /// A single document or other JSON object.
    Document(Document),
    /// A view result.
    Rows(RowsResult),
    /// A changes feed.
    Changes(ChangesResult),
    /// A UUID list.
    Uuids(UuidsResult),
    /// A top-level array.
    List(ListResult),
    /// An application-level error.
    Error(ErrorResult),
}

impl NormalizedResult {
    /// Returns the response metadata, whatever the variant.
    #[must_use]
    pub const fn meta(&self) -> Option<&ResponseMeta> {
        match self {
            Self::Document(r) => r.meta(),
            Self::Rows(r) => r.meta(),
            Self::Changes(r) => r.meta(),
            Self::Uuids(r) => r.meta(),
            Self::List(r) => r.meta(),
            Self::Error(r) => r.meta(),
        }
    }

    /// Returns the HTTP status, if metadata is attached.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.meta().map(|meta| meta.status)
    }

    /// Returns `true` for [`NormalizedResult::Error`].
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Returns the document, if this is one.
    #[must_use]
    pub const fn as_document(&self) -> Option<&Document> {
        match self {
            Self::Document(doc) => Some(doc),
            _ => None,
        }
    }

    /// Returns the view result, if this is one.
    #[must_use]
    pub const fn as_rows(&self) -> Option<&RowsResult> {
        match self {
            Self::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    /// Returns the changes feed, if this is one.
    #[must_use]
    pub const fn as_changes(&self) -> Option<&ChangesResult> {
        match self {
            Self::Changes(changes) => Some(changes),
            _ => None,
        }
    }

    /// Returns the UUID list, if this is one.
    #[must_use]
    pub const fn as_uuids(&self) -> Option<&UuidsResult> {
        match self {
            Self::Uuids(uuids) => Some(uuids),
            _ => None,
        }
    }

    /// Returns the array, if this is one.
    #[must_use]
    pub const fn as_list(&self) -> Option<&ListResult> {
        match self {
            Self::List(list) => Some(list),
            _ => None,
        }
    }

    /// Returns the error, if this is one.
    #[must_use]
    pub const fn as_error(&self) -> Option<&ErrorResult> {
        match self {
            Self::Error(error) => Some(error),
            _ => None,
        }
    }
}

/// Returns `true` if a value counts as set: not `null`, `false`, `0` or `""`.
pub(crate) fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map_or(true, |f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_) | Value::Object(_)) => true,
    }
}

/// Returns `true` if the body is an application-level error.
#[must_use]
pub fn is_error_payload(json: &Value) -> bool {
    is_truthy(json.get("error"))
}

/// Shapes a parsed response body. See the module documentation for the rules.
#[must_use]
pub fn normalize(json: Value, meta: Option<&ResponseMeta>) -> NormalizedResult {
    let meta = meta.cloned();

    if is_error_payload(&json) {
        return NormalizedResult::Error(ErrorResult::new(json, meta));
    }

    let is_array = |key: &str| matches!(json.get(key), Some(Value::Array(_)));
    if json.is_object() && is_array("rows") {
        return NormalizedResult::Rows(RowsResult::new(json, meta));
    }

    if json.is_object() && is_array("results") {
        let results = json
            .get("results")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let last_seq = json.get("last_seq").cloned();
        return NormalizedResult::Changes(ChangesResult {
            results,
            last_seq,
            json,
            meta,
        });
    }

    if json.is_object() && is_array("uuids") {
        let uuids = json
            .get("uuids")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .map(|item| {
                        item.as_str()
                            .map_or_else(|| item.to_string(), ToString::to_string)
                    })
                    .collect()
            })
            .unwrap_or_default();
        return NormalizedResult::Uuids(UuidsResult { uuids, meta });
    }

    match json {
        Value::Array(items) => NormalizedResult::List(ListResult { items, meta }),
        other => NormalizedResult::Document(Document::new(other, meta)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(status: u16) -> ResponseMeta {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("ETag".to_string(), "\"1-abc\"".to_string());
        ResponseMeta::new(status, headers)
    }

    #[test]
    fn test_response_meta_lowercases_and_renders() {
        let meta = meta(201);
        assert_eq!(meta.header("content-type"), Some("application/json"));
        assert_eq!(meta.header("ETAG"), Some("\"1-abc\""));
        assert_eq!(meta.etag(), Some("1-abc"));
        assert!(meta.is_success());

        let rendered = meta.to_json();
        assert_eq!(rendered["status"], 201);
        assert_eq!(rendered["content-type"], "application/json");
    }

    #[test]
    fn test_error_payload_wins_over_every_shape() {
        let result = normalize(
            json!({"error": "not_found", "reason": "missing", "rows": []}),
            Some(&meta(404)),
        );
        let error = result.as_error().unwrap();
        assert_eq!(error.status(), 404);
        assert_eq!(error.error(), "not_found");
    }

    #[test]
    fn test_falsy_error_field_is_not_an_error() {
        let result = normalize(json!({"error": null, "_id": "x"}), None);
        assert!(result.as_document().is_some());
        let result = normalize(json!({"error": false}), None);
        assert!(!result.is_error());
    }

    #[test]
    fn test_rows_shape() {
        let result = normalize(
            json!({"total_rows": 2, "offset": 0, "rows": [{"id": "a", "key": "a", "value": 1}]}),
            Some(&meta(200)),
        );
        let rows = result.as_rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.total_rows(), Some(2));
        assert_eq!(result.status(), Some(200));
    }

    #[test]
    fn test_non_array_rows_is_a_document() {
        let result = normalize(json!({"rows": "nope"}), None);
        assert!(result.as_document().is_some());
    }

    #[test]
    fn test_changes_shape() {
        let result = normalize(
            json!({"results": [{"seq": 1, "id": "a"}, {"seq": 2, "id": "b"}], "last_seq": 2}),
            Some(&meta(200)),
        );
        let changes = result.as_changes().unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes.last_seq(), Some(&json!(2)));
        assert_eq!(changes.results()[1]["id"], "b");
        assert_eq!(changes.json()["last_seq"], 2);
    }

    #[test]
    fn test_rows_take_precedence_over_results() {
        let result = normalize(json!({"rows": [], "results": [1]}), None);
        assert!(result.as_rows().is_some());
    }

    #[test]
    fn test_uuids_shape() {
        let result = normalize(json!({"uuids": ["a1", "b2"]}), Some(&meta(200)));
        let uuids = result.as_uuids().unwrap();
        assert_eq!(uuids.uuids(), ["a1".to_string(), "b2".to_string()]);
        assert_eq!(uuids.meta().unwrap().status, 200);
    }

    #[test]
    fn test_array_shape() {
        let result = normalize(json!(["_users", "albums"]), Some(&meta(200)));
        let list = result.as_list().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list.items()[1], "albums");
        assert_eq!(list.meta().unwrap().status, 200);
    }

    #[test]
    fn test_document_shape_without_meta() {
        let result = normalize(json!({"_id": "x", "_rev": "1-abc"}), None);
        let doc = result.as_document().unwrap();
        assert_eq!(doc.id(), Some("x"));
        assert!(result.meta().is_none());
    }

    #[test]
    fn test_is_truthy() {
        assert!(!is_truthy(None));
        assert!(!is_truthy(Some(&json!(null))));
        assert!(!is_truthy(Some(&json!(""))));
        assert!(!is_truthy(Some(&json!(0))));
        assert!(is_truthy(Some(&json!("x"))));
        assert!(is_truthy(Some(&json!(1))));
        assert!(is_truthy(Some(&json!({}))));
    }
}
