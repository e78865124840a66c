//! View results and row iteration.

use serde_json::{Map, Value};

use super::ResponseMeta;

/// Returns the value a row contributes: its `doc`, else its `value`, else
/// the row itself. `null` counts as absent.
fn row_value(row: &Value) -> &Value {
    ["doc", "value"]
        .iter()
        .find_map(|key| row.get(key).filter(|v| !v.is_null()))
        .unwrap_or(row)
}

/// Iteration over view rows.
///
/// Every call walks the current rows from the start and materializes its
/// output, so iterating twice is safe.
///
/// # Example
///
/// ```rust
/// use couch_api::response::{normalize, ViewRows};
/// use serde_json::json;
///
/// let result = normalize(json!({"rows": [
///     {"id": "a", "key": "alpha", "value": 1},
///     {"id": "b", "key": "beta", "doc": {"_id": "b"}},
/// ]}), None);
/// let rows = result.as_rows().unwrap();
///
/// let keys = rows.map_rows(|key, _value, _id| key.cloned());
/// assert_eq!(keys, vec![Some(json!("alpha")), Some(json!("beta"))]);
/// assert_eq!(rows.to_array(), vec![json!(1), json!({"_id": "b"})]);
/// ```
pub trait ViewRows {
    /// Returns the raw rows.
    fn rows(&self) -> &[Value];

    /// Calls `f` with each row's value.
    fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&Value),
    {
        for row in self.rows() {
            f(row_value(row));
        }
    }

    /// Calls `f` with each row's `(key, value, id)`.
    fn for_each_row<F>(&self, mut f: F)
    where
        F: FnMut(Option<&Value>, &Value, Option<&Value>),
    {
        for row in self.rows() {
            f(row.get("key"), row_value(row), row.get("id"));
        }
    }

    /// Collects `f` applied to each row's value.
    fn map<T, F>(&self, mut f: F) -> Vec<T>
    where
        F: FnMut(&Value) -> T,
    {
        self.rows().iter().map(|row| f(row_value(row))).collect()
    }

    /// Collects `f` applied to each row's `(key, value, id)`.
    fn map_rows<T, F>(&self, mut f: F) -> Vec<T>
    where
        F: FnMut(Option<&Value>, &Value, Option<&Value>) -> T,
    {
        self.rows()
            .iter()
            .map(|row| f(row.get("key"), row_value(row), row.get("id")))
            .collect()
    }

    /// Returns every row's value.
    fn to_array(&self) -> Vec<Value> {
        self.map(Value::clone)
    }
}

/// The result of a view query: rows plus fields such as `total_rows` and
/// `offset`.
#[derive(Clone, Debug, PartialEq)]
pub struct RowsResult {
    rows: Vec<Value>,
    fields: Map<String, Value>,
    json: Value,
    meta: Option<ResponseMeta>,
}

impl RowsResult {
    /// Builds a view result from a body with a `rows` array.
    #[must_use]
    pub fn new(json: Value, meta: Option<ResponseMeta>) -> Self {
        let mut fields = json.as_object().cloned().unwrap_or_default();
        let rows = match fields.remove("rows") {
            Some(Value::Array(rows)) => rows,
            _ => Vec::new(),
        };
        Self {
            rows,
            fields,
            json,
            meta,
        }
    }

    /// Returns a top-level field other than `rows`.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Returns all top-level fields other than `rows`.
    #[must_use]
    pub const fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Returns `total_rows`, if present.
    #[must_use]
    pub fn total_rows(&self) -> Option<u64> {
        self.field("total_rows").and_then(Value::as_u64)
    }

    /// Returns `offset`, if present.
    #[must_use]
    pub fn offset(&self) -> Option<u64> {
        self.field("offset").and_then(Value::as_u64)
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` when there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterates over the raw rows.
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.rows.iter()
    }

    /// Returns the body exactly as parsed.
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

impl ViewRows for RowsResult {
    fn rows(&self) -> &[Value] {
        &self.rows
    }
}

impl<'a> IntoIterator for &'a RowsResult {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
