//! Single-document results.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use super::{is_truthy, ResponseMeta};

/// Which field pair holds a document's identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum IdentityFields {
    /// `id` and `rev`, as returned by writes.
    Plain,
    /// `_id` and `_rev`, as stored in the document.
    Underscored,
}

/// A JSON object returned by the server, usually a document or a write
/// confirmation such as `{"ok": true, "id": "x", "rev": "1-abc"}`.
///
/// # Identity Aliases
///
/// If the object carries both `id` and `rev`, then `_id` and `_rev` read
/// the same values; if it carries `_id` and `_rev` instead, `id` and `rev`
/// read those. The aliases are resolved on every read from the stored
/// fields, so they cannot drift apart.
///
/// # Response Metadata
///
/// The HTTP status and headers live in [`meta`](Self::meta), separate from
/// the payload. A payload field named `headers` stays readable through
/// [`get`](Self::get).
///
/// # Example
///
/// ```rust
/// use couch_api::response::{normalize, NormalizedResult};
/// use serde_json::json;
///
/// let NormalizedResult::Document(doc) = normalize(json!({"_id": "x", "_rev": "1-abc"}), None) else {
///     panic!("expected a document");
/// };
/// assert_eq!(doc.get("id"), Some(&json!("x")));
/// assert_eq!(doc.rev(), Some("1-abc"));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    fields: Map<String, Value>,
    json: Value,
    meta: Option<ResponseMeta>,
}

impl Document {
    /// Builds a document from a parsed body.
    ///
    /// Non-object bodies produce an empty field set; the value stays
    /// available through [`json`](Self::json).
    #[must_use]
    pub fn new(json: Value, meta: Option<ResponseMeta>) -> Self {
        let fields = json.as_object().cloned().unwrap_or_default();
        Self { fields, json, meta }
    }

    fn identity_fields(&self) -> Option<IdentityFields> {
        if is_truthy(self.fields.get("id")) && is_truthy(self.fields.get("rev")) {
            Some(IdentityFields::Plain)
        } else if is_truthy(self.fields.get("_id")) && is_truthy(self.fields.get("_rev")) {
            Some(IdentityFields::Underscored)
        } else {
            None
        }
    }

    /// Maps an alias to the stored field it reads from.
    fn source_key<'k>(&self, key: &'k str) -> &'k str {
        match (key, self.identity_fields()) {
            ("_id", Some(IdentityFields::Plain)) => "id",
            ("_rev", Some(IdentityFields::Plain)) => "rev",
            ("id", Some(IdentityFields::Underscored)) => "_id",
            ("rev", Some(IdentityFields::Underscored)) => "_rev",
            _ => key,
        }
    }

    /// Reads a field, resolving the `id`/`rev` and `_id`/`_rev` aliases.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(self.source_key(key))
    }

    /// Returns the document id from whichever identity pair is present.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.get("id").and_then(Value::as_str)
    }

    /// Returns the revision from whichever identity pair is present.
    #[must_use]
    pub fn rev(&self) -> Option<&str> {
        self.get("rev").and_then(Value::as_str)
    }

    /// Returns `true` if the field or one of its aliases is readable.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Sets a field, returning the previous value.
    ///
    /// Writing an alias updates the stored field behind it, so `insert("rev", ..)`
    /// on a document with `_id`/`_rev` replaces `_rev`. Aliases follow
    /// automatically: after updating `_rev`, `rev` reads the new value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        let key = key.into();
        let source = self.source_key(&key).to_string();
        self.fields.insert(source, value)
    }

    /// Returns the stored fields, without aliases.
    #[must_use]
    pub const fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Consumes the document, returning the stored fields.
    #[must_use]
    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
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

    /// Deserializes the stored fields into a typed value.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the fields do not match `T`.
    pub fn deserialize<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.fields.clone()))
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Value::Object(self.fields.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_underscored_pair_exposes_plain_aliases() {
        let doc = Document::new(json!({"_id": "x", "_rev": "1-abc"}), None);

        assert_eq!(doc.get("_id"), Some(&json!("x")));
        assert_eq!(doc.get("_rev"), Some(&json!("1-abc")));
        assert_eq!(doc.get("id"), Some(&json!("x")));
        assert_eq!(doc.get("rev"), Some(&json!("1-abc")));
        assert_eq!(doc.id(), Some("x"));
        assert_eq!(doc.rev(), Some("1-abc"));
    }

    #[test]
    fn test_plain_pair_exposes_underscored_aliases() {
        let doc = Document::new(json!({"ok": true, "id": "y", "rev": "2-def"}), None);

        assert_eq!(doc.get("_id"), Some(&json!("y")));
        assert_eq!(doc.get("_rev"), Some(&json!("2-def")));
        assert!(!doc.fields().contains_key("_id"));
    }

    #[test]
    fn test_aliases_follow_updates() {
        let mut doc = Document::new(json!({"_id": "x", "_rev": "1-abc"}), None);

        doc.insert("_rev", json!("2-bcd"));

        assert_eq!(doc.rev(), Some("2-bcd"));
        assert_eq!(doc.get("_rev"), doc.get("rev"));
    }

    #[test]
    fn test_writing_an_alias_updates_its_source_field() {
        let mut doc = Document::new(json!({"_id": "x", "_rev": "1-abc"}), None);

        assert_eq!(doc.insert("id", json!("other")), Some(json!("x")));
        assert_eq!(doc.insert("rev", json!("9-zzz")), Some(json!("1-abc")));

        assert_eq!(doc.get("_id"), Some(&json!("other")));
        assert_eq!(doc.get("id"), doc.get("_id"));
        assert_eq!(doc.get("rev"), doc.get("_rev"));
        assert_eq!(
            serde_json::to_value(&doc).unwrap(),
            json!({"_id": "other", "_rev": "9-zzz"})
        );
    }

    #[test]
    fn test_writing_an_underscored_alias_updates_plain_pair() {
        let mut doc = Document::new(json!({"ok": true, "id": "y", "rev": "2-def"}), None);

        doc.insert("_rev", json!("3-fed"));

        assert_eq!(doc.rev(), Some("3-fed"));
        assert!(!doc.fields().contains_key("_rev"));
    }

    #[test]
    fn test_incomplete_pair_has_no_aliases() {
        let doc = Document::new(json!({"_id": "x"}), None);

        assert_eq!(doc.id(), None);
        assert!(!doc.contains_key("id"));
        assert!(doc.contains_key("_id"));
    }

    #[test]
    fn test_payload_headers_field_survives_alongside_meta() {
        let mut headers = HashMap::new();
        headers.insert("etag".to_string(), "\"1-abc\"".to_string());
        let meta = ResponseMeta::new(200, headers);

        let doc = Document::new(
            json!({"_id": "mail", "_rev": "1-abc", "headers": {"subject": "hi"}}),
            Some(meta),
        );

        assert_eq!(doc.get("headers"), Some(&json!({"subject": "hi"})));
        assert_eq!(doc.meta().unwrap().status, 200);
        assert_eq!(doc.meta().unwrap().etag(), Some("1-abc"));
    }

    #[test]
    fn test_serializes_stored_fields_only() {
        let doc = Document::new(json!({"_id": "x", "_rev": "1-abc", "n": 1}), None);
        let value = serde_json::to_value(&doc).unwrap();

        assert_eq!(value, json!({"_id": "x", "_rev": "1-abc", "n": 1}));
        assert_eq!(doc.to_string(), value.to_string());
    }

    #[test]
    fn test_non_object_body() {
        let doc = Document::new(json!(true), None);
        assert!(doc.fields().is_empty());
        assert_eq!(doc.json(), &json!(true));
    }

    #[test]
    fn test_deserialize_into_struct() {
        #[derive(serde::Deserialize)]
        struct Album {
            title: String,
        }

        let doc = Document::new(json!({"_id": "a", "title": "Kaya"}), None);
        let album: Album = doc.deserialize().unwrap();
        assert_eq!(album.title, "Kaya");
    }
}
