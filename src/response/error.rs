//! Application-level error results.

use std::fmt;

use serde_json::Value;

use super::ResponseMeta;

/// An error body returned by the server, such as
/// `{"error": "not_found", "reason": "missing"}`.
///
/// This means the server understood the request and rejected it. Transport
/// failures are reported as [`TransportError`](crate::clients::TransportError)
/// instead.
///
/// # Example
///
/// ```rust
/// use couch_api::response::{normalize, ResponseMeta};
/// use serde_json::json;
/// use std::collections::HashMap;
///
/// let meta = ResponseMeta::new(404, HashMap::new());
/// let result = normalize(json!({"error": "not_found", "reason": "missing"}), Some(&meta));
/// let error = result.as_error().unwrap();
/// assert_eq!(error.status(), 404);
/// assert_eq!(error.to_string(), "not_found: missing");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct ErrorResult {
    payload: Value,
    meta: Option<ResponseMeta>,
}

impl ErrorResult {
    /// Wraps an error payload.
    #[must_use]
    pub const fn new(payload: Value, meta: Option<ResponseMeta>) -> Self {
        Self { payload, meta }
    }

    /// Returns the `error` field, e.g. `"not_found"` or `"conflict"`.
    #[must_use]
    pub fn error(&self) -> &str {
        self.payload
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown_error")
    }

    /// Returns the `reason` field, if present.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.payload.get("reason").and_then(Value::as_str)
    }

    /// Returns the HTTP status, or `0` if no response metadata is attached.
    #[must_use]
    pub const fn status(&self) -> u16 {
        match &self.meta {
            Some(meta) => meta.status,
            None => 0,
        }
    }

    /// Reads any payload field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// Returns the payload exactly as parsed.
    #[must_use]
    pub const fn payload(&self) -> &Value {
        &self.payload
    }

    /// Returns the response metadata.
    #[must_use]
    pub const fn meta(&self) -> Option<&ResponseMeta> {
        self.meta.as_ref()
    }

    /// Returns `true` for `404 Not Found`.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        self.status() == 404
    }

    /// Returns `true` for `409 Conflict` (stale revision).
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        self.status() == 409
    }
}

impl fmt::Display for ErrorResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason() {
            Some(reason) => write!(f, "{}: {reason}", self.error()),
            None => f.write_str(self.error()),
        }
    }
}

impl std::error::Error for ErrorResult {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_error_fields_and_status() {
        let error = ErrorResult::new(
            json!({"error": "conflict", "reason": "Document update conflict."}),
            Some(ResponseMeta::new(409, HashMap::new())),
        );
        assert_eq!(error.error(), "conflict");
        assert_eq!(error.reason(), Some("Document update conflict."));
        assert_eq!(error.status(), 409);
        assert!(error.is_conflict());
        assert!(!error.is_not_found());
    }

    #[test]
    fn test_display_without_reason() {
        let error = ErrorResult::new(json!({"error": "unauthorized"}), None);
        assert_eq!(error.to_string(), "unauthorized");
        assert_eq!(error.status(), 0);
    }

    #[test]
    fn test_non_string_error_field() {
        let error = ErrorResult::new(json!({"error": true, "code": 7}), None);
        assert_eq!(error.error(), "unknown_error");
        assert_eq!(error.get("code"), Some(&json!(7)));
    }

    #[test]
    fn test_implements_std_error() {
        let error = ErrorResult::new(json!({"error": "x"}), None);
        let _: &dyn std::error::Error = &error;
    }
}
