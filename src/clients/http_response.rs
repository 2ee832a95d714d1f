//! HTTP response types.
//!
//! This module provides the [`HttpResponse`] type returned by transports.

use std::collections::HashMap;

/// An HTTP response received by a transport.
///
/// Header names are stored lowercase and may carry multiple values. The
/// body is already decoded: an empty body is `null` and a body that is not
/// JSON is kept as a JSON string.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpResponse {
    /// The HTTP status code.
    pub code: u16,
    /// Response headers (headers may have multiple values).
    pub headers: HashMap<String, Vec<String>>,
    /// The parsed response body.
    pub body: serde_json::Value,
}

impl HttpResponse {
    /// Creates a new `HttpResponse`.
    ///
    /// Header names are normalized to lowercase.
    #[must_use]
    pub fn new(code: u16, headers: HashMap<String, Vec<String>>, body: serde_json::Value) -> Self {
        let headers = headers
            .into_iter()
            .map(|(name, values)| (name.to_lowercase(), values))
            .collect();

        Self {
            code,
            headers,
            body,
        }
    }

    /// Creates a response with no headers.
    #[must_use]
    pub fn with_body(code: u16, body: serde_json::Value) -> Self {
        Self::new(code, HashMap::new(), body)
    }

    /// Returns `true` if the response status code is in the 2xx range.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.code >= 200 && self.code <= 299
    }

    /// Returns the `X-Request-Id` header value, if present.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.headers
            .get("x-request-id")
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_ok_for_2xx_range() {
        assert!(HttpResponse::with_body(200, json!({})).is_ok());
        assert!(HttpResponse::with_body(204, json!(null)).is_ok());
        assert!(!HttpResponse::with_body(199, json!(null)).is_ok());
        assert!(!HttpResponse::with_body(404, json!({})).is_ok());
        assert!(!HttpResponse::with_body(500, json!({})).is_ok());
    }

    #[test]
    fn test_request_id_reads_lowercased_header() {
        let mut headers = HashMap::new();
        headers.insert("X-Request-Id".to_string(), vec!["req-1".to_string()]);
        let response = HttpResponse::new(200, headers, json!({}));

        assert_eq!(response.request_id(), Some("req-1"));
        assert!(response.headers.contains_key("x-request-id"));
    }

    #[test]
    fn test_request_id_absent() {
        let response = HttpResponse::with_body(200, json!({}));
        assert_eq!(response.request_id(), None);
    }
}
