//! Resource-specific error types.
//!
//! Every resource operation reports failures through [`ResourceError`]:
//!
//! - **Transport failure**: [`ResourceError::Transport`] wraps [`HttpError`]
//! - **Server error status**: 404 maps to [`ResourceError::NotFound`], 422 to
//!   [`ResourceError::ValidationFailed`], anything else to
//!   [`ResourceError::Status`] carrying the code and body
//! - **Precondition violation**: [`ResourceError::MissingIdentifier`] and
//!   [`ResourceError::InstanceDeleted`], raised before any request is sent
//! - **Malformed response**: [`ResourceError::MalformedResponse`]
//!
//! None of these are retried.
//!
//! # Example
//!
//! ```rust,ignore
//! use reactive_resource::rest::ResourceError;
//!
//! match user.fetch().await {
//!     Ok(_) => println!("Refreshed {:?}", user.get("name")),
//!     Err(ResourceError::NotFound { resource, id, .. }) => {
//!         println!("{resource}/{id} no longer exists");
//!     }
//!     Err(ResourceError::MissingIdentifier { .. }) => println!("save it first"),
//!     Err(e) => println!("Other error: {e}"),
//! }
//! ```

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;

use crate::clients::HttpError;

/// Error raised when a value cannot be written into an attribute container.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AttributeError {
    /// A sequence container received a value that is not an array.
    #[error("expected an array or null for a sequence attribute, found {found}")]
    SequenceExpected {
        /// The JSON type that was received.
        found: &'static str,
    },
}

/// Error type for resource operations.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The resource was not found (HTTP 404 on a member URL).
    #[error("{resource} with id {id} not found")]
    NotFound {
        /// The resource path (e.g., "users").
        resource: String,
        /// The identifier that was requested.
        id: String,
        /// The decoded response body.
        body: Value,
    },

    /// The server rejected the payload (HTTP 422).
    #[error("Validation failed: {errors:?}")]
    ValidationFailed {
        /// The HTTP status code.
        code: u16,
        /// A map of field names to error messages, parsed from `errors`.
        errors: HashMap<String, Vec<String>>,
        /// The decoded response body.
        body: Value,
        /// The request ID for debugging (from X-Request-Id header).
        request_id: Option<String>,
    },

    /// The server answered with another non-2xx status.
    #[error("{resource} request failed with status {code}: {body}")]
    Status {
        /// The resource path.
        resource: String,
        /// The HTTP status code.
        code: u16,
        /// The decoded response body.
        body: Value,
        /// The request ID for debugging (from X-Request-Id header).
        request_id: Option<String>,
    },

    /// The operation needs an identifier the instance does not have.
    #[error("Cannot {operation} {resource}: instance has no identifier")]
    MissingIdentifier {
        /// The resource path.
        resource: String,
        /// The operation being attempted (e.g., "fetch", "destroy").
        operation: &'static str,
    },

    /// The instance was destroyed on the server.
    #[error("Cannot {operation} {resource} with id {id}: instance was destroyed")]
    InstanceDeleted {
        /// The resource path.
        resource: String,
        /// The identifier of the destroyed record.
        id: String,
        /// The operation being attempted.
        operation: &'static str,
    },

    /// The response did not have the shape the operation requires.
    #[error("Malformed response for {resource}::{operation}: expected {expected}")]
    MalformedResponse {
        /// The resource path.
        resource: String,
        /// The operation that received the response.
        operation: &'static str,
        /// Description of the expected shape.
        expected: &'static str,
    },

    /// A value could not be written into an attribute container.
    #[error("Cannot update attribute '{name}': {source}")]
    Attribute {
        /// The attribute name.
        name: String,
        /// The underlying container error.
        #[source]
        source: AttributeError,
    },

    /// A behavior was called that the resource type does not declare.
    #[error("{resource} has no method named '{name}'")]
    UnknownMember {
        /// The resource path.
        resource: String,
        /// The requested member name.
        name: String,
    },

    /// Query parameters could not be serialized.
    #[error("Failed to serialize query: {0}")]
    Query(#[from] serde_json::Error),

    /// The transport failed before a response was received.
    #[error(transparent)]
    Transport(#[from] HttpError),
}

impl ResourceError {
    /// Creates a `ResourceError` from a non-2xx response.
    ///
    /// Maps HTTP status codes to semantic error variants:
    /// - 404 with an identifier -> `NotFound`
    /// - 422 -> `ValidationFailed` (parsing errors from body)
    /// - Other -> `Status`
    ///
    /// # Example
    ///
    /// ```rust
    /// use reactive_resource::rest::ResourceError;
    /// use serde_json::json;
    ///
    /// let error = ResourceError::from_http_response(
    ///     404,
    ///     &json!({"error": "Not found"}),
    ///     "users",
    ///     Some("abc"),
    ///     Some("req-123"),
    /// );
    /// assert!(matches!(error, ResourceError::NotFound { .. }));
    /// ```
    #[must_use]
    pub fn from_http_response(
        code: u16,
        body: &Value,
        resource: &str,
        id: Option<&str>,
        request_id: Option<&str>,
    ) -> Self {
        match (code, id) {
            (404, Some(id)) => Self::NotFound {
                resource: resource.to_string(),
                id: id.to_string(),
                body: body.clone(),
            },
            (422, _) => Self::ValidationFailed {
                code,
                errors: parse_validation_errors(body),
                body: body.clone(),
                request_id: request_id.map(ToString::to_string),
            },
            _ => Self::Status {
                resource: resource.to_string(),
                code,
                body: body.clone(),
                request_id: request_id.map(ToString::to_string),
            },
        }
    }

    /// Returns the request ID if available.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::ValidationFailed { request_id, .. } | Self::Status { request_id, .. } => {
                request_id.as_deref()
            }
            _ => None,
        }
    }

    /// Returns the HTTP status code for errors built from a response.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::NotFound { .. } => Some(404),
            Self::ValidationFailed { code, .. } | Self::Status { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns the decoded response body for errors built from a response.
    #[must_use]
    pub const fn body(&self) -> Option<&Value> {
        match self {
            Self::NotFound { body, .. }
            | Self::ValidationFailed { body, .. }
            | Self::Status { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Returns `true` for errors raised locally before any request was sent.
    #[must_use]
    pub const fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::MissingIdentifier { .. } | Self::InstanceDeleted { .. }
        )
    }
}

/// Parses validation errors from a response body.
///
/// Accepts `{"errors": {"field": ["msg"]}}`, `{"errors": ["msg"]}` and
/// `{"errors": "msg"}`. Messages without a field are stored under `base`.
fn parse_validation_errors(body: &Value) -> HashMap<String, Vec<String>> {
    let mut result = HashMap::new();

    if let Some(errors) = body.get("errors") {
        match errors {
            Value::Object(map) => {
                for (field, messages) in map {
                    let msgs: Vec<String> = match messages {
                        Value::Array(arr) => arr
                            .iter()
                            .filter_map(|v| v.as_str().map(ToString::to_string))
                            .collect(),
                        Value::String(s) => vec![s.clone()],
                        _ => vec![messages.to_string()],
                    };
                    result.insert(field.clone(), msgs);
                }
            }
            Value::Array(arr) => {
                let msgs: Vec<String> = arr
                    .iter()
                    .filter_map(|v| v.as_str().map(ToString::to_string))
                    .collect();
                if !msgs.is_empty() {
                    result.insert("base".to_string(), msgs);
                }
            }
            Value::String(s) => {
                result.insert("base".to_string(), vec![s.clone()]);
            }
            _ => {}
        }
    }

    result
}

// Verify ResourceError is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ResourceError>();
};
