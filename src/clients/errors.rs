//! Transport error types.
//!
//! This module contains the errors a [`Transport`](crate::clients::Transport)
//! can produce. Server error statuses are not transport errors: transports
//! return every response they receive, and the resource layer maps non-2xx
//! statuses to [`ResourceError`](crate::rest::ResourceError) variants.
//!
//! - [`InvalidHttpRequestError`]: A request failed validation before sending
//! - [`HttpError`]: Unified error type for everything that prevented a response
//!
//! # Example
//!
//! ```rust,ignore
//! use reactive_resource::clients::{HttpError, Transport};
//!
//! match transport.send(request).await {
//!     Ok(response) => println!("Status {}", response.code),
//!     Err(HttpError::InvalidRequest(e)) => println!("Invalid request: {e}"),
//!     Err(HttpError::Network(e)) => println!("Network error: {e}"),
//!     Err(HttpError::Connection { message }) => println!("Unavailable: {message}"),
//! }
//! ```

use thiserror::Error;

/// Error returned when an HTTP request fails validation.
///
/// This error is raised before a request is sent, for example when a
/// `POST` has no body or a `GET` carries one.
///
/// # Example
///
/// ```rust
/// use reactive_resource::clients::InvalidHttpRequestError;
///
/// let error = InvalidHttpRequestError::MissingBody {
///     method: "post".to_string(),
/// };
///
/// assert_eq!(error.to_string(), "Cannot use post without specifying data.");
/// ```
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidHttpRequestError {
    /// A POST, PUT or PATCH request was made without a body.
    #[error("Cannot use {method} without specifying data.")]
    MissingBody {
        /// The HTTP method that requires a body.
        method: String,
    },

    /// A GET or DELETE request carried a body.
    #[error("Cannot send a body with {method}; use query parameters instead.")]
    UnexpectedBody {
        /// The HTTP method that does not accept a body.
        method: String,
    },
}

/// Unified error type for transport failures.
///
/// Every variant means no usable response was received.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Request validation failed.
    #[error(transparent)]
    InvalidRequest(#[from] InvalidHttpRequestError),

    /// Network or connection error raised by the HTTP client.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The transport could not reach the backend for another reason.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the failure.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_request_error_missing_body() {
        let error = InvalidHttpRequestError::MissingBody {
            method: "put".to_string(),
        };
        assert_eq!(error.to_string(), "Cannot use put without specifying data.");
    }

    #[test]
    fn test_invalid_request_error_unexpected_body() {
        let error = InvalidHttpRequestError::UnexpectedBody {
            method: "get".to_string(),
        };
        assert!(error.to_string().contains("query parameters"));
    }

    #[test]
    fn test_connection_error_message() {
        let error = HttpError::Connection {
            message: "refused".to_string(),
        };
        assert_eq!(error.to_string(), "Connection failed: refused");
    }

    #[test]
    fn test_from_invalid_request_conversion() {
        let error: HttpError = InvalidHttpRequestError::MissingBody {
            method: "post".to_string(),
        }
        .into();
        assert!(matches!(error, HttpError::InvalidRequest(_)));
    }

    #[test]
    fn test_error_types_implement_std_error() {
        let invalid: &dyn std::error::Error = &InvalidHttpRequestError::UnexpectedBody {
            method: "delete".to_string(),
        };
        let _ = invalid;

        let connection: &dyn std::error::Error = &HttpError::Connection {
            message: "down".to_string(),
        };
        let _ = connection;
    }
}
