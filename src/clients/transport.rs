//! The transport capability injected into resource types.
//!
//! Resource types never reach for a global HTTP client. They are built with
//! an `Arc<dyn Transport>`, so tests can substitute an in-memory fake and
//! applications can wrap [`HttpClient`](crate::clients::HttpClient) with
//! their own authentication or retry policy.

use std::fmt;

use async_trait::async_trait;

use crate::clients::{HttpError, HttpRequest, HttpResponse};

/// Issues a request and resolves with the decoded response.
///
/// Implementations return responses of every status. Only failures that
/// prevent a response from being received are reported as [`HttpError`].
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use reactive_resource::clients::{HttpError, HttpRequest, HttpResponse, Transport};
/// use serde_json::json;
///
/// #[derive(Debug)]
/// struct Echo;
///
/// #[async_trait]
/// impl Transport for Echo {
///     async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
///         Ok(HttpResponse::with_body(200, request.body.unwrap_or(json!({}))))
///     }
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Sends `request` and returns the response.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] if the request is invalid or no response could
    /// be obtained.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}
