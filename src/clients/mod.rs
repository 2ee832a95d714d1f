//! Transport layer for REST resources.
//!
//! Resource types issue requests through an injected [`Transport`]. This
//! module defines that capability, the request/response types it carries,
//! and [`HttpClient`], the `reqwest`-backed default implementation.
//!
//! # Overview
//!
//! - [`Transport`]: The injected capability (send a request, get a response)
//! - [`HttpClient`]: The async HTTP transport for JSON backends
//! - [`HttpRequest`]: A request to be sent
//! - [`HttpResponse`]: A decoded response
//! - [`HttpMethod`]: Supported HTTP verbs
//! - [`HttpError`]: Transport failures
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use reactive_resource::{BaseUrl, ClientConfig};
//! use reactive_resource::clients::{HttpClient, Transport};
//!
//! let config = ClientConfig::builder()
//!     .base_url(BaseUrl::new("https://api.example.com")?)
//!     .build()?;
//! let transport: Arc<dyn Transport> = Arc::new(HttpClient::new(&config)?);
//! ```

mod errors;
mod http_client;
mod http_request;
mod http_response;
mod transport;

pub use errors::{HttpError, InvalidHttpRequestError};
pub use http_client::{HttpClient, LIBRARY_VERSION};
pub use http_request::{HttpMethod, HttpRequest, HttpRequestBuilder};
pub use http_response::HttpResponse;
pub use transport::Transport;
