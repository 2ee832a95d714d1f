//! # Reactive Resource
//!
//! Binds reactive, attribute-based models to REST resources.
//!
//! ## Overview
//!
//! This crate provides:
//! - Reactive attribute containers (plain, derived and sequence) via [`reactive`]
//! - Resource types built from an explicit [`Schema`](rest::Schema) and
//!   [`Behaviors`](rest::Behaviors) via [`rest::ResourceType`]
//! - Instances whose containers survive `save` and `fetch`, so observers
//!   keep their subscriptions across server round-trips
//! - Serialization to transmittable JSON snapshots with private-attribute
//!   exclusion
//! - Create/read/update/delete, custom actions and collection fetches over
//!   an injected [`Transport`](clients::Transport)
//! - An async `reqwest` transport configured through [`ClientConfig`]
//!
//! ## Quick Start
//!
//! ```rust
//! use reactive_resource::{BaseUrl, ClientConfig};
//!
//! let config = ClientConfig::builder()
//!     .base_url(BaseUrl::new("https://api.example.com").unwrap())
//!     .user_agent_prefix("MyApp/1.0")
//!     .build()
//!     .unwrap();
//! ```
//!
//! ## Defining a Resource
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use reactive_resource::clients::HttpClient;
//! use reactive_resource::rest::{Behaviors, ResourceType, Schema};
//! use serde_json::json;
//!
//! let users = ResourceType::builder("users", Arc::new(HttpClient::new(&config)?))
//!     .schema(
//!         Schema::new()
//!             .plain("first", "")
//!             .plain("last", "")
//!             .sequence("roles", ["member"])
//!             .derived("full_name", |scope| {
//!                 let first = scope.get_str("first").unwrap_or_default();
//!                 let last = scope.get_str("last").unwrap_or_default();
//!                 json!(format!("{first} {last}"))
//!             }),
//!     )
//!     .behaviors(Behaviors::new().on_save(|user, _| {
//!         tracing::info!(id = ?user.id(), "saved");
//!     }))
//!     .build()?;
//!
//! let mut ada = users.instance_from(json!({"first": "Ada", "last": "Lovelace"}))?;
//! ada.save().await?;
//! assert_eq!(ada.get("full_name"), Some(json!("Ada Lovelace")));
//! ```
//!
//! ## Testing Without a Server
//!
//! Resource types only see the [`Transport`](clients::Transport) trait, so
//! tests can inject an in-memory implementation:
//!
//! ```rust
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use reactive_resource::clients::{HttpError, HttpRequest, HttpResponse, Transport};
//! use reactive_resource::rest::ResourceType;
//! use serde_json::json;
//!
//! #[derive(Debug)]
//! struct AlwaysCreated;
//!
//! #[async_trait]
//! impl Transport for AlwaysCreated {
//!     async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, HttpError> {
//!         Ok(HttpResponse::with_body(201, json!({"_id": "abc"})))
//!     }
//! }
//!
//! let users = ResourceType::builder("users", Arc::new(AlwaysCreated)).build().unwrap();
//! let mut user = users.blank().unwrap();
//! tokio_test::block_on(user.save()).unwrap();
//! assert_eq!(user.id().as_deref(), Some("abc"));
//! ```
//!
//! ## Design Principles
//!
//! - **No global state**: Transport and container factory are injected
//!   per resource type
//! - **Fail-fast validation**: Descriptors and newtypes validate on construction
//! - **Thread-safe**: All types are `Send + Sync`
//! - **Async-first**: Network operations are `async` and return `Result`
//! - **Stable containers**: An attribute's container is never replaced

pub mod clients;
pub mod config;
pub mod error;
pub mod reactive;
pub mod rest;

// Re-export public types at crate root for convenience
pub use config::{AttributeName, BaseUrl, ClientConfig, ClientConfigBuilder};
pub use error::ConfigError;

// Re-export HTTP client types
pub use clients::{
    HttpClient, HttpError, HttpMethod, HttpRequest, HttpRequestBuilder, HttpResponse,
    InvalidHttpRequestError, Transport,
};

// Re-export resource engine types
pub use rest::{
    Attribute, Behaviors, ResourceError, ResourceInstance, ResourceState, ResourceType, Schema,
};
