//! REST resource engine.
//!
//! This module binds reactive, attribute-based instances to REST
//! collections:
//!
//! - **[`ResourceType`]**: immutable descriptor (path, [`Schema`],
//!   [`Behaviors`], transport) and instance factory
//! - **[`ResourceInstance`]**: a live object whose attributes are held in
//!   [`Attribute`] containers that survive `save` and `fetch`
//! - **Serialization**: [`serialize`] produces the transmittable snapshot,
//!   skipping private attributes
//! - **Persistence**: `save`, `fetch`, `destroy` and custom `request`s on
//!   each instance, plus [`ResourceType::fetch_all`] for collections
//! - **[`ResourceError`]**: transport, status, precondition and
//!   malformed-response failures
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use reactive_resource::{BaseUrl, ClientConfig};
//! use reactive_resource::clients::HttpClient;
//! use reactive_resource::rest::{ResourceType, Schema};
//! use serde_json::json;
//!
//! let config = ClientConfig::builder()
//!     .base_url(BaseUrl::new("https://api.example.com")?)
//!     .build()?;
//! let users = ResourceType::builder("users", Arc::new(HttpClient::new(&config)?))
//!     .schema(Schema::new().plain("name", "").plain("__selected", false))
//!     .build()?;
//!
//! // Create
//! let mut user = users.instance_from(json!({"name": "Ada"}))?;
//! user.save().await?;                       // POST users, merges `_id`
//!
//! // Observe, then refresh in place
//! let _subscription = user.attribute("name").unwrap().subscribe(|name| {
//!     println!("name: {name}");
//! });
//! user.fetch().await?;                      // GET users/{id}
//!
//! // List
//! for user in users.fetch_all().await? {    // GET users
//!     println!("{:?}", user.snapshot());
//! }
//!
//! // Delete
//! user.destroy().await?;                    // DELETE users/{id}
//! ```

mod attribute;
mod errors;
mod instance;
mod path;
mod persistence;
mod resource;
mod schema;
mod serialize;

// Public exports
pub use attribute::{
    Attribute, AttributeKind, AttributeScope, ContainerFactory, Derivation, Element, Seed,
    StandardContainers,
};
pub use errors::{AttributeError, ResourceError};
pub use instance::{ResourceInstance, ResourceState};
pub use path::{action_path, member_path, normalize_path, ResourceOperation};
pub use resource::{
    serialize_to_query, ResourceType, ResourceTypeBuilder, DEFAULT_ID_ATTRIBUTE,
    DEFAULT_PRIVATE_PREFIX,
};
pub use schema::{Behaviors, Hook, Method, Schema, INITIALIZE_METHOD};
pub use serialize::{serialize, serialize_to_string};
