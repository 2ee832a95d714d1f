//! URL composition for REST resources.
//!
//! Every resource type is rooted at a single collection path. Member
//! operations append the percent-encoded identifier; custom actions append
//! the action segment.
//!
//! | Operation | Verb | URL |
//! |---|---|---|
//! | create | POST | `path` |
//! | update | PUT | `path/{id}` |
//! | fetch | GET | `path/{id}` |
//! | destroy | DELETE | `path/{id}` |
//! | fetch all | GET | `path` |
//!
//! # Example
//!
//! ```rust
//! use reactive_resource::rest::{action_path, member_path, normalize_path};
//!
//! assert_eq!(normalize_path("/users/"), "users");
//! assert_eq!(member_path("users", "a b"), "users/a%20b");
//! assert_eq!(action_path("users", "/search"), "users/search");
//! ```

use crate::clients::HttpMethod;

/// Operations that can be performed on a REST resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceOperation {
    /// Create a new record (POST /resources).
    Create,
    /// Update an existing record (PUT /resources/{id}).
    Update,
    /// Read a single record (GET /resources/{id}).
    Fetch,
    /// Delete a record (DELETE /resources/{id}).
    Destroy,
    /// List records (GET /resources).
    FetchAll,
}

impl ResourceOperation {
    /// Returns the default HTTP method for this operation.
    #[must_use]
    pub const fn default_http_method(&self) -> HttpMethod {
        match self {
            Self::Fetch | Self::FetchAll => HttpMethod::Get,
            Self::Create => HttpMethod::Post,
            Self::Update => HttpMethod::Put,
            Self::Destroy => HttpMethod::Delete,
        }
    }

    /// Returns the operation name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Fetch => "fetch",
            Self::Destroy => "destroy",
            Self::FetchAll => "fetch_all",
        }
    }

    /// Returns `true` if the operation addresses a single member URL.
    #[must_use]
    pub const fn is_member(&self) -> bool {
        matches!(self, Self::Update | Self::Fetch | Self::Destroy)
    }
}

/// Trims leading, trailing and repeated slashes from a path.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Builds the member URL `path/{id}`, percent-encoding the identifier.
#[must_use]
pub fn member_path(path: &str, id: &str) -> String {
    format!("{}/{}", normalize_path(path), urlencoding::encode(id))
}

/// Joins a custom action onto the collection path with exactly one `/`.
///
/// An empty action addresses the collection itself.
#[must_use]
pub fn action_path(path: &str, action: &str) -> String {
    let base = normalize_path(path);
    let action = normalize_path(action);
    if action.is_empty() {
        base
    } else {
        format!("{base}/{action}")
    }
}

// Verify types are Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ResourceOperation>();
};
