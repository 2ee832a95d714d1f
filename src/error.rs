//! Configuration error types.
//!
//! This module contains the error type returned when building client
//! configuration or resource type descriptors.
//!
//! # Error Handling
//!
//! All configuration constructors and builders return `Result<T, ConfigError>`
//! so that invalid descriptors are rejected before any instance exists.
//!
//! # Example
//!
//! ```rust
//! use reactive_resource::{BaseUrl, ConfigError};
//!
//! let result = BaseUrl::new("not a url");
//! assert!(matches!(result, Err(ConfigError::InvalidBaseUrl { .. })));
//! ```

use thiserror::Error;

/// Errors that can occur while configuring clients or resource types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Base URL is invalid.
    #[error("Invalid base URL '{url}'. Expected an absolute http(s) URL (e.g., 'https://api.example.com').")]
    InvalidBaseUrl {
        /// The invalid URL that was provided.
        url: String,
    },

    /// An attribute or member name is empty.
    #[error("Attribute names cannot be empty.")]
    EmptyAttributeName,

    /// A resource path is empty.
    #[error("Resource path cannot be empty. Please provide a path such as 'users'.")]
    EmptyResourcePath,

    /// A name was declared more than once across schema and behaviors.
    #[error("Member '{name}' is declared more than once.")]
    DuplicateMember {
        /// The duplicated name.
        name: String,
    },

    /// A required field is missing.
    #[error("Missing required field: '{field}'. This field must be set before building.")]
    MissingRequiredField {
        /// The name of the missing field.
        field: &'static str,
    },
}
