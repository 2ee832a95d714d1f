//! Instance serialization.
//!
//! [`serialize`] turns an instance into the plain JSON snapshot sent as the
//! body of `save` requests:
//!
//! 1. behavior fields are copied, then every attribute's current value
//! 2. names starting with the private prefix (`__` by default) are dropped,
//!    except the identifier attribute, which is kept whenever it is set
//! 3. sequences of nested instances are replaced by their own snapshots
//!
//! Methods are never part of the snapshot. Serialization only reads values.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::rest::ResourceInstance;

/// Returns the transmittable snapshot of `instance`.
///
/// # Example
///
/// ```rust,ignore
/// let user = users.instance_from(json!({"name": "Ada", "__draft": true}))?;
/// let data = reactive_resource::rest::serialize(&user);
/// assert_eq!(data.get("name"), Some(&json!("Ada")));
/// assert!(!data.contains_key("__draft"));
/// ```
#[must_use]
pub fn serialize(instance: &ResourceInstance) -> Map<String, Value> {
    let resource = instance.resource();
    let id_attribute = resource.id_attribute();
    let prefix = resource.private_prefix();

    let mut data = instance.fields().clone();
    for (name, attribute) in instance.attributes() {
        data.insert(name, attribute.get());
    }

    data.retain(|name, value| {
        if name == id_attribute {
            !value.is_null()
        } else {
            prefix.is_empty() || !name.starts_with(prefix)
        }
    });
    data
}

/// Returns the snapshot of `instance` encoded as JSON text.
///
/// # Errors
///
/// Returns [`serde_json::Error`] if encoding fails.
pub fn serialize_to_string(instance: &ResourceInstance) -> Result<String, serde_json::Error> {
    serde_json::to_string(&serialize(instance))
}

impl ResourceInstance {
    /// Returns the transmittable snapshot of this instance.
    ///
    /// See [`serialize`].
    #[must_use]
    pub fn snapshot(&self) -> Map<String, Value> {
        serialize(self)
    }
}

impl Serialize for ResourceInstance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let data = self.snapshot();
        data.serialize(serializer)
    }
}
