//! Resource instances and attribute materialization.
//!
//! A [`ResourceInstance`] is one object produced by a
//! [`ResourceType`]. It owns a table of attribute containers, created on
//! first write and never replaced afterwards.
//!
//! # Materialization
//!
//! [`ResourceInstance::update_attributes`] walks `(name, seed)` pairs:
//!
//! - an unknown name gets a new container whose kind follows the seed
//!   (derivation, array, anything else)
//! - a known name is written through the existing container's setter
//!
//! Construction applies the schema defaults first and the source payload
//! second, so source values win and every declared attribute exists.
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//!
//! let user = users.instance_from(json!({"name": "Ada"}))?;
//! let name = user.attribute("name").unwrap();
//! let _subscription = name.subscribe(|value| println!("name is now {value}"));
//!
//! user.update_attributes([("name", json!("Grace"))])?;
//! assert_eq!(user.get("name"), Some(json!("Grace")));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{Map, Value};

use crate::rest::attribute::{json_type, materialize, AttributeTable};
use crate::rest::{Attribute, ResourceError, ResourceType, Seed};

/// Lifecycle state of an instance relative to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceState {
    /// The instance has no identifier yet.
    Unsaved,
    /// The instance carries an identifier.
    Saved,
    /// The server-side record was destroyed. Values are kept for display.
    Deleted,
}

/// A materialized, REST-synchronizable object.
pub struct ResourceInstance {
    resource: ResourceType,
    attributes: Arc<AttributeTable>,
    fields: Map<String, Value>,
    pub(crate) deleted: bool,
}

impl ResourceInstance {
    /// Creates an instance with the behavior fields and no attributes.
    pub(crate) fn empty(resource: ResourceType) -> Self {
        let fields = resource
            .behaviors()
            .fields()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        Self {
            resource,
            attributes: Arc::new(RwLock::new(BTreeMap::new())),
            fields,
            deleted: false,
        }
    }

    /// Applies attribute values, materializing containers for new names.
    ///
    /// Existing containers are written through their setters and are never
    /// replaced. Pairs are applied in order; on error the pairs before the
    /// failing one stay applied.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Attribute`] if a container rejects its value.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// user.update_attributes([("name", json!("Ada")), ("tags", json!(["x"]))])?;
    /// ```
    pub fn update_attributes<I, K, S>(&self, attributes: I) -> Result<(), ResourceError>
    where
        I: IntoIterator<Item = (K, S)>,
        K: Into<String>,
        S: Into<Seed>,
    {
        let mut materialized = false;
        let result = attributes.into_iter().try_for_each(|(name, seed)| {
            let name = name.into();
            let seed = seed.into();

            let existing = self.attributes.read().get(&name).cloned();
            match existing {
                Some(attribute) => match seed.into_value() {
                    Some(value) => attribute
                        .set(value)
                        .map_err(|source| ResourceError::Attribute { name, source }),
                    None => {
                        tracing::debug!(
                            attribute = %name,
                            "Ignoring derivation for an attribute that already exists"
                        );
                        Ok(())
                    }
                },
                None => {
                    let attribute =
                        materialize(self.resource.containers(), &name, seed, &self.attributes);
                    self.attributes.write().entry(name).or_insert(attribute);
                    materialized = true;
                    Ok(())
                }
            }
        });

        if materialized {
            self.invalidate_derived();
        }
        result
    }

    /// Derived attributes may have read names that did not exist yet.
    fn invalidate_derived(&self) {
        let derived: Vec<Attribute> = self
            .attributes
            .read()
            .values()
            .filter(|attribute| attribute.as_derived().is_some())
            .cloned()
            .collect();

        for attribute in derived {
            if let Some(computed) = attribute.as_derived() {
                computed.invalidate();
            }
        }
    }

    /// Returns a handle to the container for `name`.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<Attribute> {
        self.attributes.read().get(name).cloned()
    }

    /// Returns the current value of attribute `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value> {
        self.attribute(name).map(|attribute| attribute.get())
    }

    /// Writes a single attribute, materializing it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Attribute`] if the container rejects `value`.
    pub fn set(&self, name: &str, value: Value) -> Result<(), ResourceError> {
        self.update_attributes([(name, value)])
    }

    /// Returns the attribute names in sorted order.
    #[must_use]
    pub fn attribute_names(&self) -> Vec<String> {
        self.attributes.read().keys().cloned().collect()
    }

    /// Returns `true` if attribute `name` has been materialized.
    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.read().contains_key(name)
    }

    /// Returns handles to every attribute, in sorted order.
    ///
    /// The table lock is released before the handles are returned, so the
    /// caller may read derived values safely.
    #[must_use]
    pub fn attributes(&self) -> Vec<(String, Attribute)> {
        self.attributes
            .read()
            .iter()
            .map(|(name, attribute)| (name.clone(), attribute.clone()))
            .collect()
    }

    /// Returns the behavior field `name`.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Replaces the value of a declared behavior field.
    ///
    /// Returns `false` if no field named `name` is declared.
    pub fn set_field(&mut self, name: &str, value: Value) -> bool {
        match self.fields.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub(crate) const fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Calls the behavior method `name` with `args`.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::UnknownMember`] if no such method is
    /// declared, or whatever the method itself returns.
    pub fn call(&mut self, name: &str, args: &[Value]) -> Result<Value, ResourceError> {
        let method = self
            .resource
            .behaviors()
            .get_method(name)
            .cloned()
            .ok_or_else(|| ResourceError::UnknownMember {
                resource: self.resource.path().to_string(),
                name: name.to_string(),
            })?;
        method(self, args)
    }

    /// Returns the identifier, if the instance has one.
    ///
    /// Strings are returned as-is and numbers are formatted. `null`, empty
    /// strings and other shapes count as absent.
    ///
    /// A boolean, array or object identifier is therefore treated as unset:
    /// `save` creates a new record instead of updating. Such values are
    /// logged at `debug`.
    #[must_use]
    pub fn id(&self) -> Option<String> {
        match self.get(self.resource.id_attribute())? {
            Value::String(id) if !id.is_empty() => Some(id),
            Value::Number(id) => Some(id.to_string()),
            Value::Null | Value::String(_) => None,
            other => {
                tracing::debug!(
                    resource = %self.resource.path(),
                    id_attribute = %self.resource.id_attribute(),
                    found = json_type(&other),
                    "Ignoring identifier that is neither a string nor a number"
                );
                None
            }
        }
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub fn state(&self) -> ResourceState {
        if self.deleted {
            ResourceState::Deleted
        } else if self.id().is_some() {
            ResourceState::Saved
        } else {
            ResourceState::Unsaved
        }
    }

    /// Returns the resource type that produced this instance.
    #[must_use]
    pub const fn resource(&self) -> &ResourceType {
        &self.resource
    }
}

impl fmt::Debug for ResourceInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceInstance")
            .field("resource", &self.resource.path())
            .field("state", &self.state())
            .field("attributes", &self.attribute_names())
            .field("fields", &self.fields)
            .finish()
    }
}

// Verify ResourceInstance is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ResourceInstance>();
};
