//! Declarative schema and behaviors for resource types.
//!
//! A resource type is described by two independent parts:
//!
//! - [`Schema`]: the attributes every instance starts with, each declared
//!   with an explicit kind (plain, sequence or derived)
//! - [`Behaviors`]: named extension members (constant fields and methods)
//!   plus the `initialize` lifecycle method and completion hooks
//!
//! # Example
//!
//! ```rust
//! use reactive_resource::rest::{Behaviors, Schema};
//! use serde_json::{json, Value};
//!
//! let schema = Schema::new()
//!     .plain("name", "")
//!     .plain("age", 0)
//!     .sequence("tags", Vec::<Value>::new())
//!     .derived("greeting", |scope| {
//!         json!(format!("Hello, {}", scope.get_str("name").unwrap_or_default()))
//!     });
//!
//! let behaviors = Behaviors::new()
//!     .field("kind", "person")
//!     .method("birthday", |user, _args| {
//!         let age = user.get("age").and_then(|v| v.as_i64()).unwrap_or(0);
//!         user.set("age", json!(age + 1))?;
//!         Ok(Value::Null)
//!     });
//!
//! assert_eq!(schema.len(), 4);
//! assert!(behaviors.get_method("birthday").is_some());
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::config::AttributeName;
use crate::error::ConfigError;
use crate::rest::{AttributeScope, Derivation, ResourceError, ResourceInstance, Seed};

/// Name of the lifecycle method called once per construction.
pub const INITIALIZE_METHOD: &str = "initialize";

/// A named method callable on every instance of a resource type.
pub type Method =
    Arc<dyn Fn(&mut ResourceInstance, &[Value]) -> Result<Value, ResourceError> + Send + Sync>;

/// A completion hook, called with the instance and the parsed response.
pub type Hook = Arc<dyn Fn(&mut ResourceInstance, &Value) + Send + Sync>;

/// The declared attributes of a resource type, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    attributes: Vec<(String, Seed)>,
}

impl Schema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a plain attribute with a default value.
    ///
    /// The attribute stays plain even if the default is an array.
    #[must_use]
    pub fn plain(mut self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.attributes
            .push((name.into(), Seed::Plain(default.into())));
        self
    }

    /// Declares a sequence attribute with default elements.
    #[must_use]
    pub fn sequence<I, V>(mut self, name: impl Into<String>, default: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let items = default.into_iter().map(Into::into).collect();
        self.attributes.push((name.into(), Seed::Sequence(items)));
        self
    }

    /// Declares a read-only derived attribute.
    #[must_use]
    pub fn derived(
        mut self,
        name: impl Into<String>,
        read: impl Fn(&mut AttributeScope<'_>) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.attributes
            .push((name.into(), Seed::Derived(Derivation::new(read))));
        self
    }

    /// Declares a derived attribute whose writes are forwarded to `write`.
    #[must_use]
    pub fn derived_writable(
        mut self,
        name: impl Into<String>,
        read: impl Fn(&mut AttributeScope<'_>) -> Value + Send + Sync + 'static,
        write: impl Fn(&mut AttributeScope<'_>, Value) + Send + Sync + 'static,
    ) -> Self {
        self.attributes.push((
            name.into(),
            Seed::Derived(Derivation::with_writer(read, write)),
        ));
        self
    }

    /// Declares an attribute from an explicit seed.
    #[must_use]
    pub fn seed(mut self, name: impl Into<String>, seed: Seed) -> Self {
        self.attributes.push((name.into(), seed));
        self
    }

    /// Returns the number of declared attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Returns `true` if no attributes are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Returns the declared attribute names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|(name, _)| name.as_str())
    }

    /// Returns the seed declared for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Seed> {
        self.attributes
            .iter()
            .find(|(declared, _)| declared == name)
            .map(|(_, seed)| seed)
    }

    pub(crate) fn seeds(&self) -> impl Iterator<Item = (String, Seed)> + '_ {
        self.attributes.iter().cloned()
    }
}

/// Named extension members and hooks of a resource type.
#[derive(Clone, Default)]
pub struct Behaviors {
    fields: Vec<(String, Value)>,
    methods: Vec<(String, Method)>,
    on_save: Option<Hook>,
    on_fetch: Option<Hook>,
    on_destroy: Option<Hook>,
}

impl Behaviors {
    /// Creates an empty set of behaviors.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a constant field copied onto every instance.
    ///
    /// Fields are not observable. They appear in the serialized snapshot
    /// unless their name carries the private prefix.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Adds a method callable with [`ResourceInstance::call`].
    #[must_use]
    pub fn method(
        mut self,
        name: impl Into<String>,
        method: impl Fn(&mut ResourceInstance, &[Value]) -> Result<Value, ResourceError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.methods.push((name.into(), Arc::new(method)));
        self
    }

    /// Sets the lifecycle method run once per construction.
    ///
    /// It runs after defaults and source data are applied and receives the
    /// raw source payload.
    #[must_use]
    pub fn initialize(
        self,
        initialize: impl Fn(&mut ResourceInstance, &Map<String, Value>) + Send + Sync + 'static,
    ) -> Self {
        self.method(INITIALIZE_METHOD, move |instance, args| {
            match args.first().and_then(Value::as_object) {
                Some(source) => initialize(instance, source),
                None => initialize(instance, &Map::new()),
            }
            Ok(Value::Null)
        })
    }

    /// Sets the hook run after every successful `save`.
    #[must_use]
    pub fn on_save(
        mut self,
        hook: impl Fn(&mut ResourceInstance, &Value) + Send + Sync + 'static,
    ) -> Self {
        self.on_save = Some(Arc::new(hook));
        self
    }

    /// Sets the hook run after every successful `fetch`.
    #[must_use]
    pub fn on_fetch(
        mut self,
        hook: impl Fn(&mut ResourceInstance, &Value) + Send + Sync + 'static,
    ) -> Self {
        self.on_fetch = Some(Arc::new(hook));
        self
    }

    /// Sets the hook run after a successful `destroy`.
    #[must_use]
    pub fn on_destroy(
        mut self,
        hook: impl Fn(&mut ResourceInstance, &Value) + Send + Sync + 'static,
    ) -> Self {
        self.on_destroy = Some(Arc::new(hook));
        self
    }

    /// Returns the method named `name`.
    #[must_use]
    pub fn get_method(&self, name: &str) -> Option<&Method> {
        self.methods
            .iter()
            .find(|(declared, _)| declared == name)
            .map(|(_, method)| method)
    }

    /// Returns the field named `name`.
    #[must_use]
    pub fn get_field(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(declared, _)| declared == name)
            .map(|(_, value)| value)
    }

    /// Returns `true` if an `initialize` method is declared.
    #[must_use]
    pub fn has_initializer(&self) -> bool {
        self.get_method(INITIALIZE_METHOD).is_some()
    }

    /// Returns the method names in declaration order.
    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.iter().map(|(name, _)| name.as_str())
    }

    pub(crate) fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter().map(|(name, value)| (name, value))
    }

    pub(crate) const fn save_hook(&self) -> Option<&Hook> {
        self.on_save.as_ref()
    }

    pub(crate) const fn fetch_hook(&self) -> Option<&Hook> {
        self.on_fetch.as_ref()
    }

    pub(crate) const fn destroy_hook(&self) -> Option<&Hook> {
        self.on_destroy.as_ref()
    }
}

impl fmt::Debug for Behaviors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Behaviors")
            .field("fields", &self.fields)
            .field("methods", &self.method_names().collect::<Vec<_>>())
            .field("on_save", &self.on_save.is_some())
            .field("on_fetch", &self.on_fetch.is_some())
            .field("on_destroy", &self.on_destroy.is_some())
            .finish()
    }
}

/// Checks that every member name is a valid attribute name declared once.
pub(crate) fn validate_members(schema: &Schema, behaviors: &Behaviors) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    let names = schema
        .names()
        .chain(behaviors.fields.iter().map(|(name, _)| name.as_str()))
        .chain(behaviors.method_names());

    for name in names {
        AttributeName::new(name)?;
        if !seen.insert(name) {
            return Err(ConfigError::DuplicateMember {
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

// Verify types are Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Schema>();
    assert_send_sync::<Behaviors>();
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rest::AttributeKind;
    use serde_json::json;

    #[test]
    fn test_schema_keeps_declaration_order_and_kinds() {
        let schema = Schema::new()
            .plain("name", "Ada")
            .sequence("tags", ["a", "b"])
            .plain("matrix", json!([1, 2]))
            .derived("upper", |_| Value::Null);

        assert_eq!(
            schema.names().collect::<Vec<_>>(),
            vec!["name", "tags", "matrix", "upper"]
        );
        assert_eq!(schema.get("tags").map(Seed::kind), Some(AttributeKind::Sequence));
        assert_eq!(schema.get("matrix").map(Seed::kind), Some(AttributeKind::Plain));
        assert_eq!(schema.get("upper").map(Seed::kind), Some(AttributeKind::Derived));
        assert!(schema.get("missing").is_none());
    }

    #[test]
    fn test_derived_writable_seed_is_writable() {
        let schema = Schema::new().derived_writable("alias", |_| Value::Null, |_, _| {});
        match schema.get("alias") {
            Some(Seed::Derived(derivation)) => assert!(derivation.is_writable()),
            other => panic!("Expected derived seed, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_members_rejects_duplicate_schema_names() {
        let schema = Schema::new().plain("name", "").plain("name", "x");
        let result = validate_members(&schema, &Behaviors::new());
        assert_eq!(
            result,
            Err(ConfigError::DuplicateMember {
                name: "name".to_string()
            })
        );
    }

    #[test]
    fn test_validate_members_rejects_collision_between_schema_and_behaviors() {
        let schema = Schema::new().plain("greet", "");
        let behaviors = Behaviors::new().method("greet", |_, _| Ok(Value::Null));
        assert!(matches!(
            validate_members(&schema, &behaviors),
            Err(ConfigError::DuplicateMember { ref name }) if name == "greet"
        ));
    }

    #[test]
    fn test_validate_members_rejects_empty_name() {
        let schema = Schema::new().plain("", 1);
        assert_eq!(
            validate_members(&schema, &Behaviors::new()),
            Err(ConfigError::EmptyAttributeName)
        );
    }

    #[test]
    fn test_behaviors_lookup() {
        let behaviors = Behaviors::new()
            .field("kind", "person")
            .method("noop", |_, _| Ok(Value::Null))
            .initialize(|_, _| {});

        assert_eq!(behaviors.get_field("kind"), Some(&json!("person")));
        assert!(behaviors.get_method("noop").is_some());
        assert!(behaviors.has_initializer());
        assert_eq!(
            behaviors.method_names().collect::<Vec<_>>(),
            vec!["noop", INITIALIZE_METHOD]
        );
    }

    #[test]
    fn test_behaviors_debug_lists_members() {
        let behaviors = Behaviors::new()
            .method("noop", |_, _| Ok(Value::Null))
            .on_save(|_, _| {});
        let debug = format!("{behaviors:?}");
        assert!(debug.contains("noop"));
        assert!(debug.contains("on_save: true"));
    }
}
