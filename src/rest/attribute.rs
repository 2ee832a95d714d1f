//! Attribute containers.
//!
//! Every attribute of a [`ResourceInstance`] lives in an [`Attribute`], a
//! cloneable handle around one of three reactive containers:
//!
//! - [`Attribute::Plain`]: a single JSON value
//! - [`Attribute::Derived`]: a value computed from other attributes
//! - [`Attribute::Sequence`]: an ordered list of values or nested instances
//!
//! The kind of a container is fixed once it is created. Later updates go
//! through [`Attribute::set`], so a handle obtained before a `fetch` or
//! `save` keeps observing the same container afterwards.
//!
//! # Example
//!
//! ```rust
//! use reactive_resource::rest::{Attribute, AttributeKind};
//! use reactive_resource::reactive::Observable;
//! use serde_json::json;
//!
//! let tags = Attribute::Sequence(Observable::new(Vec::new()));
//! tags.set(json!(["a", "b"])).unwrap();
//!
//! assert_eq!(tags.kind(), AttributeKind::Sequence);
//! assert_eq!(tags.get(), json!(["a", "b"]));
//! assert!(tags.set(json!("not a list")).is_err());
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use crate::reactive::{Computed, Observable, Subscription, Tracker};
use crate::rest::{AttributeError, ResourceInstance};

/// The attribute table shared between an instance and its derived containers.
pub(crate) type AttributeTable = RwLock<BTreeMap<String, Attribute>>;

type Read = Arc<dyn Fn(&mut AttributeScope<'_>) -> Value + Send + Sync>;
type Write = Arc<dyn Fn(&mut AttributeScope<'_>, Value) + Send + Sync>;

/// The kind of an attribute container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    /// A single stored value.
    Plain,
    /// A value computed from a derivation function.
    Derived,
    /// An ordered list of values.
    Sequence,
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Plain => "plain",
            Self::Derived => "derived",
            Self::Sequence => "sequence",
        };
        write!(f, "{s}")
    }
}

/// One entry of a sequence attribute.
#[derive(Debug, Clone)]
pub enum Element {
    /// A plain JSON value.
    Value(Value),
    /// A nested resource instance, serialized recursively.
    Resource(Arc<ResourceInstance>),
}

impl Element {
    /// Renders the element as JSON.
    ///
    /// Nested instances are replaced by their serialized snapshot.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Value(value) => value.clone(),
            Self::Resource(instance) => Value::Object(instance.snapshot()),
        }
    }

    /// Returns the nested instance, if this element holds one.
    #[must_use]
    pub fn as_resource(&self) -> Option<&ResourceInstance> {
        match self {
            Self::Resource(instance) => Some(instance),
            Self::Value(_) => None,
        }
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Value(a), Self::Value(b)) => a == b,
            (Self::Resource(a), Self::Resource(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<Value> for Element {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<ResourceInstance> for Element {
    fn from(instance: ResourceInstance) -> Self {
        Self::Resource(Arc::new(instance))
    }
}

/// Handle to an attribute container.
///
/// Cloning an `Attribute` yields another handle to the same container.
#[derive(Debug, Clone)]
pub enum Attribute {
    /// A plain value container.
    Plain(Observable<Value>),
    /// A derived value container.
    Derived(Computed<Value>),
    /// A sequence container.
    Sequence(Observable<Vec<Element>>),
}

impl Attribute {
    /// Returns the container kind.
    #[must_use]
    pub const fn kind(&self) -> AttributeKind {
        match self {
            Self::Plain(_) => AttributeKind::Plain,
            Self::Derived(_) => AttributeKind::Derived,
            Self::Sequence(_) => AttributeKind::Sequence,
        }
    }

    /// Returns the current value as JSON.
    #[must_use]
    pub fn get(&self) -> Value {
        match self {
            Self::Plain(observable) => observable.get(),
            Self::Derived(computed) => computed.get(),
            Self::Sequence(observable) => observable.with(|elements| render(elements)),
        }
    }

    /// Writes `value` through the container's setter.
    ///
    /// A sequence accepts an array (its items become plain elements) or
    /// `null`, which clears it. A read-only derived container ignores the
    /// write.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError::SequenceExpected`] if a sequence receives
    /// anything else.
    pub fn set(&self, value: Value) -> Result<(), AttributeError> {
        match self {
            Self::Plain(observable) => {
                observable.set(value);
            }
            Self::Derived(computed) => {
                if !computed.set(value) {
                    tracing::debug!("Ignoring write to read-only derived attribute");
                }
            }
            Self::Sequence(observable) => {
                let elements = match value {
                    Value::Array(items) => items.into_iter().map(Element::Value).collect(),
                    Value::Null => Vec::new(),
                    other => {
                        return Err(AttributeError::SequenceExpected {
                            found: json_type(&other),
                        })
                    }
                };
                observable.set(elements);
            }
        }
        Ok(())
    }

    /// Registers `callback` to run with the new value after every change.
    pub fn subscribe(&self, callback: impl Fn(&Value) + Send + Sync + 'static) -> Subscription {
        match self {
            Self::Plain(observable) => observable.subscribe(callback),
            Self::Derived(computed) => computed.subscribe(callback),
            Self::Sequence(observable) => {
                observable.subscribe(move |elements: &Vec<Element>| callback(&render(elements)))
            }
        }
    }

    /// Returns `true` if both handles point to the same container.
    #[must_use]
    pub fn same_container(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Plain(a), Self::Plain(b)) => a.ptr_eq(b),
            (Self::Derived(a), Self::Derived(b)) => a.ptr_eq(b),
            (Self::Sequence(a), Self::Sequence(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Returns the plain container, if this is one.
    #[must_use]
    pub const fn as_plain(&self) -> Option<&Observable<Value>> {
        match self {
            Self::Plain(observable) => Some(observable),
            _ => None,
        }
    }

    /// Returns the sequence container, if this is one.
    ///
    /// Use it to insert nested instances:
    /// `sequence.update(|items| items.push(Element::from(instance)))`.
    #[must_use]
    pub const fn as_sequence(&self) -> Option<&Observable<Vec<Element>>> {
        match self {
            Self::Sequence(observable) => Some(observable),
            _ => None,
        }
    }

    /// Returns the derived container, if this is one.
    #[must_use]
    pub const fn as_derived(&self) -> Option<&Computed<Value>> {
        match self {
            Self::Derived(computed) => Some(computed),
            _ => None,
        }
    }

    pub(crate) fn track(&self, tracker: &mut Tracker) {
        match self {
            Self::Plain(observable) => tracker.track(observable.clone()),
            Self::Derived(computed) => tracker.track(computed.clone()),
            Self::Sequence(observable) => tracker.track(observable.clone()),
        }
    }
}

fn render(elements: &[Element]) -> Value {
    Value::Array(elements.iter().map(Element::to_value).collect())
}

pub(crate) const fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Read and write access to an instance's attributes from a derivation.
///
/// Reads made through [`get`](Self::get) are recorded as dependencies of
/// the derived attribute being evaluated.
pub struct AttributeScope<'a> {
    table: &'a AttributeTable,
    tracker: &'a mut Tracker,
}

impl<'a> AttributeScope<'a> {
    pub(crate) fn new(table: &'a AttributeTable, tracker: &'a mut Tracker) -> Self {
        Self { table, tracker }
    }

    fn lookup(&self, name: &str) -> Option<Attribute> {
        self.table.read().get(name).cloned()
    }

    /// Reads attribute `name`, recording it as a dependency.
    ///
    /// Returns `None` if the instance has no such attribute yet.
    pub fn get(&mut self, name: &str) -> Option<Value> {
        let attribute = self.lookup(name)?;
        attribute.track(self.tracker);
        Some(attribute.get())
    }

    /// Like [`get`](Self::get), for attributes holding a string.
    pub fn get_str(&mut self, name: &str) -> Option<String> {
        self.get(name)
            .and_then(|value| value.as_str().map(ToString::to_string))
    }

    /// Writes `value` into attribute `name`.
    ///
    /// Returns `Ok(false)` if the instance has no such attribute.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError`] if the container rejects the value.
    pub fn set(&self, name: &str, value: Value) -> Result<bool, AttributeError> {
        match self.lookup(name) {
            Some(attribute) => attribute.set(value).map(|()| true),
            None => Ok(false),
        }
    }
}

impl fmt::Debug for AttributeScope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeScope")
            .field("tracked", &self.tracker.len())
            .finish()
    }
}

/// A derivation function with an optional writer.
#[derive(Clone)]
pub struct Derivation {
    read: Read,
    write: Option<Write>,
}

impl Derivation {
    /// Creates a read-only derivation.
    pub fn new(read: impl Fn(&mut AttributeScope<'_>) -> Value + Send + Sync + 'static) -> Self {
        Self {
            read: Arc::new(read),
            write: None,
        }
    }

    /// Creates a derivation whose writes are forwarded to `write`.
    pub fn with_writer(
        read: impl Fn(&mut AttributeScope<'_>) -> Value + Send + Sync + 'static,
        write: impl Fn(&mut AttributeScope<'_>, Value) + Send + Sync + 'static,
    ) -> Self {
        Self {
            read: Arc::new(read),
            write: Some(Arc::new(write)),
        }
    }

    /// Returns `true` if the derivation accepts writes.
    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.write.is_some()
    }

    /// Binds the derivation to an attribute table.
    ///
    /// The computed value holds the table weakly and evaluates to `null`
    /// once the owning instance is gone.
    pub(crate) fn bind(&self, table: &Arc<AttributeTable>) -> Computed<Value> {
        let weak = Arc::downgrade(table);
        let read_fn = Arc::clone(&self.read);
        let evaluate = move |tracker: &mut Tracker| {
            weak.upgrade().map_or(Value::Null, |table| {
                read_fn(&mut AttributeScope::new(&table, tracker))
            })
        };

        match &self.write {
            Some(write_fn) => {
                let weak = Arc::downgrade(table);
                let write_fn = Arc::clone(write_fn);
                Computed::with_writer(evaluate, move |value| {
                    if let Some(table) = weak.upgrade() {
                        let mut tracker = Tracker::default();
                        write_fn(&mut AttributeScope::new(&table, &mut tracker), value);
                    }
                })
            }
            None => Computed::new(evaluate),
        }
    }
}

impl fmt::Debug for Derivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Derivation")
            .field("writable", &self.is_writable())
            .finish_non_exhaustive()
    }
}

/// The declared initial state of an attribute.
#[derive(Debug, Clone)]
pub enum Seed {
    /// A plain container seeded with a value.
    Plain(Value),
    /// A sequence container seeded with plain elements.
    Sequence(Vec<Value>),
    /// A derived container.
    Derived(Derivation),
}

impl Seed {
    /// Returns the kind of container this seed materializes.
    #[must_use]
    pub const fn kind(&self) -> AttributeKind {
        match self {
            Self::Plain(_) => AttributeKind::Plain,
            Self::Sequence(_) => AttributeKind::Sequence,
            Self::Derived(_) => AttributeKind::Derived,
        }
    }

    /// Returns the value to write into an existing container.
    ///
    /// Derivations carry no value and return `None`.
    pub(crate) fn into_value(self) -> Option<Value> {
        match self {
            Self::Plain(value) => Some(value),
            Self::Sequence(items) => Some(Value::Array(items)),
            Self::Derived(_) => None,
        }
    }
}

/// Arrays become sequences; every other value becomes a plain seed.
impl From<Value> for Seed {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(items) => Self::Sequence(items),
            other => Self::Plain(other),
        }
    }
}

impl From<Derivation> for Seed {
    fn from(derivation: Derivation) -> Self {
        Self::Derived(derivation)
    }
}

/// Creates the reactive containers for newly materialized attributes.
///
/// Resource types use [`StandardContainers`] unless another factory is
/// supplied with
/// [`ResourceTypeBuilder::containers`](crate::rest::ResourceTypeBuilder::containers).
pub trait ContainerFactory: Send + Sync + fmt::Debug {
    /// Creates a plain container for attribute `_name`.
    fn plain(&self, _name: &str, value: Value) -> Attribute {
        Attribute::Plain(Observable::new(value))
    }

    /// Creates a sequence container for attribute `_name`.
    fn sequence(&self, _name: &str, elements: Vec<Element>) -> Attribute {
        Attribute::Sequence(Observable::new(elements))
    }

    /// Wraps a bound derivation for attribute `_name`.
    fn derived(&self, _name: &str, computed: Computed<Value>) -> Attribute {
        Attribute::Derived(computed)
    }
}

/// The default container factory.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardContainers;

impl ContainerFactory for StandardContainers {}

/// Creates the container for `name` from its seed.
pub(crate) fn materialize(
    factory: &dyn ContainerFactory,
    name: &str,
    seed: Seed,
    table: &Arc<AttributeTable>,
) -> Attribute {
    match seed {
        Seed::Plain(value) => factory.plain(name, value),
        Seed::Sequence(items) => {
            factory.sequence(name, items.into_iter().map(Element::Value).collect())
        }
        Seed::Derived(derivation) => factory.derived(name, derivation.bind(table)),
    }
}

// Verify types are Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Attribute>();
    assert_send_sync::<Element>();
    assert_send_sync::<Seed>();
};
