//! Resource types: the instance factory and collection fetcher.
//!
//! A [`ResourceType`] binds a REST collection path to a [`Schema`], a set
//! of [`Behaviors`] and an injected [`Transport`]. It produces
//! [`ResourceInstance`]s, either locally or from a collection request.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use reactive_resource::clients::HttpClient;
//! use reactive_resource::rest::{Behaviors, ResourceType, Schema};
//! use serde_json::json;
//!
//! let users = ResourceType::builder("users", Arc::new(HttpClient::new(&config)?))
//!     .schema(Schema::new().plain("name", "").sequence("roles", ["member"]))
//!     .behaviors(Behaviors::new().initialize(|user, source| {
//!         tracing::info!(?source, "user ready");
//!     }))
//!     .build()?;
//!
//! let mut ada = users.instance_from(json!({"name": "Ada"}))?;
//! ada.save().await?;
//!
//! #[derive(serde::Serialize)]
//! struct ByRole<'a> { role: &'a str, limit: u32 }
//! let admins = users.fetch_where(&ByRole { role: "admin", limit: 10 }).await?;
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::clients::{HttpError, HttpRequest, HttpRequestBuilder, Transport};
use crate::config::AttributeName;
use crate::error::ConfigError;
use crate::rest::schema::{validate_members, INITIALIZE_METHOD};
use crate::rest::{
    member_path, normalize_path, Behaviors, ContainerFactory, ResourceError, ResourceInstance,
    ResourceOperation, Schema, StandardContainers,
};

/// Default name of the identifier attribute.
pub const DEFAULT_ID_ATTRIBUTE: &str = "_id";

/// Default prefix marking attributes that are never serialized.
pub const DEFAULT_PRIVATE_PREFIX: &str = "__";

struct Inner {
    path: String,
    schema: Schema,
    behaviors: Behaviors,
    id_attribute: AttributeName,
    private_prefix: String,
    transport: Arc<dyn Transport>,
    containers: Arc<dyn ContainerFactory>,
}

/// An immutable resource type descriptor and instance factory.
///
/// Cloning is cheap; all clones share one descriptor.
#[derive(Clone)]
pub struct ResourceType {
    inner: Arc<Inner>,
}

impl ResourceType {
    /// Starts building a resource type rooted at `path`.
    #[must_use]
    pub fn builder(
        path: impl Into<String>,
        transport: Arc<dyn Transport>,
    ) -> ResourceTypeBuilder {
        ResourceTypeBuilder::new(path, transport)
    }

    /// Returns the collection path, without leading or trailing slashes.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.inner.path
    }

    /// Returns the identifier attribute name.
    #[must_use]
    pub fn id_attribute(&self) -> &str {
        self.inner.id_attribute.as_ref()
    }

    /// Returns the private attribute prefix.
    #[must_use]
    pub fn private_prefix(&self) -> &str {
        &self.inner.private_prefix
    }

    /// Returns the declared schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.inner.schema
    }

    /// Returns the declared behaviors.
    #[must_use]
    pub fn behaviors(&self) -> &Behaviors {
        &self.inner.behaviors
    }

    /// Returns the injected transport.
    #[must_use]
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.inner.transport
    }

    pub(crate) fn containers(&self) -> &dyn ContainerFactory {
        self.inner.containers.as_ref()
    }

    /// Builds an instance from `source`.
    ///
    /// Schema defaults are applied first, then `source`, then the
    /// `initialize` method runs with the raw source.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Attribute`] if a source value does not fit
    /// its declared container, or the error returned by `initialize`.
    pub fn new_instance(
        &self,
        source: Map<String, Value>,
    ) -> Result<ResourceInstance, ResourceError> {
        let mut instance = ResourceInstance::empty(self.clone());
        instance.update_attributes(self.inner.schema.seeds())?;
        instance.update_attributes(source.clone())?;

        if self.inner.behaviors.has_initializer() {
            instance.call(INITIALIZE_METHOD, &[Value::Object(source)])?;
        }
        Ok(instance)
    }

    /// Builds an instance from a JSON object. `null` counts as empty.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::MalformedResponse`] if `source` is neither
    /// an object nor `null`, plus the errors of
    /// [`new_instance`](Self::new_instance).
    pub fn instance_from(&self, source: Value) -> Result<ResourceInstance, ResourceError> {
        match source {
            Value::Object(map) => self.new_instance(map),
            Value::Null => self.new_instance(Map::new()),
            _ => Err(self.malformed(ResourceOperation::Create, "an object")),
        }
    }

    /// Builds an instance holding only the schema defaults.
    ///
    /// # Errors
    ///
    /// Returns the error of the `initialize` method, if any.
    pub fn blank(&self) -> Result<ResourceInstance, ResourceError> {
        self.new_instance(Map::new())
    }

    /// Fetches every record of the collection.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::MalformedResponse`] if the response is not
    /// an array of objects, and transport or status errors from the request.
    pub async fn fetch_all(&self) -> Result<Vec<ResourceInstance>, ResourceError> {
        self.fetch_with(HashMap::new()).await
    }

    /// Fetches the records matching `query`, sent as query parameters.
    ///
    /// `None` fields are skipped, arrays are comma-joined and nested objects
    /// are sent as JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Query`] if `query` cannot be serialized,
    /// plus the errors of [`fetch_all`](Self::fetch_all).
    pub async fn fetch_where<Q: Serialize + ?Sized>(
        &self,
        query: &Q,
    ) -> Result<Vec<ResourceInstance>, ResourceError> {
        let query = serialize_to_query(query)?;
        self.fetch_with(query).await
    }

    async fn fetch_with(
        &self,
        query: HashMap<String, String>,
    ) -> Result<Vec<ResourceInstance>, ResourceError> {
        let mut builder = self.request_for(ResourceOperation::FetchAll, None);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        let request = builder.build().map_err(HttpError::from)?;
        let response = self.dispatch(request, None).await?;

        let Value::Array(items) = response else {
            tracing::warn!(resource = %self.path(), "Collection response was not an array");
            return Err(self.malformed(ResourceOperation::FetchAll, "an array of objects"));
        };

        items
            .into_iter()
            .map(|item| match item {
                Value::Object(source) => self.new_instance(source),
                _ => {
                    tracing::warn!(resource = %self.path(), "Collection item was not an object");
                    Err(self.malformed(ResourceOperation::FetchAll, "an array of objects"))
                }
            })
            .collect()
    }

    /// Starts a request for `operation` using its default verb.
    ///
    /// Member operations are addressed at `path/{id}` when `id` is given.
    pub(crate) fn request_for(
        &self,
        operation: ResourceOperation,
        id: Option<&str>,
    ) -> HttpRequestBuilder {
        let path = match id {
            Some(id) if operation.is_member() => member_path(self.path(), id),
            _ => self.path().to_string(),
        };
        HttpRequest::builder(operation.default_http_method(), path)
    }

    /// Sends `request` and maps non-2xx responses to errors.
    ///
    /// `id` is the member identifier, used to report 404 as `NotFound`.
    pub(crate) async fn dispatch(
        &self,
        request: HttpRequest,
        id: Option<&str>,
    ) -> Result<Value, ResourceError> {
        tracing::debug!(
            method = %request.http_method,
            path = %request.path,
            "Sending resource request"
        );

        let response = self.inner.transport.send(request).await?;

        if !response.is_ok() {
            tracing::debug!(
                resource = %self.path(),
                status = response.code,
                "Resource request failed"
            );
            return Err(ResourceError::from_http_response(
                response.code,
                &response.body,
                self.path(),
                id,
                response.request_id(),
            ));
        }

        Ok(response.body)
    }

    pub(crate) fn malformed(
        &self,
        operation: ResourceOperation,
        expected: &'static str,
    ) -> ResourceError {
        ResourceError::MalformedResponse {
            resource: self.path().to_string(),
            operation: operation.as_str(),
            expected,
        }
    }
}

impl fmt::Debug for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceType")
            .field("path", &self.inner.path)
            .field("schema", &self.inner.schema.names().collect::<Vec<_>>())
            .field("behaviors", &self.inner.behaviors)
            .field("id_attribute", &self.inner.id_attribute)
            .field("private_prefix", &self.inner.private_prefix)
            .field("transport", &self.inner.transport)
            .field("containers", &self.inner.containers)
            .finish()
    }
}

/// Builder for [`ResourceType`].
#[derive(Debug)]
pub struct ResourceTypeBuilder {
    path: String,
    transport: Arc<dyn Transport>,
    schema: Schema,
    behaviors: Behaviors,
    id_attribute: String,
    private_prefix: String,
    containers: Arc<dyn ContainerFactory>,
}

impl ResourceTypeBuilder {
    fn new(path: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            path: path.into(),
            transport,
            schema: Schema::new(),
            behaviors: Behaviors::new(),
            id_attribute: DEFAULT_ID_ATTRIBUTE.to_string(),
            private_prefix: DEFAULT_PRIVATE_PREFIX.to_string(),
            containers: Arc::new(StandardContainers),
        }
    }

    /// Sets the declared attributes.
    #[must_use]
    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    /// Sets the extension members and hooks.
    #[must_use]
    pub fn behaviors(mut self, behaviors: Behaviors) -> Self {
        self.behaviors = behaviors;
        self
    }

    /// Sets the identifier attribute name (default `_id`).
    #[must_use]
    pub fn id_attribute(mut self, name: impl Into<String>) -> Self {
        self.id_attribute = name.into();
        self
    }

    /// Sets the private attribute prefix (default `__`).
    ///
    /// An empty prefix marks no attribute as private.
    #[must_use]
    pub fn private_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.private_prefix = prefix.into();
        self
    }

    /// Sets the factory that creates attribute containers.
    #[must_use]
    pub fn containers(mut self, containers: Arc<dyn ContainerFactory>) -> Self {
        self.containers = containers;
        self
    }

    /// Builds the resource type.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyResourcePath`] if the path has no
    /// segments, [`ConfigError::EmptyAttributeName`] if the identifier or a
    /// member name is empty, and [`ConfigError::DuplicateMember`] if a name
    /// is declared twice across schema and behaviors.
    pub fn build(self) -> Result<ResourceType, ConfigError> {
        let path = normalize_path(&self.path);
        if path.is_empty() {
            return Err(ConfigError::EmptyResourcePath);
        }
        let id_attribute = AttributeName::new(self.id_attribute)?;
        validate_members(&self.schema, &self.behaviors)?;

        Ok(ResourceType {
            inner: Arc::new(Inner {
                path,
                schema: self.schema,
                behaviors: self.behaviors,
                id_attribute,
                private_prefix: self.private_prefix,
                transport: self.transport,
                containers: self.containers,
            }),
        })
    }
}

/// Serializes a params struct to a query parameter map.
///
/// Null values are skipped, arrays of scalars are comma-joined and objects
/// are encoded as JSON text. Anything that is not an object yields an empty
/// map.
///
/// # Errors
///
/// Returns [`ResourceError::Query`] if `params` cannot be serialized.
pub fn serialize_to_query<T: Serialize + ?Sized>(
    params: &T,
) -> Result<HashMap<String, String>, ResourceError> {
    let value = serde_json::to_value(params)?;

    let mut query = HashMap::new();

    if let Value::Object(map) = value {
        for (key, val) in map {
            match val {
                Value::Null => {}
                Value::String(s) => {
                    query.insert(key, s);
                }
                Value::Number(n) => {
                    query.insert(key, n.to_string());
                }
                Value::Bool(b) => {
                    query.insert(key, b.to_string());
                }
                Value::Array(arr) => {
                    let values: Vec<String> = arr
                        .iter()
                        .filter_map(|v| match v {
                            Value::String(s) => Some(s.clone()),
                            Value::Number(n) => Some(n.to_string()),
                            Value::Bool(b) => Some(b.to_string()),
                            _ => None,
                        })
                        .collect();
                    if !values.is_empty() {
                        query.insert(key, values.join(","));
                    }
                }
                Value::Object(_) => {
                    query.insert(key, val.to_string());
                }
            }
        }
    }

    Ok(query)
}

// Verify types are Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ResourceType>();
    assert_send_sync::<ResourceTypeBuilder>();
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{HttpMethod, HttpResponse};
    use crate::rest::{Attribute, AttributeKind, Element};
    use crate::reactive::Observable;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Debug)]
    struct Fixed {
        response: HttpResponse,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl Fixed {
        fn new(code: u16, body: Value) -> Arc<Self> {
            Arc::new(Self {
                response: HttpResponse::with_body(code, body),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Transport for Fixed {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
            self.requests.lock().unwrap().push(request);
            Ok(self.response.clone())
        }
    }

    fn offline() -> Arc<Fixed> {
        Fixed::new(503, Value::Null)
    }

    #[test]
    fn test_builder_defaults() {
        let users = ResourceType::builder("/users/", offline()).build().unwrap();
        assert_eq!(users.path(), "users");
        assert_eq!(users.id_attribute(), DEFAULT_ID_ATTRIBUTE);
        assert_eq!(users.private_prefix(), DEFAULT_PRIVATE_PREFIX);
        assert!(users.schema().is_empty());
    }

    #[test]
    fn test_builder_rejects_empty_path() {
        let result = ResourceType::builder("/", offline()).build();
        assert!(matches!(result, Err(ConfigError::EmptyResourcePath)));
    }

    #[test]
    fn test_builder_rejects_empty_id_attribute() {
        let result = ResourceType::builder("users", offline())
            .id_attribute("")
            .build();
        assert!(matches!(result, Err(ConfigError::EmptyAttributeName)));
    }

    #[test]
    fn test_builder_rejects_member_collisions() {
        let result = ResourceType::builder("users", offline())
            .schema(Schema::new().plain("kind", ""))
            .behaviors(Behaviors::new().field("kind", "person"))
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::DuplicateMember { ref name }) if name == "kind"
        ));
    }

    #[test]
    fn test_new_instance_merges_defaults_and_source() {
        let users = ResourceType::builder("users", offline())
            .schema(Schema::new().plain("name", "anonymous").plain("age", 0))
            .build()
            .unwrap();

        let user = users
            .instance_from(json!({"name": "Ada", "email": "ada@example.com"}))
            .unwrap();

        assert_eq!(user.attribute_names(), vec!["age", "email", "name"]);
        assert_eq!(user.get("name"), Some(json!("Ada")));
        assert_eq!(user.get("age"), Some(json!(0)));
    }

    #[test]
    fn test_declared_kind_wins_over_source_shape() {
        let users = ResourceType::builder("users", offline())
            .schema(
                Schema::new()
                    .plain("point", json!([0, 0]))
                    .sequence("tags", Vec::<Value>::new()),
            )
            .build()
            .unwrap();

        let user = users.instance_from(json!({"point": [1, 2], "tags": null})).unwrap();
        assert_eq!(
            user.attribute("point").map(|a| a.kind()),
            Some(AttributeKind::Plain)
        );
        assert_eq!(user.get("point"), Some(json!([1, 2])));
        assert_eq!(user.get("tags"), Some(json!([])));
    }

    #[test]
    fn test_source_not_fitting_sequence_fails() {
        let users = ResourceType::builder("users", offline())
            .schema(Schema::new().sequence("tags", Vec::<Value>::new()))
            .build()
            .unwrap();

        let result = users.instance_from(json!({"tags": "a,b"}));
        assert!(matches!(result, Err(ResourceError::Attribute { .. })));
    }

    #[test]
    fn test_instance_from_rejects_non_object() {
        let users = ResourceType::builder("users", offline()).build().unwrap();
        assert!(users.instance_from(Value::Null).is_ok());
        assert!(matches!(
            users.instance_from(json!([1])),
            Err(ResourceError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn test_initialize_runs_once_after_materialization() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let users = ResourceType::builder("users", offline())
            .schema(Schema::new().plain("name", "").plain("label", ""))
            .behaviors(Behaviors::new().initialize(move |user, source| {
                counter.fetch_add(1, Ordering::SeqCst);
                let name = user.get("name").unwrap_or(Value::Null);
                let raw = source.get("name").cloned().unwrap_or(Value::Null);
                user.set("label", json!(format!("{name}/{raw}"))).unwrap();
            }))
            .build()
            .unwrap();

        let user = users.instance_from(json!({"name": "Ada"})).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(user.get("label"), Some(json!(r#""Ada"/"Ada""#)));
    }

    #[test]
    fn test_containers_factory_is_used_for_new_attributes() {
        #[derive(Debug, Default)]
        struct Counting {
            plain: AtomicUsize,
            sequence: AtomicUsize,
        }

        impl ContainerFactory for Counting {
            fn plain(&self, _name: &str, value: Value) -> Attribute {
                self.plain.fetch_add(1, Ordering::SeqCst);
                Attribute::Plain(Observable::new(value))
            }

            fn sequence(&self, _name: &str, elements: Vec<Element>) -> Attribute {
                self.sequence.fetch_add(1, Ordering::SeqCst);
                Attribute::Sequence(Observable::new(elements))
            }
        }

        let factory = Arc::new(Counting::default());
        let users = ResourceType::builder("users", offline())
            .schema(Schema::new().plain("name", ""))
            .containers(Arc::clone(&factory) as Arc<dyn ContainerFactory>)
            .build()
            .unwrap();

        let user = users.instance_from(json!({"name": "Ada", "tags": ["x"]})).unwrap();
        user.set("name", json!("Grace")).unwrap();

        assert_eq!(factory.plain.load(Ordering::SeqCst), 1);
        assert_eq!(factory.sequence.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_all_maps_each_item() {
        let transport = Fixed::new(200, json!([{"_id": "1", "name": "Ada"}, {"_id": "2"}]));
        let users = ResourceType::builder("users", Arc::clone(&transport) as Arc<dyn Transport>)
            .schema(Schema::new().plain("name", "anonymous"))
            .build()
            .unwrap();

        let all = users.fetch_all().await.unwrap();

        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id(), Some("1".to_string()));
        assert_eq!(all[1].get("name"), Some(json!("anonymous")));

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests[0].http_method, HttpMethod::Get);
        assert_eq!(requests[0].path, "users");
        assert!(requests[0].query.is_none());
    }

    #[tokio::test]
    async fn test_fetch_where_sends_query() {
        #[derive(Serialize)]
        struct ByRole {
            role: &'static str,
            ids: Vec<u32>,
            cursor: Option<String>,
        }

        let transport = Fixed::new(200, json!([]));
        let users = ResourceType::builder("users", Arc::clone(&transport) as Arc<dyn Transport>)
            .build()
            .unwrap();

        let found = users
            .fetch_where(&ByRole {
                role: "admin",
                ids: vec![1, 2],
                cursor: None,
            })
            .await
            .unwrap();
        assert!(found.is_empty());

        let requests = transport.requests.lock().unwrap();
        let query = requests[0].query.as_ref().unwrap();
        assert_eq!(query.get("role"), Some(&"admin".to_string()));
        assert_eq!(query.get("ids"), Some(&"1,2".to_string()));
        assert!(!query.contains_key("cursor"));
    }

    #[tokio::test]
    async fn test_fetch_all_rejects_non_array() {
        let users = ResourceType::builder("users", Fixed::new(200, json!({"users": []})))
            .build()
            .unwrap();

        let error = users.fetch_all().await.unwrap_err();
        assert!(matches!(
            error,
            ResourceError::MalformedResponse { operation: "fetch_all", .. }
        ));
    }

    #[tokio::test]
    async fn test_fetch_all_rejects_non_object_items() {
        let users = ResourceType::builder("users", Fixed::new(200, json!([{"_id": "1"}, 2])))
            .build()
            .unwrap();
        assert!(users.fetch_all().await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_all_surfaces_status_errors() {
        let users = ResourceType::builder("users", Fixed::new(404, json!({"error": "nope"})))
            .build()
            .unwrap();

        let error = users.fetch_all().await.unwrap_err();
        assert!(matches!(error, ResourceError::Status { code: 404, .. }));
    }

    #[test]
    fn test_serialize_to_query_handles_basic_types() {
        #[derive(Serialize)]
        struct Params {
            limit: u32,
            title: String,
            published: bool,
        }

        let query = serialize_to_query(&Params {
            limit: 50,
            title: "Test".to_string(),
            published: true,
        })
        .unwrap();

        assert_eq!(query.get("limit"), Some(&"50".to_string()));
        assert_eq!(query.get("title"), Some(&"Test".to_string()));
        assert_eq!(query.get("published"), Some(&"true".to_string()));
    }

    #[test]
    fn test_serialize_to_query_encodes_objects_as_json() {
        let query = serialize_to_query(&json!({"filter": {"age": 3}, "none": null})).unwrap();
        assert_eq!(query.get("filter"), Some(&r#"{"age":3}"#.to_string()));
        assert!(!query.contains_key("none"));
    }

    #[test]
    fn test_serialize_to_query_non_object_is_empty() {
        assert!(serialize_to_query(&json!([1, 2])).unwrap().is_empty());
    }

    #[test]
    fn test_request_for_uses_operation_verb_and_url() {
        let users = ResourceType::builder("/users/", Fixed::new(200, json!({})))
            .build()
            .unwrap();

        let fetch = users
            .request_for(ResourceOperation::Fetch, Some("a b"))
            .build()
            .unwrap();
        assert_eq!(fetch.http_method, HttpMethod::Get);
        assert_eq!(fetch.path, "users/a%20b");

        let update = users
            .request_for(ResourceOperation::Update, Some("1"))
            .body(json!({}))
            .build()
            .unwrap();
        assert_eq!(update.http_method, HttpMethod::Put);
        assert_eq!(update.path, "users/1");

        let destroy = users
            .request_for(ResourceOperation::Destroy, Some("1"))
            .build()
            .unwrap();
        assert_eq!(destroy.http_method, HttpMethod::Delete);
        assert_eq!(destroy.path, "users/1");

        let create = users
            .request_for(ResourceOperation::Create, Some("1"))
            .body(json!({}))
            .build()
            .unwrap();
        assert_eq!(create.http_method, HttpMethod::Post);
        assert_eq!(create.path, "users");

        let all = users
            .request_for(ResourceOperation::FetchAll, None)
            .build()
            .unwrap();
        assert_eq!(all.http_method, HttpMethod::Get);
        assert_eq!(all.path, "users");
    }
}
