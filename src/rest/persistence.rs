//! Create, read, update and delete operations on instances.
//!
//! | Method | Precondition | Request | On success |
//! |---|---|---|---|
//! | [`save`](ResourceInstance::save) (no id) | not deleted | `POST path` + snapshot | identifier merged |
//! | [`save`](ResourceInstance::save) (id) | not deleted | `PUT path/{id}` + snapshot | object response merged |
//! | [`fetch`](ResourceInstance::fetch) | id, not deleted | `GET path/{id}` | response merged |
//! | [`destroy`](ResourceInstance::destroy) | id, not deleted | `DELETE path/{id}` | state becomes `Deleted` |
//! | [`request`](ResourceInstance::request) | not deleted | `VERB path/{action}` | response returned |
//!
//! Every operation takes `&mut self`, so operations on one instance run one
//! at a time. Responses are merged through
//! [`update_attributes`](ResourceInstance::update_attributes), which keeps
//! existing containers and therefore existing subscriptions.
//!
//! Precondition failures are returned before any request is issued.

use serde_json::{Map, Value};

use crate::clients::{HttpError, HttpMethod, HttpRequest};
use crate::rest::schema::Hook;
use crate::rest::{
    action_path, serialize, serialize_to_query, ResourceError, ResourceInstance, ResourceOperation,
};

impl ResourceInstance {
    /// Creates the record on the server, or updates it if it has an id.
    ///
    /// Returns the parsed response. The `on_save` hook runs afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InstanceDeleted`] after `destroy`,
    /// [`ResourceError::MalformedResponse`] if a create response carries no
    /// identifier, and transport or status errors from the request.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let mut user = users.instance_from(json!({"name": "Ada"}))?;
    /// user.save().await?;            // POST users
    /// assert!(user.id().is_some());
    ///
    /// user.set("name", json!("Grace"))?;
    /// user.save().await?;            // PUT users/{id}
    /// ```
    pub async fn save(&mut self) -> Result<Value, ResourceError> {
        match self.id() {
            Some(id) => self.update(&id).await,
            None => self.create().await,
        }
    }

    async fn create(&mut self) -> Result<Value, ResourceError> {
        self.ensure_live(ResourceOperation::Create)?;
        let resource = self.resource().clone();

        let request = resource
            .request_for(ResourceOperation::Create, None)
            .body(Value::Object(serialize(self)))
            .build()
            .map_err(HttpError::from)?;
        let response = resource.dispatch(request, None).await?;

        let id_attribute = resource.id_attribute();
        let id = response
            .get(id_attribute)
            .filter(|id| !id.is_null())
            .cloned()
            .ok_or_else(|| {
                tracing::warn!(
                    resource = %resource.path(),
                    id_attribute = %id_attribute,
                    "Create response carried no identifier"
                );
                resource.malformed(
                    ResourceOperation::Create,
                    "an object containing the identifier",
                )
            })?;
        self.update_attributes([(id_attribute, id)])?;

        self.run_hook(resource.behaviors().save_hook(), &response);
        Ok(response)
    }

    async fn update(&mut self, id: &str) -> Result<Value, ResourceError> {
        self.ensure_live(ResourceOperation::Update)?;
        let resource = self.resource().clone();

        let request = resource
            .request_for(ResourceOperation::Update, Some(id))
            .body(Value::Object(serialize(self)))
            .build()
            .map_err(HttpError::from)?;
        let response = resource.dispatch(request, Some(id)).await?;

        if let Value::Object(data) = &response {
            self.update_attributes(data.clone())?;
        }

        self.run_hook(resource.behaviors().save_hook(), &response);
        Ok(response)
    }

    /// Refreshes the instance from the server.
    ///
    /// Existing containers are updated in place, so subscribers see the new
    /// values without subscribing again. The `on_fetch` hook runs afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::MissingIdentifier`] if the instance has no
    /// id, [`ResourceError::MalformedResponse`] if the response is not an
    /// object, and transport or status errors from the request.
    pub async fn fetch(&mut self) -> Result<Value, ResourceError> {
        let id = self.require_id(ResourceOperation::Fetch)?;
        let resource = self.resource().clone();

        let request = resource
            .request_for(ResourceOperation::Fetch, Some(&id))
            .build()
            .map_err(HttpError::from)?;
        let response = resource.dispatch(request, Some(&id)).await?;

        let Value::Object(data) = &response else {
            tracing::warn!(
                resource = %resource.path(),
                id = %id,
                "Fetch response was not an object"
            );
            return Err(resource.malformed(ResourceOperation::Fetch, "an object"));
        };
        self.update_attributes(data.clone())?;

        self.run_hook(resource.behaviors().fetch_hook(), &response);
        Ok(response)
    }

    /// Deletes the record on the server.
    ///
    /// The instance moves to [`ResourceState::Deleted`](crate::rest::ResourceState::Deleted)
    /// and keeps its last values for display; any later operation fails
    /// with [`ResourceError::InstanceDeleted`]. The `on_destroy` hook runs
    /// afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::MissingIdentifier`] if the instance has no
    /// id, and transport or status errors from the request.
    pub async fn destroy(&mut self) -> Result<Value, ResourceError> {
        let id = self.require_id(ResourceOperation::Destroy)?;
        let resource = self.resource().clone();

        let request = resource
            .request_for(ResourceOperation::Destroy, Some(&id))
            .build()
            .map_err(HttpError::from)?;
        let response = resource.dispatch(request, Some(&id)).await?;

        self.deleted = true;
        self.run_hook(resource.behaviors().destroy_hook(), &response);
        Ok(response)
    }

    /// Calls a custom action with an empty payload.
    ///
    /// Same as `request_with(method, action, json!({}))`.
    ///
    /// # Errors
    ///
    /// See [`request_with`](Self::request_with).
    pub async fn request(
        &mut self,
        method: HttpMethod,
        action: &str,
    ) -> Result<Value, ResourceError> {
        self.request_with(method, action, Value::Object(Map::new()))
            .await
    }

    /// Calls a custom action at `path/{action}`.
    ///
    /// For `GET` and `DELETE`, `data` is sent as query parameters; for other
    /// verbs it is the JSON body. The parsed response is returned without
    /// being merged into the instance.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InstanceDeleted`] after `destroy`, and
    /// transport or status errors from the request.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let id = user.id().unwrap();
    /// let result = user
    ///     .request_with(HttpMethod::Post, &format!("{id}/activate"), json!({"notify": true}))
    ///     .await?;
    /// ```
    pub async fn request_with(
        &mut self,
        method: HttpMethod,
        action: &str,
        data: Value,
    ) -> Result<Value, ResourceError> {
        if self.deleted {
            return Err(self.deleted_error("request"));
        }
        let resource = self.resource().clone();

        let builder = HttpRequest::builder(method, action_path(resource.path(), action));
        let builder = if method.requires_body() {
            builder.body(data)
        } else {
            let query = serialize_to_query(&data)?;
            if query.is_empty() {
                builder
            } else {
                builder.query(query)
            }
        };
        let request = builder.build().map_err(HttpError::from)?;

        resource.dispatch(request, None).await
    }

    fn ensure_live(&self, operation: ResourceOperation) -> Result<(), ResourceError> {
        if self.deleted {
            Err(self.deleted_error(operation.as_str()))
        } else {
            Ok(())
        }
    }

    fn require_id(&self, operation: ResourceOperation) -> Result<String, ResourceError> {
        self.ensure_live(operation)?;
        self.id().ok_or_else(|| ResourceError::MissingIdentifier {
            resource: self.resource().path().to_string(),
            operation: operation.as_str(),
        })
    }

    fn deleted_error(&self, operation: &'static str) -> ResourceError {
        ResourceError::InstanceDeleted {
            resource: self.resource().path().to_string(),
            id: self.id().unwrap_or_default(),
            operation,
        }
    }

    fn run_hook(&mut self, hook: Option<&Hook>, response: &Value) {
        if let Some(hook) = hook {
            hook(self, response);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{HttpResponse, Transport};
    use crate::rest::{Behaviors, ResourceState, ResourceType, Schema};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    /// Replies with queued responses and records every request.
    #[derive(Debug, Default)]
    struct Scripted {
        responses: Mutex<Vec<HttpResponse>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl Scripted {
        fn replying(responses: Vec<HttpResponse>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into_iter().rev().collect()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for Scripted {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| HttpError::Connection {
                    message: "no scripted response".to_string(),
                })
        }
    }

    fn users(transport: Arc<Scripted>, behaviors: Behaviors) -> ResourceType {
        ResourceType::builder("users", transport)
            .schema(Schema::new().plain("name", "").plain("__dirty", false))
            .behaviors(behaviors)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_save_without_id_posts_and_merges_identifier() {
        let transport = Scripted::replying(vec![HttpResponse::with_body(
            201,
            json!({"_id": "abc", "name": "ignored"}),
        )]);
        let mut user = users(Arc::clone(&transport), Behaviors::new())
            .instance_from(json!({"name": "Ada"}))
            .unwrap();

        user.save().await.unwrap();

        assert_eq!(user.id(), Some("abc".to_string()));
        assert_eq!(user.get("name"), Some(json!("Ada")));
        assert_eq!(user.state(), ResourceState::Saved);

        let requests = transport.requests();
        assert_eq!(requests[0].http_method, HttpMethod::Post);
        assert_eq!(requests[0].path, "users");
        assert_eq!(requests[0].body, Some(json!({"name": "Ada"})));
    }

    #[tokio::test]
    async fn test_save_with_id_puts_and_merges_object_response() {
        let transport = Scripted::replying(vec![HttpResponse::with_body(
            200,
            json!({"_id": "abc", "name": "Ada", "updated": true}),
        )]);
        let mut user = users(Arc::clone(&transport), Behaviors::new())
            .instance_from(json!({"_id": "abc", "name": "Ada"}))
            .unwrap();

        user.save().await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests[0].http_method, HttpMethod::Put);
        assert_eq!(requests[0].path, "users/abc");
        assert_eq!(
            requests[0].body,
            Some(json!({"_id": "abc", "name": "Ada"}))
        );
        assert_eq!(user.get("updated"), Some(json!(true)));
    }

    #[tokio::test]
    async fn test_save_accepts_empty_update_response() {
        let transport = Scripted::replying(vec![HttpResponse::with_body(204, Value::Null)]);
        let mut user = users(Arc::clone(&transport), Behaviors::new())
            .instance_from(json!({"_id": 7}))
            .unwrap();

        assert_eq!(user.save().await.unwrap(), Value::Null);
        assert_eq!(transport.requests()[0].path, "users/7");
    }

    #[tokio::test]
    async fn test_create_without_identifier_is_malformed() {
        let transport = Scripted::replying(vec![HttpResponse::with_body(201, json!({"ok": true}))]);
        let mut user = users(transport, Behaviors::new()).blank().unwrap();

        let error = user.save().await.unwrap_err();
        assert!(matches!(
            error,
            ResourceError::MalformedResponse { operation: "create", .. }
        ));
        assert_eq!(user.state(), ResourceState::Unsaved);
    }

    #[tokio::test]
    async fn test_fetch_without_identifier_fails_before_request() {
        let transport = Scripted::replying(Vec::new());
        let mut user = users(Arc::clone(&transport), Behaviors::new())
            .blank()
            .unwrap();

        let error = user.fetch().await.unwrap_err();
        assert!(matches!(
            error,
            ResourceError::MissingIdentifier { operation: "fetch", .. }
        ));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_rejects_non_object_response() {
        let transport = Scripted::replying(vec![HttpResponse::with_body(200, json!([1, 2]))]);
        let mut user = users(transport, Behaviors::new())
            .instance_from(json!({"_id": "abc"}))
            .unwrap();

        let error = user.fetch().await.unwrap_err();
        assert!(matches!(
            error,
            ResourceError::MalformedResponse { operation: "fetch", .. }
        ));
    }

    #[tokio::test]
    async fn test_fetch_maps_404_to_not_found() {
        let transport = Scripted::replying(vec![HttpResponse::with_body(
            404,
            json!({"reason": "archived"}),
        )]);
        let mut user = users(transport, Behaviors::new())
            .instance_from(json!({"_id": "gone"}))
            .unwrap();

        let error = user.fetch().await.unwrap_err();
        assert!(matches!(
            error,
            ResourceError::NotFound { ref id, ref body, .. }
                if id == "gone" && body == &json!({"reason": "archived"})
        ));
    }

    #[tokio::test]
    async fn test_destroy_marks_deleted_and_blocks_further_operations() {
        let transport = Scripted::replying(vec![HttpResponse::with_body(200, json!({}))]);
        let mut user = users(Arc::clone(&transport), Behaviors::new())
            .instance_from(json!({"_id": "abc", "name": "Ada"}))
            .unwrap();

        user.destroy().await.unwrap();
        assert_eq!(user.state(), ResourceState::Deleted);
        assert_eq!(user.get("name"), Some(json!("Ada")));
        assert_eq!(transport.requests()[0].http_method, HttpMethod::Delete);

        let error = user.save().await.unwrap_err();
        assert!(matches!(
            error,
            ResourceError::InstanceDeleted { ref id, operation: "update", .. } if id == "abc"
        ));
        assert!(user.request(HttpMethod::Get, "stats").await.is_err());
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_hooks_run_with_instance_and_response() {
        let transport = Scripted::replying(vec![
            HttpResponse::with_body(201, json!({"_id": "abc"})),
            HttpResponse::with_body(200, json!({"name": "Fetched"})),
            HttpResponse::with_body(200, json!({"deleted": true})),
        ]);
        let log = Arc::new(Mutex::new(Vec::new()));
        let save_log = Arc::clone(&log);
        let fetch_log = Arc::clone(&log);
        let destroy_log = Arc::clone(&log);

        let behaviors = Behaviors::new()
            .on_save(move |instance, _| {
                save_log
                    .lock()
                    .unwrap()
                    .push(format!("save {:?}", instance.id()));
            })
            .on_fetch(move |instance, _| {
                fetch_log
                    .lock()
                    .unwrap()
                    .push(format!("fetch {:?}", instance.get("name")));
            })
            .on_destroy(move |_, response| {
                destroy_log
                    .lock()
                    .unwrap()
                    .push(format!("destroy {response}"));
            });

        let mut user = users(transport, behaviors).blank().unwrap();
        user.save().await.unwrap();
        user.fetch().await.unwrap();
        user.destroy().await.unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                r#"save Some("abc")"#.to_string(),
                r#"fetch Some(String("Fetched"))"#.to_string(),
                r#"destroy {"deleted":true}"#.to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_request_defaults_to_empty_payload() {
        let transport = Scripted::replying(vec![
            HttpResponse::with_body(200, json!({"ok": 1})),
            HttpResponse::with_body(200, json!({"ok": 1})),
        ]);
        let mut user = users(Arc::clone(&transport), Behaviors::new())
            .blank()
            .unwrap();

        let short = user.request(HttpMethod::Post, "abc/activate").await.unwrap();
        let long = user
            .request_with(HttpMethod::Post, "abc/activate", json!({}))
            .await
            .unwrap();

        assert_eq!(short, long);
        let requests = transport.requests();
        assert_eq!(requests[0], requests[1]);
        assert_eq!(requests[0].path, "users/abc/activate");
        assert_eq!(requests[0].body, Some(json!({})));
    }

    #[tokio::test]
    async fn test_get_request_sends_data_as_query() {
        let transport = Scripted::replying(vec![HttpResponse::with_body(200, json!([]))]);
        let mut user = users(Arc::clone(&transport), Behaviors::new())
            .blank()
            .unwrap();

        user.request_with(HttpMethod::Get, "search", json!({"q": "ada", "limit": 5}))
            .await
            .unwrap();

        let request = &transport.requests()[0];
        assert_eq!(request.path, "users/search");
        assert!(request.body.is_none());
        let query = request.query.as_ref().unwrap();
        assert_eq!(query.get("q"), Some(&"ada".to_string()));
        assert_eq!(query.get("limit"), Some(&"5".to_string()));
    }

    #[tokio::test]
    async fn test_transport_failure_is_surfaced() {
        let transport = Scripted::replying(Vec::new());
        let mut user = users(transport, Behaviors::new()).blank().unwrap();

        let error = user.save().await.unwrap_err();
        assert!(matches!(error, ResourceError::Transport(_)));
    }

    #[tokio::test]
    async fn test_server_error_carries_status_and_body() {
        let transport = Scripted::replying(vec![HttpResponse::with_body(
            500,
            json!({"error": "boom"}),
        )]);
        let mut user = users(transport, Behaviors::new())
            .instance_from(json!({"_id": "abc"}))
            .unwrap();

        match user.save().await.unwrap_err() {
            ResourceError::Status { code, body, .. } => {
                assert_eq!(code, 500);
                assert_eq!(body, json!({"error": "boom"}));
            }
            other => panic!("Expected Status error, got {other:?}"),
        }
    }
}
