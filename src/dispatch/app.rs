//! The dispatcher: fans one request out to every provider and folds the results.
//!
//! # Responsibilities
//! - Hold providers in registration order
//! - Query each provider's router in that order, awaiting one at a time
//! - Fold partial results with the merge algebra
//! - Contain provider failures at the invocation boundary
//! - Run startup hooks forward and shutdown hooks in reverse
//!
//! # Status Mapping
//! - Nothing contributed: 404
//! - The first contribution was contradicted by every later one: 400
//! - Otherwise: default status of the first contributing rule

use async_trait::async_trait;
use axum::http::StatusCode;
use std::sync::Arc;

use crate::dispatch::error::{DispatchError, HandlerError};
use crate::dispatch::request::Request;
use crate::dispatch::response::{Content, MergeOutcome, Response};
use crate::observability::metrics;
use crate::routing::{Outcome, Router};

/// A mountable bundle of routes with optional lifecycle hooks.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Identity used in logs and metrics.
    fn name(&self) -> &str;

    fn router(&self) -> &Router;

    async fn on_startup(&self) -> Result<(), HandlerError> {
        Ok(())
    }

    async fn on_shutdown(&self) -> Result<(), HandlerError> {
        Ok(())
    }
}

/// A provider that is nothing but a named router.
pub struct RouterProvider {
    name: String,
    router: Router,
}

impl RouterProvider {
    pub fn new(name: impl Into<String>, router: Router) -> Self {
        Self {
            name: name.into(),
            router,
        }
    }
}

#[async_trait]
impl Provider for RouterProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn router(&self) -> &Router {
        &self.router
    }
}

/// Ordered collection of providers.
#[derive(Clone)]
pub struct App {
    providers: Vec<Arc<dyn Provider>>,
}

/// Builder fixing the provider order.
#[derive(Default)]
pub struct AppBuilder {
    providers: Vec<Arc<dyn Provider>>,
}

impl AppBuilder {
    pub fn provider(mut self, provider: impl Provider + 'static) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    pub fn shared(mut self, provider: Arc<dyn Provider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn build(self) -> App {
        App {
            providers: self.providers,
        }
    }
}

/// Running totals for one dispatch.
#[derive(Default)]
struct Fold {
    content: Content,
    status: Option<StatusCode>,
    accepted: usize,
    rejected: usize,
}

impl Fold {
    fn absorb(&mut self, provider: &str, status: StatusCode, content: Content) {
        let was_empty = self.content.is_none();
        match self.content.merge(content) {
            Ok(MergeOutcome::Merged) => {
                self.accepted += 1;
                if was_empty {
                    self.status = Some(status);
                }
            }
            Ok(MergeOutcome::KeptFirst) => {
                tracing::warn!(provider = %provider, "Scalar collision, keeping first value");
            }
            Ok(MergeOutcome::Ignored) => {}
            Err(e) => {
                tracing::warn!(provider = %provider, error = %e, "Aggregation error, dropping contribution");
                metrics::record_merge_conflict();
                self.rejected += 1;
            }
        }
    }

    fn finish(self) -> Response {
        if self.content.is_none() {
            return Response::not_found();
        }
        let status = if self.accepted == 1 && self.rejected > 0 {
            StatusCode::BAD_REQUEST
        } else {
            self.status.unwrap_or(StatusCode::OK)
        };
        Response::new(status, self.content)
    }
}

impl App {
    pub fn builder() -> AppBuilder {
        AppBuilder::default()
    }

    /// Provider names in registration order.
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Route `request` through every provider and aggregate the results.
    pub async fn dispatch(&self, request: Request) -> Response {
        let request = Arc::new(request);
        let mut fold = Fold::default();

        for provider in &self.providers {
            let name = provider.name();
            match provider.router().handle(name, &request).await {
                Ok(None) => {}
                Ok(Some(Outcome::Authoritative(response))) => {
                    tracing::debug!(provider = %name, "Authoritative response");
                    return response;
                }
                Ok(Some(Outcome::Partial { status, content })) => {
                    fold.absorb(name, status, content);
                }
                Err(source) => {
                    let error = DispatchError::HandlerFault {
                        provider: name.to_string(),
                        source,
                    };
                    tracing::error!(provider = %name, error = %error, "Handler fault, skipping provider");
                    metrics::record_provider_fault(name);
                }
            }

            if request.is_aborted() {
                tracing::debug!(provider = %name, path = %request.path_string(), "Dispatch aborted");
                break;
            }
        }

        if fold.content.is_none() {
            let error = DispatchError::RouteNotFound {
                method: request.method.to_string(),
                path: request.path_string(),
            };
            tracing::debug!(error = %error, "Nothing answered");
        }
        fold.finish()
    }

    /// Run startup hooks in registration order.
    pub async fn startup(&self) {
        for provider in &self.providers {
            if let Err(e) = provider.on_startup().await {
                tracing::error!(provider = %provider.name(), error = %e, "Startup hook failed");
            }
        }
        tracing::info!(providers = self.providers.len(), "Providers started");
    }

    /// Run shutdown hooks in reverse registration order.
    pub async fn shutdown(&self) {
        for provider in self.providers.iter().rev() {
            if let Err(e) = provider.on_shutdown().await {
                tracing::error!(provider = %provider.name(), error = %e, "Shutdown hook failed");
            }
        }
        tracing::info!("Providers stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::request::Method;
    use crate::dispatch::response::Reply;
    use crate::routing::{handler, sync_handler, Rule};
    use serde_json::{json, Value};
    use std::sync::Mutex;

    fn returning(name: &str, path: &str, value: Value) -> RouterProvider {
        let rule = Rule::get(path)
            .to(sync_handler(move |_| Ok(value.clone().into())))
            .unwrap();
        RouterProvider::new(name, Router::new().route(rule))
    }

    fn failing(name: &str, path: &str) -> RouterProvider {
        let rule = Rule::get(path)
            .to(handler(|_| async { Err::<Reply, _>(HandlerError::Internal("backend down".into())) }))
            .unwrap();
        RouterProvider::new(name, Router::new().route(rule))
    }

    fn get(path: &str) -> Request {
        Request::parse(Method::Get, path, None)
    }

    #[tokio::test]
    async fn test_lists_concatenate_in_registration_order() {
        let app = App::builder()
            .provider(returning("p1", "/channels", json!(["a", "b"])))
            .provider(returning("p2", "/channels", json!(["c"])))
            .build();
        let response = app.dispatch(get("/channels")).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.content, Content::from(json!(["a", "b", "c"])));
    }

    #[tokio::test]
    async fn test_dicts_last_registered_wins() {
        let app = App::builder()
            .provider(returning("p1", "/info", json!({"x": 1})))
            .provider(returning("p2", "/info", json!({"x": 2, "y": 3})))
            .build();
        let response = app.dispatch(get("/info")).await;
        assert_eq!(response.content, Content::from(json!({"x": 2, "y": 3})));
    }

    #[tokio::test]
    async fn test_reordering_keeps_list_membership() {
        let forward = App::builder()
            .provider(returning("p1", "/c", json!(["a"])))
            .provider(returning("p2", "/c", json!(["b"])))
            .build();
        let reverse = App::builder()
            .provider(returning("p2", "/c", json!(["b"])))
            .provider(returning("p1", "/c", json!(["a"])))
            .build();

        let collect = |r: Response| {
            let mut items: Vec<String> = match r.content {
                Content::List(items) => items.iter().map(|v| v.to_string()).collect(),
                other => panic!("unexpected {:?}", other),
            };
            items.sort();
            items
        };
        assert_eq!(
            collect(forward.dispatch(get("/c")).await),
            collect(reverse.dispatch(get("/c")).await)
        );
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn test_handler_fault_is_contained() {
        let app = App::builder()
            .provider(returning("p1", "/channels", json!(["a"])))
            .provider(failing("broken", "/channels"))
            .provider(returning("p3", "/channels", json!(["c"])))
            .build();
        let response = app.dispatch(get("/channels")).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.content, Content::from(json!(["a", "c"])));
        assert!(logs_contain("Handler fault, skipping provider"));
        assert!(logs_contain("provider=broken"));
        assert!(!logs_contain("provider=p3"));
    }

    #[tokio::test]
    async fn test_unmatched_is_not_found() {
        let app = App::builder()
            .provider(returning("p1", "/channels", json!(["a"])))
            .build();
        let response = app.dispatch(get("/nothing")).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);

        let only_fault = App::builder().provider(failing("broken", "/x")).build();
        assert_eq!(only_fault.dispatch(get("/x")).await.status, StatusCode::NOT_FOUND);

        let only_none = App::builder()
            .provider(returning("p1", "/x", Value::Null))
            .build();
        assert_eq!(only_none.dispatch(get("/x")).await.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_kind_mismatch() {
        let app = App::builder()
            .provider(returning("p1", "/x", json!(["a"])))
            .provider(returning("p2", "/x", json!({"k": 1})))
            .build();
        let response = app.dispatch(get("/x")).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.content, Content::from(json!(["a"])));

        let app = App::builder()
            .provider(returning("p1", "/x", json!(["a"])))
            .provider(returning("p2", "/x", json!(7)))
            .provider(returning("p3", "/x", json!(["b"])))
            .build();
        let response = app.dispatch(get("/x")).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.content, Content::from(json!(["a", "b"])));
    }

    #[tokio::test]
    async fn test_abort_stops_aggregation() {
        let veto = Rule::get("/x")
            .to(sync_handler(|call| {
                call.request.abort();
                Ok(json!(["veto"]).into())
            }))
            .unwrap();
        let app = App::builder()
            .provider(returning("p1", "/x", json!(["a"])))
            .provider(RouterProvider::new("veto", Router::new().route(veto)))
            .provider(returning("p3", "/x", json!(["never"])))
            .build();
        let response = app.dispatch(get("/x")).await;
        assert_eq!(response.content, Content::from(json!(["a", "veto"])));
    }

    #[tokio::test]
    async fn test_authoritative_response_bypasses_merge() {
        let blob = Rule::get("/x")
            .to(sync_handler(|_| {
                Ok(Reply::Response(Response::blob("image/png", vec![1u8, 2, 3])))
            }))
            .unwrap();
        let app = App::builder()
            .provider(returning("p1", "/x", json!(["a"])))
            .provider(RouterProvider::new("blob", Router::new().route(blob)))
            .provider(returning("p3", "/x", json!(["c"])))
            .build();
        let response = app.dispatch(get("/x")).await;
        assert_eq!(response.content_type.as_deref(), Some("image/png"));
        assert_eq!(response.content, Content::Bytes(vec![1u8, 2, 3].into()));
    }

    #[tokio::test]
    async fn test_post_status() {
        let rule = Rule::post("/api/publish/{ch}")
            .param("ch", crate::routing::ParamType::Str)
            .to(sync_handler(|_| Ok(json!({"ok": true}).into())))
            .unwrap();
        let app = App::builder()
            .provider(RouterProvider::new("p", Router::new().route(rule)))
            .build();
        let response = app
            .dispatch(Request::parse(Method::Post, "/api/publish/a", None))
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
    }

    struct Recording {
        name: String,
        log: Arc<Mutex<Vec<String>>>,
        router: Router,
    }

    #[async_trait]
    impl Provider for Recording {
        fn name(&self) -> &str {
            &self.name
        }

        fn router(&self) -> &Router {
            &self.router
        }

        async fn on_startup(&self) -> Result<(), HandlerError> {
            self.log.lock().unwrap().push(format!("start:{}", self.name));
            Ok(())
        }

        async fn on_shutdown(&self) -> Result<(), HandlerError> {
            self.log.lock().unwrap().push(format!("stop:{}", self.name));
            Err(HandlerError::Internal("ignored".into()))
        }
    }

    #[tokio::test]
    async fn test_lifecycle_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut builder = App::builder();
        for name in ["a", "b", "c"] {
            builder = builder.provider(Recording {
                name: name.to_string(),
                log: log.clone(),
                router: Router::new(),
            });
        }
        let app = builder.build();
        assert_eq!(app.provider_names(), vec!["a", "b", "c"]);

        app.startup().await;
        app.shutdown().await;
        assert_eq!(
            *log.lock().unwrap(),
            vec!["start:a", "start:b", "start:c", "stop:c", "stop:b", "stop:a"]
        );
    }
}
