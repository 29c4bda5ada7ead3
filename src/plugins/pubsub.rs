//! Publish routes feeding the live cache.

use async_trait::async_trait;
use axum::http::StatusCode;
use serde_json::{json, Value};

use crate::cache::live::LiveCache;
use crate::dispatch::app::Provider;
use crate::dispatch::error::{HandlerError, HandlerResult};
use crate::dispatch::response::{Reply, Response};
use crate::routing::{sync_handler, Call, ParamType, Router, Rule, RuleError};

pub struct PubSubProvider {
    router: Router,
    cache: LiveCache,
}

impl PubSubProvider {
    pub fn new(cache: LiveCache) -> Result<Self, RuleError> {
        let post_cache = cache.clone();
        let ws_cache = cache.clone();
        let delete_cache = cache.clone();

        let router = Router::new()
            .route(
                Rule::post("/api/publish/{channel}")
                    .param("channel", ParamType::Str)
                    .body("data")
                    .to(sync_handler(move |call| publish(&post_cache, &call)))?,
            )
            .route(
                Rule::websocket("/api/publish/{channel}")
                    .param("channel", ParamType::Str)
                    .body("data")
                    .to(sync_handler(move |call| publish(&ws_cache, &call)))?,
            )
            .route(
                Rule::delete("/api/publish/{channel}")
                    .param("channel", ParamType::Str)
                    .to(sync_handler(move |call| {
                        let channel = call.args.str("channel").unwrap_or_default();
                        let removed = delete_cache.remove(channel);
                        tracing::info!(channel = %channel, removed = removed, "Live channel deleted");
                        Ok(json!({ "channel": channel, "removed": removed }).into())
                    }))?,
            );

        Ok(Self { router, cache })
    }
}

fn publish(cache: &LiveCache, call: &Call) -> HandlerResult<Reply> {
    let channel = call.args.str("channel").unwrap_or_default();
    let data = match call.args.json_body() {
        Ok(Value::Null) => {
            return Ok(Response::error(StatusCode::BAD_REQUEST, "empty body").into());
        }
        Ok(data) => data,
        Err(e) => return Ok(Response::error(StatusCode::BAD_REQUEST, e.to_string()).into()),
    };

    let timestamp = cache.publish_now(channel, data);
    tracing::debug!(channel = %channel, timestamp = timestamp, "Published");
    Ok(json!({ "channel": channel, "timestamp": timestamp }).into())
}

#[async_trait]
impl Provider for PubSubProvider {
    fn name(&self) -> &str {
        "pubsub"
    }

    fn router(&self) -> &Router {
        &self.router
    }

    async fn on_startup(&self) -> Result<(), HandlerError> {
        self.cache
            .load()
            .map(|_| ())
            .map_err(|e| HandlerError::Internal(format!("cannot restore live cache: {}", e)))
    }

    async fn on_shutdown(&self) -> Result<(), HandlerError> {
        self.cache
            .save()
            .map_err(|e| HandlerError::Internal(format!("cannot save live cache: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::request::{Method, Request};
    use crate::dispatch::response::Content;
    use crate::dispatch::App;

    fn setup() -> (App, LiveCache) {
        let cache = LiveCache::default();
        let app = App::builder()
            .provider(PubSubProvider::new(cache.clone()).unwrap())
            .build();
        (app, cache)
    }

    #[tokio::test]
    async fn test_post_publishes() {
        let (app, cache) = setup();
        let request = Request::parse(Method::Post, "/api/publish/temp", None).with_body("21.5");
        let response = app.dispatch(request).await;

        assert_eq!(response.status, StatusCode::CREATED);
        let entry = cache.get("temp").unwrap();
        assert_eq!(entry.data, json!(21.5));
        let Content::Dict(map) = &response.content else {
            panic!("expected dict");
        };
        assert_eq!(map["channel"], json!("temp"));
        assert_eq!(map["timestamp"], json!(entry.timestamp));
    }

    #[tokio::test]
    async fn test_websocket_frame_publishes() {
        let (app, cache) = setup();
        let request = Request::parse(Method::WebSocket, "/api/publish/hist", None)
            .with_body(r#"{"bins": [1, 2]}"#);
        let response = app.dispatch(request).await;

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(cache.get("hist").unwrap().data, json!({"bins": [1, 2]}));
    }

    #[tokio::test]
    async fn test_bad_bodies() {
        let (app, cache) = setup();
        for body in ["", "{not json"] {
            let request = Request::parse(Method::Post, "/api/publish/x", None).with_body(body);
            let response = app.dispatch(request).await;
            assert_eq!(response.status, StatusCode::BAD_REQUEST, "body={:?}", body);
        }
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_delete() {
        let (app, cache) = setup();
        cache.publish("gone", 1.0, json!(1));
        let response = app
            .dispatch(Request::parse(Method::Delete, "/api/publish/gone", None))
            .await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(
            response.content,
            Content::from(json!({"channel": "gone", "removed": true}))
        );
        assert!(cache.get("gone").is_none());
    }
}
