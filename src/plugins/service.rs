//! Service routes: liveness and server identity.

use async_trait::async_trait;
use serde_json::json;

use crate::dispatch::app::Provider;
use crate::dispatch::response::Content;
use crate::routing::{sync_handler, Router, Rule, RuleError};

pub struct ServiceProvider {
    router: Router,
}

impl ServiceProvider {
    pub fn new() -> Result<Self, RuleError> {
        let router = Router::new()
            .route(Rule::get("/api/ping").to(sync_handler(|_| Ok(Content::from("pong").into())))?)
            .route(Rule::get("/api/version").to(sync_handler(|_| {
                Ok(json!({
                    "name": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION"),
                })
                .into())
            }))?);
        Ok(Self { router })
    }
}

#[async_trait]
impl Provider for ServiceProvider {
    fn name(&self) -> &str {
        "service"
    }

    fn router(&self) -> &Router {
        &self.router
    }
}
