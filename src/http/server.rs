//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the dispatch fallback and the subscribe route
//! - Wire up middleware (tracing, limits, request ID, timeout)
//! - Bind server to listener
//! - Convert requests for the dispatcher and render its responses
//! - Run provider lifecycle hooks around serving
//! - Observability (metrics, correlation IDs)

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::Request as HttpRequest,
    response::{IntoResponse, Response as HttpResponse},
    routing::get,
    Router,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use axum::extract::ws::WebSocketUpgrade;

use crate::cache::live::LiveCache;
use crate::config::ServerConfig;
use crate::dispatch::App;
use crate::http::request::{from_parts, read_body, request_id};
use crate::http::response::render;
use crate::http::websocket::{dispatch_session, is_upgrade, subscribe_handler};
use crate::observability::metrics;

/// State injected into the transport handlers.
#[derive(Clone)]
pub struct ServerState {
    pub app: Arc<App>,
    pub cache: Option<LiveCache>,
    pub max_body_size: usize,
}

/// HTTP server for the dashboard.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
    app: Arc<App>,
}

impl HttpServer {
    /// Create a new HTTP server around a built dispatcher.
    pub fn new(config: ServerConfig, app: Arc<App>, cache: Option<LiveCache>) -> Self {
        let state = ServerState {
            app: Arc::clone(&app),
            cache,
            max_body_size: config.listener.max_body_size,
        };
        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            app,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, state: ServerState) -> Router {
        Router::new()
            .route("/api/subscribe/{channels}", get(subscribe_handler))
            .fallback(dispatch_handler)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(RequestBodyLimitLayer::new(config.listener.max_body_size))
                    .layer(TimeoutLayer::new(Duration::from_secs(
                        config.timeouts.request_secs,
                    ))),
            )
    }

    /// The fully layered router, e.g. for in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain and stop providers.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;

        self.app.startup().await;
        tracing::info!(
            address = %addr,
            providers = ?self.app.provider_names(),
            "HTTP server starting"
        );

        let result = axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await;

        self.app.shutdown().await;
        tracing::info!("HTTP server stopped");
        result
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// Catch-all handler: every path goes through the dispatcher.
async fn dispatch_handler(
    State(state): State<ServerState>,
    request: HttpRequest<Body>,
) -> HttpResponse {
    let started = Instant::now();
    let (mut parts, body) = request.into_parts();
    let request_id = request_id(&parts.headers);

    if is_upgrade(&parts.headers) {
        let ws = match WebSocketUpgrade::from_request_parts(&mut parts, &state).await {
            Ok(ws) => ws,
            Err(rejection) => return rejection.into_response(),
        };
        let path = parts.uri.path().to_string();
        let query = parts.uri.query().map(str::to_string);
        tracing::debug!(request_id = %request_id, path = %path, "WebSocket upgrade");
        let app = Arc::clone(&state.app);
        return ws.on_upgrade(move |socket| dispatch_session(socket, app, path, query));
    }

    let method = parts.method.to_string();
    let body = match read_body(body, state.max_body_size).await {
        Ok(bytes) => bytes,
        Err(status) => {
            metrics::record_request(&method, status.as_u16(), started);
            return status.into_response();
        }
    };
    let request = match from_parts(&parts, body) {
        Ok(request) => request,
        Err(status) => {
            metrics::record_request(&method, status.as_u16(), started);
            return status.into_response();
        }
    };

    tracing::debug!(
        request_id = %request_id,
        method = %request.method,
        path = %request.path_string(),
        "Dispatching request"
    );

    let response = state.app.dispatch(request).await;
    metrics::record_request(&method, response.status.as_u16(), started);
    render(response)
}
