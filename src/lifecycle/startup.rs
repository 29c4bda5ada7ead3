//! Startup orchestration.
//!
//! # Responsibilities
//! - Build data sources from configuration through the registry
//! - Assemble the dispatcher with its providers in a fixed order
//! - Bind the listener and start serving
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Provider order is data, pubsub, service
//! - Listeners start last (traffic only when ready)

use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::cache::live::LiveCache;
use crate::config::ServerConfig;
use crate::dispatch::App;
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::plugins::{DataQueryProvider, PubSubProvider, Registry, RegistryError, ServiceProvider};
use crate::routing::RuleError;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("invalid route: {0}")]
    Route(#[from] RuleError),

    #[error("cannot bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// Dispatcher plus the live cache it shares with the transport.
pub struct Assembly {
    pub app: Arc<App>,
    pub cache: Option<LiveCache>,
}

/// Build sources and providers from `config`.
pub fn build_app(config: &ServerConfig, registry: &Registry) -> Result<Assembly, StartupError> {
    let sources = registry.build_all(&config.data_sources)?;
    let cache = config.cache.enabled.then(|| {
        LiveCache::new(
            config.cache.feed_capacity,
            config.cache.persistence_path.clone(),
        )
    });

    let mut builder = App::builder().provider(DataQueryProvider::new(sources, cache.clone())?);
    if let Some(cache) = &cache {
        builder = builder.provider(PubSubProvider::new(cache.clone())?);
    }
    let app = builder.provider(ServiceProvider::new()?).build();

    tracing::info!(
        providers = ?app.provider_names(),
        sources = config.data_sources.len(),
        live_cache = cache.is_some(),
        "Application assembled"
    );
    Ok(Assembly {
        app: Arc::new(app),
        cache,
    })
}

/// A server running in the background.
pub struct Running {
    pub address: SocketAddr,
    pub handle: JoinHandle<Result<(), std::io::Error>>,
}

/// Assemble, bind and spawn the server. It stops when `shutdown` triggers.
pub async fn start(
    config: ServerConfig,
    registry: &Registry,
    shutdown: &Shutdown,
) -> Result<Running, StartupError> {
    let assembly = build_app(&config, registry)?;

    let bind_address = config.listener.bind_address.clone();
    let listener = TcpListener::bind(&bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: bind_address.clone(),
            source,
        })?;
    let address = listener.local_addr().map_err(|source| StartupError::Bind {
        address: bind_address,
        source,
    })?;

    let server = HttpServer::new(config, assembly.app, assembly.cache);
    let shutdown_rx = shutdown.subscribe();
    let handle = tokio::spawn(server.run(listener, shutdown_rx));

    tracing::info!(address = %address, "Listening for connections");
    Ok(Running { address, handle })
}
