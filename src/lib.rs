//! Dashboard server library: request dispatch, data sources and live cache.

pub mod cache;
pub mod config;
pub mod dispatch;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod plugins;
pub mod routing;
pub mod timeseries;

pub use config::schema::ServerConfig;
pub use dispatch::App;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
