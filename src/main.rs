//! Dashboard server (v1)
//!
//! Serves time-series and object data from pluggable sources, merged with
//! values published live by clients.
//!
//! # Architecture Overview
//!
//! ```text
//!                          ┌────────────────────────────────────────────────┐
//!                          │                DASHBOARD SERVER                │
//!                          │                                                │
//!   HTTP / WebSocket       │  ┌─────────┐    ┌──────────┐    ┌───────────┐  │
//!   ───────────────────────┼─▶│  http   │───▶│ dispatch │───▶│  routing  │  │
//!                          │  │ server  │    │   App    │    │ providers │  │
//!                          │  └────┬────┘    └──────────┘    └─────┬─────┘  │
//!                          │       │                               │        │
//!                          │       │ subscribe       ┌─────────────┴──────┐ │
//!                          │       ▼                 ▼                    ▼ │
//!                          │  ┌─────────┐      ┌──────────┐       ┌────────┐│
//!                          │  │  cache  │◀─────│ plugins  │──────▶│ time-  ││
//!                          │  │  live   │merge │ sources  │       │ series ││
//!                          │  └─────────┘      └──────────┘       └────────┘│
//!                          │                                                │
//!                          │  config · observability · lifecycle            │
//!                          └────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use dashboard_server::config::{load_config, ServerConfig};
use dashboard_server::lifecycle::{spawn_signal_listener, start, Shutdown};
use dashboard_server::observability::{init_logging, init_metrics};
use dashboard_server::plugins::Registry;

#[derive(Parser)]
#[command(name = "dashboard-server")]
#[command(about = "Monitoring dashboard data server", long_about = None)]
struct Args {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "dashboard-server starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        data_sources = config.data_sources.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    spawn_signal_listener(shutdown.clone());

    let running = start(config, &Registry::with_builtins(), &shutdown).await?;
    running.handle.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
