//! Shared utilities for integration and load testing.

use std::net::SocketAddr;

use dashboard_server::config::{DataSourceConfig, ServerConfig};
use dashboard_server::lifecycle::{start, Shutdown};
use dashboard_server::plugins::Registry;
use serde_json::json;

/// A server bound to an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

#[allow(dead_code)]
impl TestServer {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Config with one in-memory source holding `temp` samples at t=100..=104
/// and a `hist` object record at t=102.
#[allow(dead_code)]
pub fn memory_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.data_sources.push(DataSourceConfig::new(
        "store",
        "memory",
        json!({
            "channels": {
                "temp": [[100.0, 1.0], [101.0, 2.0], [102.0, 3.0], [103.0, 4.0], [104.0, 5.0]],
                "hist": [[102.0, {"bins": [0, 1, 2], "counts": [4, 5]}]]
            }
        }),
    ));
    config
}

/// Start a server with `registry` on 127.0.0.1 and an ephemeral port.
#[allow(dead_code)]
pub async fn spawn_with(mut config: ServerConfig, registry: &Registry) -> TestServer {
    config.listener.bind_address = "127.0.0.1:0".into();
    let shutdown = Shutdown::new();
    let running = start(config, registry, &shutdown).await.unwrap();
    TestServer {
        addr: running.address,
        shutdown,
    }
}

#[allow(dead_code)]
pub async fn spawn(config: ServerConfig) -> TestServer {
    spawn_with(config, &Registry::with_builtins()).await
}
