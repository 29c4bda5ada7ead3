//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Root configuration for the dashboard server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Live cache and publish/subscribe settings.
    pub cache: CacheConfig,

    /// Data source plugins, queried in declaration order.
    pub data_sources: Vec<DataSourceConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:18881").
    pub bind_address: String,

    /// Maximum accepted request body in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:18881".to_string(),
            max_body_size: 2 * 1024 * 1024,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for one request (dispatch included) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins.
    pub log_level: String,

    /// Log output format: "pretty" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Live cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable the live cache and the publish/subscribe routes.
    pub enabled: bool,

    /// Broadcast buffer size for live subscribers.
    pub feed_capacity: usize,

    /// File the cache is restored from at startup and saved to at shutdown.
    pub persistence_path: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            feed_capacity: 1024,
            persistence_path: None,
        }
    }
}

/// One data source plugin instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DataSourceConfig {
    /// Instance name used in logs and metrics.
    pub name: String,

    /// Registry key of the plugin type (e.g. "memory", "dummy").
    #[serde(rename = "type")]
    pub kind: String,

    /// Plugin-specific parameters.
    #[serde(default = "empty_params")]
    pub params: Value,
}

fn empty_params() -> Value {
    Value::Object(Default::default())
}

impl DataSourceConfig {
    pub fn new(name: impl Into<String>, kind: impl Into<String>, params: Value) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:18881");
        assert_eq!(config.listener.max_body_size, 2_097_152);
        assert_eq!(config.timeouts.request_secs, 30);
        assert_eq!(config.observability.log_format, "pretty");
        assert!(!config.observability.metrics_enabled);
        assert!(config.cache.enabled);
        assert!(config.data_sources.is_empty());
    }

    #[test]
    fn test_data_sources() {
        let config: ServerConfig = toml::from_str(
            r#"
            [listener]
            bind_address = "127.0.0.1:9000"

            [[data_sources]]
            name = "sim"
            type = "dummy"
            params = { interval = 0.5, channels = ["sin"] }

            [[data_sources]]
            name = "static"
            type = "memory"
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert_eq!(config.data_sources.len(), 2);
        assert_eq!(config.data_sources[0].kind, "dummy");
        assert_eq!(
            config.data_sources[0].params,
            json!({"interval": 0.5, "channels": ["sin"]})
        );
        assert_eq!(config.data_sources[1].params, json!({}));
    }
}
