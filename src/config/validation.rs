//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, buffers > 0)
//! - Detect duplicate data source names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Unknown plugin types are left to the registry at startup

use std::collections::HashSet;
use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::ServerConfig;

/// One semantic problem in a configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    InvalidBindAddress(String),

    #[error("observability.metrics_address '{0}' is not a socket address")]
    InvalidMetricsAddress(String),

    #[error("{0} must be greater than zero")]
    NotPositive(&'static str),

    #[error("observability.log_format '{0}' must be 'pretty' or 'json'")]
    InvalidLogFormat(String),

    #[error("data source #{0} has an empty name")]
    EmptySourceName(usize),

    #[error("data source name '{0}' is used more than once")]
    DuplicateSourceName(String),
}

/// Check a parsed configuration.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }
    if config.listener.max_body_size == 0 {
        errors.push(ValidationError::NotPositive("listener.max_body_size"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::NotPositive("timeouts.request_secs"));
    }
    if config.cache.feed_capacity == 0 {
        errors.push(ValidationError::NotPositive("cache.feed_capacity"));
    }

    let observability = &config.observability;
    if !matches!(observability.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::InvalidLogFormat(
            observability.log_format.clone(),
        ));
    }
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            observability.metrics_address.clone(),
        ));
    }

    let mut seen = HashSet::new();
    for (index, source) in config.data_sources.iter().enumerate() {
        if source.name.trim().is_empty() {
            errors.push(ValidationError::EmptySourceName(index));
        } else if !seen.insert(source.name.as_str()) {
            errors.push(ValidationError::DuplicateSourceName(source.name.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::DataSourceConfig;
    use serde_json::json;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&ServerConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = ServerConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.timeouts.request_secs = 0;
        config.cache.feed_capacity = 0;
        config.observability.log_format = "xml".into();
        config.data_sources = vec![
            DataSourceConfig::new("a", "dummy", json!({})),
            DataSourceConfig::new("a", "memory", json!({})),
            DataSourceConfig::new(" ", "memory", json!({})),
        ];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::InvalidBindAddress("nowhere".into()),
                ValidationError::NotPositive("timeouts.request_secs"),
                ValidationError::NotPositive("cache.feed_capacity"),
                ValidationError::InvalidLogFormat("xml".into()),
                ValidationError::DuplicateSourceName("a".into()),
                ValidationError::EmptySourceName(2),
            ]
        );
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = ServerConfig::default();
        config.observability.metrics_address = "bad".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::InvalidMetricsAddress("bad".into())])
        );
    }
}
