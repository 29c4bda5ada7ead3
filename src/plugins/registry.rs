//! Registry of data source constructors.
//!
//! # Responsibilities
//! - Map a stable type key ("memory", "dummy", ...) to a constructor
//! - Build configured source instances in declaration order
//!
//! # Design Decisions
//! - Plain function pointers; no dynamic loading
//! - Applications add their own types before startup

use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::config::schema::DataSourceConfig;
use crate::plugins::dummy::DummySource;
use crate::plugins::memory::MemorySource;
use crate::plugins::source::{DataSource, SourceError};

/// Builds one source from its configuration.
pub type Constructor = fn(&DataSourceConfig) -> Result<Arc<dyn DataSource>, SourceError>;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("data source '{name}': unknown type '{kind}' (known: {known})")]
    UnknownType {
        name: String,
        kind: String,
        known: String,
    },

    #[error("data source '{name}' could not be built: {source}")]
    Construction {
        name: String,
        #[source]
        source: SourceError,
    },
}

/// Type key → constructor table.
#[derive(Clone, Default)]
pub struct Registry {
    constructors: BTreeMap<String, Constructor>,
}

impl Registry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the bundled `memory` and `dummy` types.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("memory", |config| {
            Ok(Arc::new(MemorySource::from_config(config)?) as Arc<dyn DataSource>)
        });
        registry.register("dummy", |config| {
            Ok(Arc::new(DummySource::from_config(config)?) as Arc<dyn DataSource>)
        });
        registry
    }

    /// Add or replace a constructor.
    pub fn register(&mut self, kind: &str, constructor: Constructor) {
        self.constructors.insert(kind.to_string(), constructor);
    }

    pub fn kinds(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }

    /// Build one source.
    pub fn build(&self, config: &DataSourceConfig) -> Result<Arc<dyn DataSource>, RegistryError> {
        let constructor =
            self.constructors
                .get(&config.kind)
                .ok_or_else(|| RegistryError::UnknownType {
                    name: config.name.clone(),
                    kind: config.kind.clone(),
                    known: self.kinds().join(", "),
                })?;
        let source = constructor(config).map_err(|source| RegistryError::Construction {
            name: config.name.clone(),
            source,
        })?;
        tracing::info!(name = %config.name, kind = %config.kind, "Data source created");
        Ok(source)
    }

    /// Build every configured source, preserving order.
    pub fn build_all(
        &self,
        configs: &[DataSourceConfig],
    ) -> Result<Vec<Arc<dyn DataSource>>, RegistryError> {
        configs.iter().map(|config| self.build(config)).collect()
    }
}
