//! Data source plugins and the providers mounted on the dispatcher.
//!
//! # Data Flow
//! ```text
//! [[data_sources]] config
//!     → registry.rs (type key → constructor)
//!     → Vec<Arc<dyn DataSource>> (memory.rs, dummy.rs, ...)
//!     → query.rs DataQueryProvider (+ LiveCache)
//!
//! App providers, in order:
//!     data     GET /api/channels, GET /api/data/{channels}
//!     pubsub   POST|DELETE|WEBSOCKET /api/publish/{channel}
//!     service  GET /api/ping, GET /api/version
//! ```

pub mod dummy;
pub mod memory;
pub mod pubsub;
pub mod query;
pub mod registry;
pub mod service;
pub mod source;

pub use dummy::DummySource;
pub use memory::MemorySource;
pub use pubsub::PubSubProvider;
pub use query::DataQueryProvider;
pub use registry::{Registry, RegistryError};
pub use service::ServiceProvider;
pub use source::{DataSource, SourceError};
