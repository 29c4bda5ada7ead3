//! Request dispatch and response aggregation.
//!
//! # Data Flow
//! ```text
//! Transport (HTTP verb or WebSocket frame)
//!     → request.rs (decode path segments, query, body)
//!     → app.rs (for each provider, in registration order)
//!         → provider router (rule match, handler invocation)
//!         → response.rs (fold partial result with the merge algebra)
//!     → Response (status, content, content type)
//! ```
//!
//! # Design Decisions
//! - Providers are awaited one at a time; merging never interleaves
//! - A failing provider is logged and skipped, never fatal
//! - A complete response returned by a handler bypasses aggregation

pub mod app;
pub mod error;
pub mod request;
pub mod response;

pub use app::{App, AppBuilder, Provider, RouterProvider};
pub use error::{DispatchError, HandlerError, HandlerResult};
pub use request::{Method, Request};
pub use response::{Content, ContentKind, MergeOutcome, Reply, Response};
