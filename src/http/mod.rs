//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, tower layers: request ID, trace, timeout, body limit)
//!     → websocket.rs (upgrade: per-frame dispatch or subscribe feed)
//!     → request.rs (body read, normalized dispatch request)
//!     → dispatch::App (providers, merge)
//!     → response.rs (content type by payload kind)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;
pub mod websocket;

pub use request::X_REQUEST_ID;
pub use server::{HttpServer, ServerState};
