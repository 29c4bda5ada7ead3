//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → Registry builds sources → App (data, pubsub, service)
//!     → bind listener → App::startup (forward) → serve
//!
//! Shutdown (shutdown.rs):
//!     Trigger → Stop accepting → Drain connections → App::shutdown (reverse)
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then providers, then listeners
//! - Ordered shutdown: stop accept, drain, provider hooks in reverse

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::{spawn_signal_listener, wait_for_signal};
pub use startup::{build_app, start, Assembly, Running, StartupError};
