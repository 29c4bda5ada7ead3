//! Dispatch error taxonomy.
//!
//! Every variant is recovered inside [`App::dispatch`](crate::dispatch::App::dispatch);
//! none of them aborts a request on its own.

use thiserror::Error;

use crate::dispatch::response::ContentKind;

/// Errors raised while routing and aggregating a request.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No provider matched the method and path.
    #[error("no route for {method} {path}")]
    RouteNotFound { method: String, path: String },

    /// A required parameter was missing or failed coercion.
    #[error("cannot bind parameter '{name}': {reason}")]
    ParameterBinding { name: String, reason: String },

    /// Two contributions had incompatible payload kinds.
    #[error("cannot merge {incoming} into {existing}")]
    MergeConflict {
        existing: ContentKind,
        incoming: ContentKind,
    },

    /// A provider's handler failed.
    #[error("provider '{provider}' failed: {source}")]
    HandlerFault {
        provider: String,
        #[source]
        source: HandlerError,
    },
}

/// Failure reported by a handler body.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The request body was not what the handler expected.
    #[error("bad request body: {0}")]
    BadBody(String),

    /// A data source backend failed.
    #[error("data source error: {0}")]
    Source(#[from] crate::plugins::SourceError),

    /// Anything else.
    #[error("{0}")]
    Internal(String),
}

/// Result type for handler bodies.
pub type HandlerResult<T> = Result<T, HandlerError>;
