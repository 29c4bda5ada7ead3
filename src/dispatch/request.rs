//! Normalized request model.
//!
//! # Responsibilities
//! - Percent-decode path segments and drop empty ones
//! - Decode the query string into a flat map
//! - Carry the raw body untouched
//! - Expose the abort flag a handler may raise to end aggregation
//!
//! # Design Decisions
//! - Transport-agnostic: HTTP and WebSocket frames both become a `Request`
//! - Keys and values of the query use the same decoding as path segments
//! - Repeated query keys: last occurrence wins

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;

/// Verbs understood by the dispatcher.
///
/// Each verb gets its own independent routing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Delete,
    WebSocket,
}

impl Method {
    /// Map an HTTP method onto a dispatcher verb.
    pub fn from_http(method: &axum::http::Method) -> Option<Self> {
        match *method {
            axum::http::Method::GET => Some(Method::Get),
            axum::http::Method::POST => Some(Method::Post),
            axum::http::Method::DELETE => Some(Method::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
            Method::WebSocket => "WEBSOCKET",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded request as seen by routers and handlers.
#[derive(Debug)]
pub struct Request {
    pub method: Method,
    /// Percent-decoded, non-empty path segments.
    pub path: Vec<String>,
    pub query: HashMap<String, String>,
    pub body: Option<Bytes>,
    aborted: AtomicBool,
}

impl Request {
    /// Build a request from an already decoded path and query.
    pub fn new(method: Method, path: Vec<String>, query: HashMap<String, String>) -> Self {
        Self {
            method,
            path,
            query,
            body: None,
            aborted: AtomicBool::new(false),
        }
    }

    /// Parse a raw path (`/a/b%20c/`) and an optional raw query (`x=1&y=2`).
    pub fn parse(method: Method, raw_path: &str, raw_query: Option<&str>) -> Self {
        let path = split_path(raw_path);
        let query = raw_query.map(parse_query).unwrap_or_default();
        Self::new(method, path, query)
    }

    /// Attach a body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Stop aggregation for this request after the current provider.
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    /// The path joined back with `/`, for logging.
    pub fn path_string(&self) -> String {
        format!("/{}", self.path.join("/"))
    }
}

fn decode(raw: &str) -> String {
    match urlencoding::decode(raw) {
        Ok(decoded) => decoded.into_owned(),
        // Invalid UTF-8 after decoding: keep the raw text
        Err(_) => raw.to_string(),
    }
}

/// Split a raw URL path into decoded, non-empty segments.
pub fn split_path(raw: &str) -> Vec<String> {
    raw.split('/')
        .filter(|s| !s.is_empty())
        .map(decode)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Decode `key=value&...` pairs. A key without `=` maps to an empty value.
pub fn parse_query(raw: &str) -> HashMap<String, String> {
    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (decode(k), decode(v)),
            None => (decode(pair), String::new()),
        })
        .collect()
}
