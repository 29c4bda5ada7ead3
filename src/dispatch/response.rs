//! Response envelope and the merge algebra.
//!
//! # Merge Rules
//! ```text
//! acc \ new   None   List     Dict        Scalar           Bytes
//! None        -      take     take        take             take
//! List        keep   concat   conflict    conflict         conflict
//! Dict        keep   conflict key-union   conflict         conflict
//! Scalar      keep   conflict conflict    concat(str)/keep conflict
//! Bytes       keep   conflict conflict    conflict         keep
//! ```
//!
//! # Design Decisions
//! - Total over the cross-product: every pair is handled explicitly
//! - Dict union is right-biased (later provider wins on key collision)
//! - On any conflict the accumulator is left untouched (first wins)

use axum::http::StatusCode;
use bytes::Bytes;
use serde_json::{Map, Value};
use std::fmt;

use crate::dispatch::error::DispatchError;

/// Discriminant of [`Content`], used in logs and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    None,
    List,
    Dict,
    Scalar,
    Bytes,
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContentKind::None => "none",
            ContentKind::List => "list",
            ContentKind::Dict => "dict",
            ContentKind::Scalar => "scalar",
            ContentKind::Bytes => "bytes",
        };
        f.write_str(name)
    }
}

/// Payload of a partial or accumulated response.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Content {
    #[default]
    None,
    List(Vec<Value>),
    Dict(Map<String, Value>),
    /// Numbers, booleans and strings.
    Scalar(Value),
    Bytes(Bytes),
}

/// What happened to a contribution folded into an accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The contribution was empty.
    Ignored,
    Merged,
    /// Same-kind scalars that cannot be combined; the first value was kept.
    KeptFirst,
}

impl Content {
    pub fn kind(&self) -> ContentKind {
        match self {
            Content::None => ContentKind::None,
            Content::List(_) => ContentKind::List,
            Content::Dict(_) => ContentKind::Dict,
            Content::Scalar(_) => ContentKind::Scalar,
            Content::Bytes(_) => ContentKind::Bytes,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Content::None)
    }

    /// Fold `incoming` into `self`.
    ///
    /// Returns `Err(DispatchError::MergeConflict)` when the kinds differ; the
    /// accumulator is unchanged in that case.
    pub fn merge(&mut self, incoming: Content) -> Result<MergeOutcome, DispatchError> {
        if incoming.is_none() {
            return Ok(MergeOutcome::Ignored);
        }
        if self.is_none() {
            *self = incoming;
            return Ok(MergeOutcome::Merged);
        }

        let existing = self.kind();
        match (self, incoming) {
            (Content::List(acc), Content::List(new)) => {
                acc.extend(new);
                Ok(MergeOutcome::Merged)
            }
            (Content::Dict(acc), Content::Dict(new)) => {
                for (key, value) in new {
                    acc.insert(key, value);
                }
                Ok(MergeOutcome::Merged)
            }
            (Content::Scalar(Value::String(acc)), Content::Scalar(Value::String(new))) => {
                acc.push_str(&new);
                Ok(MergeOutcome::Merged)
            }
            (Content::Scalar(_), Content::Scalar(_)) | (Content::Bytes(_), Content::Bytes(_)) => {
                Ok(MergeOutcome::KeptFirst)
            }
            (_, new) => Err(DispatchError::MergeConflict {
                existing,
                incoming: new.kind(),
            }),
        }
    }

    /// Render as JSON if the payload is JSON-shaped.
    pub fn to_json(&self) -> Option<Value> {
        match self {
            Content::None | Content::Bytes(_) => None,
            Content::List(items) => Some(Value::Array(items.clone())),
            Content::Dict(map) => Some(Value::Object(map.clone())),
            Content::Scalar(value) => Some(value.clone()),
        }
    }
}

impl From<Value> for Content {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Content::None,
            Value::Array(items) => Content::List(items),
            Value::Object(map) => Content::Dict(map),
            scalar => Content::Scalar(scalar),
        }
    }
}

impl From<Vec<Value>> for Content {
    fn from(items: Vec<Value>) -> Self {
        Content::List(items)
    }
}

impl From<Map<String, Value>> for Content {
    fn from(map: Map<String, Value>) -> Self {
        Content::Dict(map)
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Scalar(Value::String(text.to_string()))
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::Scalar(Value::String(text))
    }
}

impl From<Bytes> for Content {
    fn from(bytes: Bytes) -> Self {
        Content::Bytes(bytes)
    }
}

/// A complete response: status, payload and optional content type.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: StatusCode,
    pub content: Content,
    pub content_type: Option<String>,
}

impl Response {
    pub fn new(status: StatusCode, content: impl Into<Content>) -> Self {
        Self {
            status,
            content: content.into(),
            content_type: None,
        }
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, Content::None)
    }

    /// `{"error": message}` with the given status.
    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(status, serde_json::json!({ "error": message.into() }))
    }

    /// Raw payload with an explicit media type, e.g. a file download.
    pub fn blob(content_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            status: StatusCode::OK,
            content: Content::Bytes(bytes.into()),
            content_type: Some(content_type.into()),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Value returned by a handler.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// A partial result to fold into the accumulator.
    Content(Content),
    /// A complete response that bypasses aggregation.
    Response(Response),
}

impl Reply {
    pub fn none() -> Self {
        Reply::Content(Content::None)
    }
}

impl From<Content> for Reply {
    fn from(content: Content) -> Self {
        Reply::Content(content)
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Reply::Content(value.into())
    }
}

impl From<Response> for Reply {
    fn from(response: Response) -> Self {
        Reply::Response(response)
    }
}
