//! Handler type and bound call arguments.
//!
//! Every handler is asynchronous; synchronous bodies are wrapped in an
//! already-resolved future by [`sync_handler`], so routers await all of them
//! the same way.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::future::{self, BoxFuture};
use serde_json::Value;

use crate::dispatch::error::{HandlerError, HandlerResult};
use crate::dispatch::request::Request;
use crate::dispatch::response::Reply;

/// Arguments bound by a rule, plus the request they came from.
pub struct Call {
    pub args: Args,
    pub request: Arc<Request>,
}

/// A route handler.
pub type Handler = Arc<dyn Fn(Call) -> BoxFuture<'static, HandlerResult<Reply>> + Send + Sync>;

/// Wrap an async closure as a [`Handler`].
pub fn handler<F, Fut>(f: F) -> Handler
where
    F: Fn(Call) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult<Reply>> + Send + 'static,
{
    Arc::new(move |call| Box::pin(f(call)))
}

/// Wrap a blocking closure as a [`Handler`] that resolves immediately.
pub fn sync_handler<F>(f: F) -> Handler
where
    F: Fn(Call) -> HandlerResult<Reply> + Send + Sync + 'static,
{
    Arc::new(move |call| Box::pin(future::ready(f(call))))
}

/// Typed parameter values bound from path, query and defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    values: HashMap<String, Value>,
    body: Option<Bytes>,
}

impl Args {
    pub(crate) fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub(crate) fn set_body(&mut self, body: Option<Bytes>) {
        self.body = body;
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name).filter(|v| !v.is_null())
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    pub fn i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    /// A list-typed parameter, e.g. the wildcard tail.
    pub fn list(&self, name: &str) -> Vec<String> {
        match self.get(name) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// The raw request body, if the rule declared a body parameter.
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Decode the body as JSON. An absent or empty body decodes to `null`.
    pub fn json_body(&self) -> HandlerResult<Value> {
        match &self.body {
            Some(bytes) if !bytes.is_empty() => {
                serde_json::from_slice(bytes).map_err(|e| HandlerError::BadBody(e.to_string()))
            }
            _ => Ok(Value::Null),
        }
    }
}
