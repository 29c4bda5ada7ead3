//! Route rule compilation and matching.
//!
//! # Template Grammar
//! ```text
//! /api/data/{channels}      literal, literal, named slot
//! /files/{*}                literal, trailing wildcard (list of segments)
//! ```
//!
//! # Match Order
//! 1. Method must be equal
//! 2. Segment count: exact, or at least the fixed prefix with a wildcard
//! 3. Literals compare exactly, slots capture one segment, wildcard the tail
//! 4. Path captures win over query values of the same name
//! 5. Missing values fall back to defaults, otherwise binding fails
//! 6. Values are coerced to the declared type
//!
//! A binding failure is distinct from a path mismatch so callers can log it,
//! but both leave the rule unmatched.

use axum::http::StatusCode;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::dispatch::error::DispatchError;
use crate::dispatch::request::{Method, Request};
use crate::routing::handler::{Args, Handler};

/// Declared type of a handler parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Str,
    Int,
    Float,
    Bool,
    /// Parsed as a JSON document.
    Json,
    /// The wildcard tail, as a list of segments.
    PathList,
    /// The raw request body; never bound from path or query.
    Body,
}

/// One declared handler parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: ParamType,
    pub default: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Slot(String),
    Wildcard,
}

/// Errors detected while compiling a rule.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleError {
    #[error("template '{0}': wildcard must be the last segment")]
    WildcardNotLast(String),

    #[error("template '{0}': empty parameter slot")]
    EmptySlot(String),

    #[error("template '{template}': slot '{{{name}}}' has no matching parameter")]
    UndeclaredSlot { template: String, name: String },

    #[error("template '{0}': wildcard needs exactly one path-list parameter")]
    WildcardParam(String),

    #[error("template '{0}': more than one body parameter")]
    MultipleBodyParams(String),

    #[error("template '{template}': parameter '{name}' declared twice")]
    DuplicateParam { template: String, name: String },
}

/// A compiled (method, template, parameters, handler) rule.
#[derive(Clone)]
pub struct Rule {
    method: Method,
    template: String,
    segments: Vec<Segment>,
    params: Vec<Param>,
    body_param: Option<String>,
    wildcard_param: Option<String>,
    status: StatusCode,
    handler: Handler,
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("method", &self.method)
            .field("template", &self.template)
            .field("params", &self.params)
            .field("status", &self.status)
            .finish()
    }
}

impl Rule {
    pub fn get(template: &str) -> RuleBuilder {
        RuleBuilder::new(Method::Get, template)
    }

    pub fn post(template: &str) -> RuleBuilder {
        RuleBuilder::new(Method::Post, template)
    }

    pub fn delete(template: &str) -> RuleBuilder {
        RuleBuilder::new(Method::Delete, template)
    }

    pub fn websocket(template: &str) -> RuleBuilder {
        RuleBuilder::new(Method::WebSocket, template)
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    /// Match `request` against this rule.
    ///
    /// `None` means the path does not apply; `Some(Err(_))` means the path
    /// applied but a parameter could not be bound.
    pub fn bind(&self, request: &Request) -> Option<Result<Args, DispatchError>> {
        if request.method != self.method {
            return None;
        }

        let fixed = if self.wildcard_param.is_some() {
            self.segments.len() - 1
        } else {
            self.segments.len()
        };
        let count_ok = if self.wildcard_param.is_some() {
            request.path.len() >= fixed
        } else {
            request.path.len() == fixed
        };
        if !count_ok {
            return None;
        }

        let mut captured: Vec<(&str, Value)> = Vec::new();
        for (index, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Literal(text) => {
                    if request.path[index] != *text {
                        return None;
                    }
                }
                Segment::Slot(name) => {
                    captured.push((name, Value::String(request.path[index].clone())));
                }
                Segment::Wildcard => {
                    let tail = request.path[index..]
                        .iter()
                        .map(|s| Value::String(s.clone()))
                        .collect();
                    if let Some(name) = &self.wildcard_param {
                        captured.push((name, Value::Array(tail)));
                    }
                }
            }
        }

        Some(self.bind_params(request, captured))
    }

    fn bind_params(
        &self,
        request: &Request,
        captured: Vec<(&str, Value)>,
    ) -> Result<Args, DispatchError> {
        let mut args = Args::default();
        for param in &self.params {
            if param.ty == ParamType::Body {
                continue;
            }

            let from_path = captured
                .iter()
                .find(|(name, _)| *name == param.name)
                .map(|(_, value)| value.clone());

            let value = match from_path {
                Some(Value::String(raw)) => coerce(&param.name, &raw, param.ty)?,
                Some(other) => other,
                None => match request.query.get(&param.name) {
                    Some(raw) => coerce(&param.name, raw, param.ty)?,
                    None => match &param.default {
                        Some(default) => default.clone(),
                        None => {
                            return Err(DispatchError::ParameterBinding {
                                name: param.name.clone(),
                                reason: "missing".to_string(),
                            })
                        }
                    },
                },
            };
            args.insert(param.name.clone(), value);
        }

        if self.body_param.is_some() {
            args.set_body(request.body.clone());
        }
        Ok(args)
    }
}

/// Convert a decoded string to the declared parameter type.
fn coerce(name: &str, raw: &str, ty: ParamType) -> Result<Value, DispatchError> {
    let fail = |reason: &str| DispatchError::ParameterBinding {
        name: name.to_string(),
        reason: format!("{} ('{}')", reason, raw),
    };

    match ty {
        ParamType::Str => Ok(Value::String(raw.to_string())),
        ParamType::Int => raw
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| fail("not an integer")),
        ParamType::Float => {
            let parsed = raw.trim().parse::<f64>().map_err(|_| fail("not a number"))?;
            if !parsed.is_finite() {
                return Err(fail("not a finite number"));
            }
            Ok(Value::from(parsed))
        }
        ParamType::Bool => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Value::Bool(true)),
            "false" | "0" | "no" | "off" => Ok(Value::Bool(false)),
            _ => Err(fail("not a boolean")),
        },
        ParamType::Json => serde_json::from_str(raw).map_err(|_| fail("not valid JSON")),
        ParamType::PathList => Ok(Value::Array(
            raw.split('/')
                .filter(|s| !s.is_empty())
                .map(|s| Value::String(s.to_string()))
                .collect(),
        )),
        ParamType::Body => Err(fail("body parameters are not bound from the URL")),
    }
}

/// Builder collecting a rule's declaration before compilation.
pub struct RuleBuilder {
    method: Method,
    template: String,
    params: Vec<Param>,
    status: Option<StatusCode>,
}

impl RuleBuilder {
    pub fn new(method: Method, template: &str) -> Self {
        Self {
            method,
            template: template.to_string(),
            params: Vec::new(),
            status: None,
        }
    }

    /// Declare a required parameter.
    pub fn param(mut self, name: &str, ty: ParamType) -> Self {
        self.params.push(Param {
            name: name.to_string(),
            ty,
            default: None,
        });
        self
    }

    /// Declare a parameter with a default value.
    pub fn param_or(mut self, name: &str, ty: ParamType, default: Value) -> Self {
        self.params.push(Param {
            name: name.to_string(),
            ty,
            default: Some(default),
        });
        self
    }

    /// Declare the parameter receiving the raw body.
    pub fn body(self, name: &str) -> Self {
        self.param_or(name, ParamType::Body, Value::Null)
    }

    /// Override the default status (200, or 201 for POST).
    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    /// Compile the rule with its handler.
    pub fn to(self, handler: Handler) -> Result<Rule, RuleError> {
        let template = self.template;
        let mut segments = Vec::new();
        for raw in template.split('/').filter(|s| !s.is_empty()) {
            let segment = match raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some("*") => Segment::Wildcard,
                Some("") => return Err(RuleError::EmptySlot(template)),
                Some(name) => Segment::Slot(name.to_string()),
                None => Segment::Literal(raw.to_string()),
            };
            segments.push(segment);
        }

        if let Some(pos) = segments.iter().position(|s| *s == Segment::Wildcard) {
            if pos != segments.len() - 1 {
                return Err(RuleError::WildcardNotLast(template));
            }
        }
        let has_wildcard = segments.last() == Some(&Segment::Wildcard);

        for (i, param) in self.params.iter().enumerate() {
            if self.params[..i].iter().any(|p| p.name == param.name) {
                return Err(RuleError::DuplicateParam {
                    template,
                    name: param.name.clone(),
                });
            }
        }

        let body_params: Vec<&Param> = self
            .params
            .iter()
            .filter(|p| p.ty == ParamType::Body)
            .collect();
        if body_params.len() > 1 {
            return Err(RuleError::MultipleBodyParams(template));
        }
        let body_param = body_params.first().map(|p| p.name.clone());

        let list_params: Vec<&Param> = self
            .params
            .iter()
            .filter(|p| p.ty == ParamType::PathList)
            .collect();
        let wildcard_param = if has_wildcard {
            if list_params.len() != 1 {
                return Err(RuleError::WildcardParam(template));
            }
            Some(list_params[0].name.clone())
        } else {
            None
        };

        for segment in &segments {
            if let Segment::Slot(name) = segment {
                let declared = self
                    .params
                    .iter()
                    .any(|p| p.name == *name && p.ty != ParamType::Body);
                if !declared {
                    return Err(RuleError::UndeclaredSlot {
                        template,
                        name: name.clone(),
                    });
                }
            }
        }

        let status = self.status.unwrap_or(match self.method {
            Method::Post => StatusCode::CREATED,
            _ => StatusCode::OK,
        });

        Ok(Rule {
            method: self.method,
            template,
            segments,
            params: self.params,
            body_param,
            wildcard_param,
            status,
            handler,
        })
    }
}
