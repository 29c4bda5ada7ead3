//! Per-provider rule table.
//!
//! # Responsibilities
//! - Store the compiled rules of one provider in declaration order
//! - Find every rule that applies to a request
//! - Invoke all of them and merge their replies locally
//!
//! # Design Decisions
//! - Immutable after construction (shared via Arc without locks)
//! - Binding failures are logged and treated as no-match
//! - Explicit `None` for no-match rather than an empty payload

use axum::http::StatusCode;
use std::sync::Arc;

use crate::dispatch::error::{DispatchError, HandlerError};
use crate::dispatch::request::Request;
use crate::dispatch::response::{Content, MergeOutcome, Reply, Response};
use crate::observability::metrics;
use crate::routing::handler::{Args, Call};
use crate::routing::rule::Rule;

/// Result of running a router against one request.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Locally merged content with the status of the contributing rule.
    Partial { status: StatusCode, content: Content },
    /// A complete response from one handler; aggregation stops here.
    Authoritative(Response),
}

/// Ordered list of rules belonging to one provider.
#[derive(Debug, Clone, Default)]
pub struct Router {
    rules: Vec<Rule>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule.
    pub fn route(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// All rules that apply to `request`, in declaration order, with their
    /// bound arguments.
    pub fn matches(&self, request: &Request) -> Vec<(&Rule, Args)> {
        let mut found = Vec::new();
        for rule in &self.rules {
            match rule.bind(request) {
                None => {}
                Some(Ok(args)) => found.push((rule, args)),
                Some(Err(e)) => {
                    tracing::debug!(
                        template = %rule.template(),
                        error = %e,
                        "Rule skipped"
                    );
                }
            }
        }
        found
    }

    /// First applicable rule, if any.
    pub fn first_match(&self, request: &Request) -> Option<(&Rule, Args)> {
        self.matches(request).into_iter().next()
    }

    /// Invoke every applicable rule and merge their replies.
    ///
    /// Returns `Ok(None)` when no rule applies. A handler error fails the whole
    /// provider so that the dispatcher can skip it.
    pub async fn handle(
        &self,
        provider: &str,
        request: &Arc<Request>,
    ) -> Result<Option<Outcome>, HandlerError> {
        let matched = self.matches(request);
        let Some((first, _)) = matched.first() else {
            return Ok(None);
        };

        let mut status = first.status();
        let mut content = Content::None;
        for (rule, args) in matched {
            let call = Call {
                args,
                request: Arc::clone(request),
            };
            match (rule.handler())(call).await? {
                Reply::Response(response) => return Ok(Some(Outcome::Authoritative(response))),
                Reply::Content(reply) => {
                    let was_empty = content.is_none();
                    match content.merge(reply) {
                        Ok(MergeOutcome::Merged) if was_empty => status = rule.status(),
                        Ok(MergeOutcome::KeptFirst) => {
                            tracing::warn!(
                                provider = %provider,
                                template = %rule.template(),
                                "Scalar collision, keeping first value"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => report_conflict(provider, rule, &e),
                    }
                }
            }
            if request.is_aborted() {
                break;
            }
        }

        Ok(Some(Outcome::Partial { status, content }))
    }
}

fn report_conflict(provider: &str, rule: &Rule, error: &DispatchError) {
    tracing::warn!(
        provider = %provider,
        template = %rule.template(),
        error = %error,
        "Aggregation error, dropping contribution"
    );
    metrics::record_merge_conflict();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::request::Method;
    use crate::routing::handler::{handler, sync_handler};
    use crate::routing::rule::ParamType;
    use serde_json::json;

    fn get(path: &str) -> Arc<Request> {
        Arc::new(Request::parse(Method::Get, path, None))
    }

    #[tokio::test]
    async fn test_no_match() {
        let router = Router::new().route(
            Rule::get("/a")
                .to(sync_handler(|_| Ok(json!(1).into())))
                .unwrap(),
        );
        assert_eq!(router.handle("p", &get("/b")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_cooperating_rules_merge_in_order() {
        let router = Router::new()
            .route(
                Rule::get("/channels")
                    .to(sync_handler(|_| Ok(json!(["a"]).into())))
                    .unwrap(),
            )
            .route(
                Rule::get("/channels")
                    .to(handler(|_| async { Ok::<Reply, HandlerError>(json!(["b"]).into()) }))
                    .unwrap(),
            );

        let outcome = router.handle("p", &get("/channels")).await.unwrap();
        assert_eq!(
            outcome,
            Some(Outcome::Partial {
                status: StatusCode::OK,
                content: Content::from(json!(["a", "b"])),
            })
        );
    }

    #[tokio::test]
    async fn test_binding_failure_is_no_match() {
        let router = Router::new().route(
            Rule::get("/n")
                .param("n", ParamType::Int)
                .to(sync_handler(|_| Ok(json!(1).into())))
                .unwrap(),
        );
        let request = Arc::new(Request::parse(Method::Get, "/n", Some("n=x")));
        assert!(router.matches(&request).is_empty());
        assert_eq!(router.handle("p", &request).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_authoritative_reply_short_circuits() {
        let router = Router::new()
            .route(
                Rule::get("/file")
                    .to(sync_handler(|_| Ok(Response::blob("text/csv", "a,b\n").into())))
                    .unwrap(),
            )
            .route(
                Rule::get("/file")
                    .to(sync_handler(|_| Err(HandlerError::Internal("not reached".into()))))
                    .unwrap(),
            );
        let outcome = router.handle("p", &get("/file")).await.unwrap();
        assert!(matches!(outcome, Some(Outcome::Authoritative(_))));
    }

    #[tokio::test]
    async fn test_handler_error_fails_provider() {
        let router = Router::new()
            .route(
                Rule::get("/x")
                    .to(sync_handler(|_| Ok(json!(["ok"]).into())))
                    .unwrap(),
            )
            .route(
                Rule::get("/x")
                    .to(sync_handler(|_| Err(HandlerError::Internal("boom".into()))))
                    .unwrap(),
            );
        assert!(router.handle("p", &get("/x")).await.is_err());
    }

    #[tokio::test]
    async fn test_first_match() {
        let router = Router::new()
            .route(
                Rule::get("/x/{id}")
                    .param("id", ParamType::Str)
                    .to(sync_handler(|_| Ok(Reply::none())))
                    .unwrap(),
            )
            .route(
                Rule::get("/x/{*}")
                    .param("rest", ParamType::PathList)
                    .to(sync_handler(|_| Ok(Reply::none())))
                    .unwrap(),
            );
        let request = get("/x/1");
        let (rule, args) = router.first_match(&request).unwrap();
        assert_eq!(rule.template(), "/x/{id}");
        assert_eq!(args.str("id"), Some("1"));
        assert_eq!(router.matches(&request).len(), 2);
    }
}
