//! Response rendering.
//!
//! # Responsibilities
//! - Turn an aggregated dispatch response into an HTTP response
//! - Pick the content type from the payload kind
//!
//! # Design Decisions
//! - Lists, dicts and non-string scalars render as JSON
//! - String scalars render as `text/plain`
//! - Bytes render as `application/octet-stream` unless the handler set a type
//! - An empty payload renders as an empty body with the status alone

use axum::body::Body;
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response as HttpResponse};
use bytes::Bytes;
use serde_json::Value;

use crate::dispatch::response::{Content, Response};

pub const JSON: &str = "application/json";
pub const TEXT: &str = "text/plain; charset=utf-8";
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Body bytes and default content type for a payload.
pub fn encode(content: Content) -> Option<(Bytes, &'static str)> {
    match content {
        Content::None => None,
        Content::Bytes(bytes) => Some((bytes, OCTET_STREAM)),
        Content::Scalar(Value::String(text)) => Some((Bytes::from(text), TEXT)),
        other => {
            let value = other.to_json().unwrap_or(Value::Null);
            Some((Bytes::from(value.to_string()), JSON))
        }
    }
}

/// Render a dispatch response for the HTTP transport.
pub fn render(response: Response) -> HttpResponse {
    let status = response.status;
    let Some((body, default_type)) = encode(response.content) else {
        return status.into_response();
    };

    let content_type = response
        .content_type
        .as_deref()
        .and_then(|ct| HeaderValue::from_str(ct).ok())
        .unwrap_or_else(|| HeaderValue::from_static(default_type));

    let mut http = HttpResponse::new(Body::from(body));
    *http.status_mut() = status;
    http.headers_mut().insert(header::CONTENT_TYPE, content_type);
    http
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use serde_json::json;

    async fn body_of(response: HttpResponse) -> Bytes {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
    }

    fn content_type(response: &HttpResponse) -> &str {
        response.headers()[header::CONTENT_TYPE].to_str().unwrap()
    }

    #[tokio::test]
    async fn test_json_kinds() {
        for value in [json!(["a"]), json!({"k": 1}), json!(3.5), json!(true)] {
            let response = render(Response::new(StatusCode::OK, value.clone()));
            assert_eq!(content_type(&response), JSON);
            let body = body_of(response).await;
            assert_eq!(serde_json::from_slice::<Value>(&body).unwrap(), value);
        }
    }

    #[tokio::test]
    async fn test_text_scalar() {
        let response = render(Response::new(StatusCode::OK, "pong"));
        assert_eq!(content_type(&response), TEXT);
        assert_eq!(body_of(response).await, Bytes::from("pong"));
    }

    #[tokio::test]
    async fn test_bytes() {
        let response = render(Response::new(StatusCode::OK, Bytes::from_static(b"\x00\x01")));
        assert_eq!(content_type(&response), OCTET_STREAM);

        let response = render(Response::blob("text/csv", "a,b\n"));
        assert_eq!(content_type(&response), "text/csv");
        assert_eq!(body_of(response).await, Bytes::from("a,b\n"));
    }

    #[tokio::test]
    async fn test_empty() {
        let response = render(Response::not_found());
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().get(header::CONTENT_TYPE).is_none());
        assert!(body_of(response).await.is_empty());
    }
}
