//! Request conversion.
//!
//! # Responsibilities
//! - Map HTTP methods and WebSocket frames to dispatch methods
//! - Read the request body within the configured limit
//! - Build the normalized dispatch request (decoded path, query map)
//!
//! # Design Decisions
//! - Request ID added by the tower layer before this runs
//! - Methods without a dispatch equivalent are rejected with 405

use axum::body::{to_bytes, Body};
use axum::http::{request::Parts, HeaderMap, StatusCode};
use bytes::Bytes;

use crate::dispatch::request::{Method, Request};

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Request ID set by the request-id layer, or "unknown".
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// Build a dispatch request from HTTP parts and an already-read body.
pub fn from_parts(parts: &Parts, body: Bytes) -> Result<Request, StatusCode> {
    let method = Method::from_http(&parts.method).ok_or(StatusCode::METHOD_NOT_ALLOWED)?;
    let request = Request::parse(method, parts.uri.path(), parts.uri.query());
    Ok(if body.is_empty() {
        request
    } else {
        request.with_body(body)
    })
}

/// Read a body, failing with 413 past `limit` bytes.
pub async fn read_body(body: Body, limit: usize) -> Result<Bytes, StatusCode> {
    to_bytes(body, limit)
        .await
        .map_err(|_| StatusCode::PAYLOAD_TOO_LARGE)
}

/// Dispatch request for one inbound WebSocket frame on `path`.
pub fn from_frame(path: &str, query: Option<&str>, payload: Bytes) -> Request {
    Request::parse(Method::WebSocket, path, query).with_body(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request as HttpRequest;

    fn parts(method: &str, uri: &str) -> Parts {
        HttpRequest::builder()
            .method(method)
            .uri(uri)
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    #[test]
    fn test_from_parts() {
        let request = from_parts(
            &parts("GET", "/api/data/a%20b,c?length=60&to=-5"),
            Bytes::new(),
        )
        .unwrap();
        assert_eq!(request.method, Method::Get);
        assert_eq!(request.path, vec!["api", "data", "a b,c"]);
        assert_eq!(request.query.get("length").map(String::as_str), Some("60"));
        assert!(request.body.is_none());

        let request = from_parts(&parts("POST", "/api/publish/x"), Bytes::from("1")).unwrap();
        assert_eq!(request.body.as_deref(), Some(&b"1"[..]));
    }

    #[test]
    fn test_unsupported_method() {
        assert_eq!(
            from_parts(&parts("PUT", "/x"), Bytes::new()).unwrap_err(),
            StatusCode::METHOD_NOT_ALLOWED
        );
    }

    #[tokio::test]
    async fn test_body_limit() {
        assert!(read_body(Body::from("12345"), 5).await.is_ok());
        assert_eq!(
            read_body(Body::from("123456"), 5).await.unwrap_err(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[test]
    fn test_frame() {
        let request = from_frame("/api/publish/ch", None, Bytes::from("{}"));
        assert_eq!(request.method, Method::WebSocket);
        assert_eq!(request.path, vec!["api", "publish", "ch"]);
    }

    #[test]
    fn test_request_id() {
        let mut headers = HeaderMap::new();
        assert_eq!(request_id(&headers), "unknown");
        headers.insert(X_REQUEST_ID, "abc".parse().unwrap());
        assert_eq!(request_id(&headers), "abc");
    }
}
