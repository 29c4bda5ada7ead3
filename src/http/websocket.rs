//! WebSocket sessions.
//!
//! # Responsibilities
//! - Detect WebSocket upgrade requests
//! - Dispatch every inbound frame as a `WEBSOCKET` request on the upgraded path
//! - Push live cache changes to `/api/subscribe/{channels}` clients
//!
//! # Data Flow
//! ```text
//! Client ── text/binary frame ──→ App::dispatch(WEBSOCKET path, body=frame)
//!        ←── error frame (only when the dispatch status is 4xx/5xx)
//!
//! LiveCache feed ── PublishEvent ──→ filter by channel ──→ Client
//! ```
//!
//! # Design Decisions
//! - One uuid per session, carried in every log line of that session
//! - Frames are dispatched one at a time, in arrival order
//! - A lagging subscriber skips missed events instead of closing

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response as HttpResponse};
use bytes::Bytes;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use crate::cache::live::{LiveCache, PublishEvent};
use crate::dispatch::App;
use crate::http::request::from_frame;
use crate::http::server::ServerState;
use crate::plugins::query::split_channels;

/// Whether the headers ask for a WebSocket upgrade.
pub fn is_upgrade(headers: &HeaderMap) -> bool {
    headers
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("websocket"))
}

/// Channels a subscriber asked for; `None` means every channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelFilter(Option<HashSet<String>>);

impl ChannelFilter {
    pub fn parse(raw: &str) -> Self {
        let channels = split_channels(raw);
        if channels.iter().any(|c| c == "*") {
            ChannelFilter(None)
        } else {
            ChannelFilter(Some(channels.into_iter().collect()))
        }
    }

    pub fn accepts(&self, channel: &str) -> bool {
        match &self.0 {
            None => true,
            Some(set) => set.contains(channel),
        }
    }
}

/// Dispatch every inbound frame until the client goes away.
pub async fn dispatch_session(
    mut socket: WebSocket,
    app: Arc<App>,
    path: String,
    query: Option<String>,
) {
    let session = Uuid::new_v4();
    tracing::info!(session = %session, path = %path, "WebSocket session opened");

    while let Some(message) = socket.recv().await {
        let payload = match message {
            Ok(Message::Text(text)) => Bytes::copy_from_slice(text.as_str().as_bytes()),
            Ok(Message::Binary(bytes)) => bytes,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(session = %session, error = %e, "WebSocket receive failed");
                break;
            }
        };

        let response = app
            .dispatch(from_frame(&path, query.as_deref(), payload))
            .await;
        tracing::debug!(session = %session, status = %response.status, "Frame dispatched");

        if response.status.is_client_error() || response.status.is_server_error() {
            let mut reply = json!({ "status": response.status.as_u16() });
            if let Some(body) = response.content.to_json() {
                reply["body"] = body;
            }
            if socket
                .send(Message::Text(reply.to_string().into()))
                .await
                .is_err()
            {
                break;
            }
        }
    }

    tracing::info!(session = %session, "WebSocket session closed");
}

fn event_frame(event: &PublishEvent) -> Option<Message> {
    serde_json::to_string(event)
        .ok()
        .map(|text| Message::Text(text.into()))
}

/// Push the current values, then every change, for the filtered channels.
pub async fn subscribe_session(mut socket: WebSocket, cache: LiveCache, filter: ChannelFilter) {
    let session = Uuid::new_v4();
    let mut feed = cache.subscribe();
    tracing::info!(session = %session, "Subscriber connected");

    for (channel, entry) in cache.snapshot() {
        if !filter.accepts(&channel) {
            continue;
        }
        let event = PublishEvent {
            channel,
            timestamp: entry.timestamp,
            data: entry.data,
        };
        if let Some(frame) = event_frame(&event) {
            if socket.send(frame).await.is_err() {
                return;
            }
        }
    }

    loop {
        tokio::select! {
            received = feed.recv() => match received {
                Ok(event) => {
                    if !filter.accepts(&event.channel) {
                        continue;
                    }
                    let Some(frame) = event_frame(&event) else {
                        continue;
                    };
                    if socket.send(frame).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(session = %session, missed = missed, "Subscriber lagged");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    tracing::info!(session = %session, "Subscriber disconnected");
}

/// `GET /api/subscribe/{channels}` upgrade handler.
pub async fn subscribe_handler(
    State(state): State<ServerState>,
    Path(channels): Path<String>,
    ws: WebSocketUpgrade,
) -> HttpResponse {
    let Some(cache) = state.cache.clone() else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let filter = ChannelFilter::parse(&channels);
    ws.on_upgrade(move |socket| subscribe_session(socket, cache, filter))
}
