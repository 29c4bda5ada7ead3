//! Data query provider: channel listing and windowed data.
//!
//! # Responsibilities
//! - Fan a query out to every configured data source, in order
//! - Splice live cache values into the historical result
//! - Resample centrally so every source shares one bucketing
//!
//! # Design Decisions
//! - A failing source is logged and skipped; the rest still answer
//! - Later sources overwrite earlier ones for the same channel
//! - Invalid query values answer 400 directly instead of joining the merge

use async_trait::async_trait;
use axum::http::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::cache::live::{now_secs, LiveCache};
use crate::cache::merge::{merge_channel_list, merge_data};
use crate::dispatch::app::Provider;
use crate::dispatch::error::{HandlerError, HandlerResult};
use crate::dispatch::response::{Reply, Response};
use crate::observability::metrics;
use crate::plugins::source::{DataSource, SourceError};
use crate::routing::{handler, Call, ParamType, Router, Rule, RuleError};
use crate::timeseries::resample::{resample_frame, Reducer};
use crate::timeseries::types::{ChannelInfo, DataFrame};

/// Window length used when a query gives none, in seconds.
pub const DEFAULT_LENGTH: f64 = 3600.0;

struct QueryState {
    sources: Vec<Arc<dyn DataSource>>,
    cache: Option<LiveCache>,
}

pub struct DataQueryProvider {
    router: Router,
    state: Arc<QueryState>,
}

impl DataQueryProvider {
    pub fn new(
        sources: Vec<Arc<dyn DataSource>>,
        cache: Option<LiveCache>,
    ) -> Result<Self, RuleError> {
        let state = Arc::new(QueryState { sources, cache });

        let channels_state = Arc::clone(&state);
        let data_state = Arc::clone(&state);
        let router = Router::new()
            .route(Rule::get("/api/channels").to(handler(move |_call| {
                let state = Arc::clone(&channels_state);
                async move { list_channels(&state).await }
            }))?)
            .route(
                Rule::get("/api/data/{channels}")
                    .param("channels", ParamType::Str)
                    .param_or("length", ParamType::Float, json!(DEFAULT_LENGTH))
                    .param_or("to", ParamType::Float, json!(0.0))
                    .param_or("resample", ParamType::Float, Value::Null)
                    .param_or("reducer", ParamType::Str, json!("last"))
                    .to(handler(move |call| {
                        let state = Arc::clone(&data_state);
                        async move { query_data(&state, call).await }
                    }))?,
            );

        Ok(Self { router, state })
    }
}

#[async_trait]
impl Provider for DataQueryProvider {
    fn name(&self) -> &str {
        "data"
    }

    fn router(&self) -> &Router {
        &self.router
    }

    async fn on_startup(&self) -> Result<(), HandlerError> {
        for source in &self.state.sources {
            match source.open().await {
                Ok(()) => tracing::debug!(source = %source.name(), "Data source opened"),
                Err(e) => source_failed(source.as_ref(), &e),
            }
        }
        Ok(())
    }

    async fn on_shutdown(&self) -> Result<(), HandlerError> {
        for source in self.state.sources.iter().rev() {
            if let Err(e) = source.close().await {
                tracing::warn!(source = %source.name(), error = %e, "Data source close failed");
            }
        }
        Ok(())
    }
}

fn source_failed(source: &dyn DataSource, error: &SourceError) {
    tracing::warn!(source = %source.name(), error = %error, "Data source failed, skipping");
    metrics::record_provider_fault(source.name());
}

/// Split a comma-separated channel list, dropping blanks and repeats.
pub fn split_channels(raw: &str) -> Vec<String> {
    let mut channels: Vec<String> = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !channels.iter().any(|c| c == name) {
            channels.push(name.to_string());
        }
    }
    channels
}

/// Resolve a relative end time: `to <= 0` means `now + to`.
pub fn resolve_to(to: f64, now: f64) -> f64 {
    if to <= 0.0 {
        now + to
    } else {
        to
    }
}

async fn list_channels(state: &QueryState) -> HandlerResult<Reply> {
    let mut channels: Vec<ChannelInfo> = Vec::new();
    for source in &state.sources {
        match source.get_channels().await {
            Ok(found) => channels.extend(found),
            Err(e) => source_failed(source.as_ref(), &e),
        }
    }
    if let Some(cache) = &state.cache {
        channels = merge_channel_list(channels, &cache.snapshot());
    }

    let items = channels
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<Value>, _>>()
        .map_err(|e| HandlerError::Internal(e.to_string()))?;
    Ok(Value::Array(items).into())
}

async fn query_data(state: &QueryState, call: Call) -> HandlerResult<Reply> {
    let args = &call.args;
    let channels = split_channels(args.str("channels").unwrap_or_default());
    let length = args.f64("length").unwrap_or(DEFAULT_LENGTH);
    if length <= 0.0 {
        return Ok(Response::error(
            StatusCode::BAD_REQUEST,
            format!("length must be positive, got {}", length),
        )
        .into());
    }
    let reducer = match args.str("reducer").unwrap_or_default().parse::<Reducer>() {
        Ok(reducer) => reducer,
        Err(e) => return Ok(Response::error(StatusCode::BAD_REQUEST, e.to_string()).into()),
    };
    let to = resolve_to(args.f64("to").unwrap_or(0.0), now_secs());

    let mut frame = DataFrame::new();
    for source in &state.sources {
        let series = source.get_timeseries(&channels, length, to).await;
        let objects = match series {
            Ok(part) => {
                frame.extend(part);
                source.get_object(&channels, length, to).await
            }
            Err(e) => Err(e),
        };
        match objects {
            Ok(part) => frame.extend(part),
            Err(e) => source_failed(source.as_ref(), &e),
        }
    }

    if let Some(cache) = &state.cache {
        frame = merge_data(frame, &cache.snapshot(), &channels, length, to);
    }

    if let Some(interval) = args.f64("resample") {
        frame = match resample_frame(frame, length, to, interval, reducer) {
            Ok(resampled) => resampled,
            Err(e) => return Ok(Response::error(StatusCode::BAD_REQUEST, e.to_string()).into()),
        };
    }

    tracing::debug!(
        channels = channels.len(),
        returned = frame.len(),
        length = length,
        to = to,
        "Data query"
    );
    let value = serde_json::to_value(&frame).map_err(|e| HandlerError::Internal(e.to_string()))?;
    Ok(value.into())
}
