//! Splicing live values into historical query results.
//!
//! Pure functions of (cache snapshot, historical result): no I/O, no clock.
//!
//! # Rules
//! - Entries stamped outside `[to - length, to]` are ignored
//! - No history: the cached value becomes the whole result
//! - History present: append only if strictly newer than the last sample
//!   by more than [`TIME_TOLERANCE`]

use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

use crate::cache::live::CacheEntry;
use crate::timeseries::types::{
    ChannelData, ChannelInfo, ChannelType, DataFrame, ObjectRecord, TimeSeries,
};

/// Two samples closer than this (seconds) are the same sample.
pub const TIME_TOLERANCE: f64 = 1e-3;

/// Guess a channel's type from the shape of a published payload.
pub fn infer_channel_type(data: &Value) -> ChannelType {
    match data {
        Value::Number(_) => ChannelType::Numeric,
        Value::Array(items) if items.iter().all(is_scalar) => ChannelType::Timeseries,
        Value::Object(map) => {
            if map.contains_key("bins") {
                ChannelType::Histogram
            } else if map.contains_key("y") {
                ChannelType::Graph
            } else if map.contains_key("columns") || map.contains_key("table") {
                ChannelType::Table
            } else if map.contains_key("tree") {
                ChannelType::Tree
            } else if map.get("t").is_some_and(Value::is_array)
                && map.get("x").is_some_and(Value::is_array)
            {
                ChannelType::Timeseries
            } else {
                ChannelType::Unknown
            }
        }
        _ => ChannelType::Unknown,
    }
}

fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::Number(_) | Value::Bool(_) | Value::Null)
}

/// Add an entry for every cached channel missing from `historical`.
pub fn merge_channel_list(
    mut historical: Vec<ChannelInfo>,
    snapshot: &BTreeMap<String, CacheEntry>,
) -> Vec<ChannelInfo> {
    let known: HashSet<String> = historical.iter().map(|c| c.name.clone()).collect();
    for (name, entry) in snapshot {
        if known.contains(name) {
            continue;
        }
        historical.push(ChannelInfo {
            name: name.clone(),
            channel_type: infer_channel_type(&entry.data),
            current: true,
        });
    }
    historical
}

/// Build a result for a channel that only exists in the cache.
fn from_cache(entry: &CacheEntry, length: f64, to: f64) -> ChannelData {
    let start = to - length;
    if let Some(value) = entry.data.as_f64() {
        let mut series = TimeSeries::new(start, length);
        series.push(entry.timestamp - start, Some(value));
        return ChannelData::Series(series);
    }
    if let Ok(series) = serde_json::from_value::<TimeSeries>(entry.data.clone()) {
        return ChannelData::Series(series);
    }
    ChannelData::Object(ObjectRecord {
        start,
        length,
        t: entry.timestamp - start,
        x: entry.data.clone(),
    })
}

/// Splice cached values for `channels` into `historical`.
pub fn merge_data(
    mut historical: DataFrame,
    snapshot: &BTreeMap<String, CacheEntry>,
    channels: &[String],
    length: f64,
    to: f64,
) -> DataFrame {
    for channel in channels {
        let Some(entry) = snapshot.get(channel) else {
            continue;
        };
        if entry.timestamp < to - length || entry.timestamp > to {
            continue;
        }

        match historical.get_mut(channel) {
            None => {
                historical.insert(channel.clone(), from_cache(entry, length, to));
            }
            Some(ChannelData::Series(series)) => {
                let Some(value) = entry.data.as_f64() else {
                    continue;
                };
                let newer = series
                    .last_time()
                    .map_or(true, |last| entry.timestamp > last + TIME_TOLERANCE);
                if newer {
                    series.push(entry.timestamp - series.start, Some(value));
                }
            }
            Some(ChannelData::Object(record)) => {
                if entry.timestamp > record.start + record.t + TIME_TOLERANCE {
                    record.t = entry.timestamp - record.start;
                    record.x = entry.data.clone();
                }
            }
        }
    }
    historical
}
