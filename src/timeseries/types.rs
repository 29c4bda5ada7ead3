//! Channel data shapes exchanged between data sources and the query path.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Samples of one numeric channel.
///
/// `t` holds offsets from `start`; `x` is aligned with `t` by index and uses
/// `None` for a missing value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub start: f64,
    pub length: f64,
    pub t: Vec<f64>,
    pub x: Vec<Option<f64>>,
}

impl TimeSeries {
    pub fn new(start: f64, length: f64) -> Self {
        Self {
            start,
            length,
            t: Vec::new(),
            x: Vec::new(),
        }
    }

    /// Build from absolute `(time, value)` pairs.
    pub fn from_points(start: f64, length: f64, points: &[(f64, f64)]) -> Self {
        let mut series = Self::new(start, length);
        for &(time, value) in points {
            series.push(time - start, Some(value));
        }
        series
    }

    pub fn push(&mut self, t: f64, x: Option<f64>) {
        self.t.push(t);
        self.x.push(x);
    }

    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    /// Absolute time of the last sample.
    pub fn last_time(&self) -> Option<f64> {
        self.t.last().map(|t| self.start + t)
    }

    /// Absolute `(time, value)` pairs.
    pub fn points(&self) -> impl Iterator<Item = (f64, Option<f64>)> + '_ {
        self.t
            .iter()
            .zip(self.x.iter())
            .map(move |(t, x)| (self.start + t, *x))
    }
}

/// Single-point record of an object channel (histogram, graph, table, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub start: f64,
    pub length: f64,
    /// Offset of the record from `start`.
    pub t: f64,
    pub x: Value,
}

/// Data for one channel in a query result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChannelData {
    Series(TimeSeries),
    Object(ObjectRecord),
}

/// Query result keyed by channel name.
pub type DataFrame = BTreeMap<String, ChannelData>;

/// Declared shape of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    Numeric,
    Timeseries,
    Graph,
    Histogram,
    Table,
    Tree,
    Unknown,
}

/// Entry of a channel listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub channel_type: ChannelType,
    /// Served from the live cache.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub current: bool,
}

impl ChannelInfo {
    pub fn new(name: impl Into<String>, channel_type: ChannelType) -> Self {
        Self {
            name: name.into(),
            channel_type,
            current: false,
        }
    }
}
