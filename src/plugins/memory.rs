//! In-memory data source with static channels.
//!
//! Params:
//! ```toml
//! params = { channels = { temp = [[0, 20.5], [60, 21.0]], hist = [[0, { bins = [1, 2] }]] } }
//! ```
//! A channel whose values are all numbers is a time series; anything else is
//! an object channel.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::cache::merge::infer_channel_type;
use crate::config::schema::DataSourceConfig;
use crate::plugins::source::{DataSource, SourceError};
use crate::timeseries::types::{
    ChannelData, ChannelInfo, ChannelType, DataFrame, ObjectRecord, TimeSeries,
};

pub struct MemorySource {
    name: String,
    series: BTreeMap<String, Vec<(f64, f64)>>,
    objects: BTreeMap<String, Vec<(f64, Value)>>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            series: BTreeMap::new(),
            objects: BTreeMap::new(),
        }
    }

    /// Add a numeric channel from absolute `(time, value)` samples.
    pub fn with_series(mut self, channel: &str, mut samples: Vec<(f64, f64)>) -> Self {
        samples.sort_by(|a, b| a.0.total_cmp(&b.0));
        self.series.insert(channel.to_string(), samples);
        self
    }

    /// Add an object channel from absolute `(time, value)` records.
    pub fn with_object(mut self, channel: &str, mut records: Vec<(f64, Value)>) -> Self {
        records.sort_by(|a, b| a.0.total_cmp(&b.0));
        self.objects.insert(channel.to_string(), records);
        self
    }

    pub fn from_config(config: &DataSourceConfig) -> Result<Self, SourceError> {
        let mut source = Self::new(&config.name);
        let channels = match config.params.get("channels") {
            None | Some(Value::Null) => return Ok(source),
            Some(Value::Object(map)) => map,
            Some(_) => return Err(SourceError::invalid(&config.name, "'channels' must be a table")),
        };

        for (channel, samples) in channels {
            let records = parse_records(&config.name, channel, samples)?;
            if records.iter().all(|(_, x)| x.is_number()) {
                let numeric = records
                    .into_iter()
                    .filter_map(|(t, x)| x.as_f64().map(|x| (t, x)))
                    .collect();
                source = source.with_series(channel, numeric);
            } else {
                source = source.with_object(channel, records);
            }
        }
        Ok(source)
    }
}

fn parse_records(
    source: &str,
    channel: &str,
    samples: &Value,
) -> Result<Vec<(f64, Value)>, SourceError> {
    let invalid = || {
        SourceError::invalid(
            source,
            format!("channel '{}' must be a list of [time, value] pairs", channel),
        )
    };
    let items = samples.as_array().ok_or_else(invalid)?;
    items
        .iter()
        .map(|item| match item.as_array().map(Vec::as_slice) {
            Some([t, x]) => t.as_f64().map(|t| (t, x.clone())).ok_or_else(invalid),
            _ => Err(invalid()),
        })
        .collect()
}

fn in_window(time: f64, length: f64, to: f64) -> bool {
    time >= to - length && time <= to
}

#[async_trait]
impl DataSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_channels(&self) -> Result<Vec<ChannelInfo>, SourceError> {
        let mut channels: Vec<ChannelInfo> = self
            .series
            .keys()
            .map(|name| ChannelInfo::new(name.clone(), ChannelType::Timeseries))
            .collect();
        for (name, records) in &self.objects {
            let channel_type = records
                .last()
                .map(|(_, x)| infer_channel_type(x))
                .unwrap_or(ChannelType::Unknown);
            channels.push(ChannelInfo::new(name.clone(), channel_type));
        }
        Ok(channels)
    }

    async fn get_timeseries(
        &self,
        channels: &[String],
        length: f64,
        to: f64,
    ) -> Result<DataFrame, SourceError> {
        let start = to - length;
        let mut frame = DataFrame::new();
        for channel in channels {
            let Some(samples) = self.series.get(channel) else {
                continue;
            };
            let points: Vec<(f64, f64)> = samples
                .iter()
                .copied()
                .filter(|(t, _)| in_window(*t, length, to))
                .collect();
            frame.insert(
                channel.clone(),
                ChannelData::Series(TimeSeries::from_points(start, length, &points)),
            );
        }
        Ok(frame)
    }

    async fn get_object(
        &self,
        channels: &[String],
        length: f64,
        to: f64,
    ) -> Result<DataFrame, SourceError> {
        let start = to - length;
        let mut frame = DataFrame::new();
        for channel in channels {
            let Some(records) = self.objects.get(channel) else {
                continue;
            };
            let latest = records
                .iter()
                .rev()
                .find(|(t, _)| in_window(*t, length, to));
            if let Some((t, x)) = latest {
                frame.insert(
                    channel.clone(),
                    ChannelData::Object(ObjectRecord {
                        start,
                        length,
                        t: t - start,
                        x: x.clone(),
                    }),
                );
            }
        }
        Ok(frame)
    }
}
