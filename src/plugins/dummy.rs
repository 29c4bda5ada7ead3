//! Synthetic waveform source for demos and tests.
//!
//! Samples are taken at every multiple of `interval` inside the requested
//! window, so two queries over the same window return identical data.

use async_trait::async_trait;
use serde_json::Value;
use std::f64::consts::TAU;
use std::str::FromStr;

use crate::config::schema::DataSourceConfig;
use crate::plugins::source::{DataSource, SourceError};
use crate::timeseries::types::{ChannelData, ChannelInfo, ChannelType, DataFrame, TimeSeries};

/// Upper bound on samples returned per channel; the newest are kept.
pub const MAX_SAMPLES: usize = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sin,
    Cos,
    Ramp,
}

impl Waveform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Waveform::Sin => "sin",
            Waveform::Cos => "cos",
            Waveform::Ramp => "ramp",
        }
    }

    fn sample(&self, time: f64, period: f64, amplitude: f64) -> f64 {
        let phase = time.rem_euclid(period) / period;
        match self {
            Waveform::Sin => amplitude * (TAU * phase).sin(),
            Waveform::Cos => amplitude * (TAU * phase).cos(),
            Waveform::Ramp => amplitude * phase,
        }
    }
}

impl FromStr for Waveform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sin" => Ok(Waveform::Sin),
            "cos" => Ok(Waveform::Cos),
            "ramp" => Ok(Waveform::Ramp),
            other => Err(format!("unknown waveform '{}'", other)),
        }
    }
}

pub struct DummySource {
    name: String,
    interval: f64,
    period: f64,
    amplitude: f64,
    waveforms: Vec<Waveform>,
}

impl DummySource {
    pub fn new(name: impl Into<String>, interval: f64, waveforms: Vec<Waveform>) -> Self {
        Self {
            name: name.into(),
            interval,
            period: 60.0,
            amplitude: 1.0,
            waveforms,
        }
    }

    pub fn from_config(config: &DataSourceConfig) -> Result<Self, SourceError> {
        let params = &config.params;
        let number = |key: &str, default: f64| -> Result<f64, SourceError> {
            match params.get(key) {
                None | Some(Value::Null) => Ok(default),
                Some(value) => value
                    .as_f64()
                    .filter(|v| v.is_finite() && *v > 0.0)
                    .ok_or_else(|| {
                        SourceError::invalid(&config.name, format!("'{}' must be a positive number", key))
                    }),
            }
        };

        let waveforms = match params.get("channels") {
            None | Some(Value::Null) => vec![Waveform::Sin, Waveform::Cos, Waveform::Ramp],
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .ok_or_else(|| "channel names must be strings".to_string())
                        .and_then(Waveform::from_str)
                })
                .collect::<Result<Vec<_>, _>>()
                .map_err(|reason| SourceError::invalid(&config.name, reason))?,
            Some(_) => {
                return Err(SourceError::invalid(&config.name, "'channels' must be a list"));
            }
        };

        Ok(Self {
            name: config.name.clone(),
            interval: number("interval", 1.0)?,
            period: number("period", 60.0)?,
            amplitude: number("amplitude", 1.0)?,
            waveforms,
        })
    }

    fn find(&self, channel: &str) -> Option<Waveform> {
        self.waveforms
            .iter()
            .copied()
            .find(|w| w.as_str() == channel)
    }

    fn series(&self, waveform: Waveform, length: f64, to: f64) -> TimeSeries {
        let start = to - length;
        let first = (start / self.interval).ceil() as i64;
        let last = (to / self.interval).floor() as i64;
        let first = first.max(last - MAX_SAMPLES as i64 + 1);

        let mut series = TimeSeries::new(start, length);
        for k in first..=last {
            let time = k as f64 * self.interval;
            series.push(
                time - start,
                Some(waveform.sample(time, self.period, self.amplitude)),
            );
        }
        series
    }
}

#[async_trait]
impl DataSource for DummySource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_channels(&self) -> Result<Vec<ChannelInfo>, SourceError> {
        Ok(self
            .waveforms
            .iter()
            .map(|w| ChannelInfo::new(w.as_str(), ChannelType::Timeseries))
            .collect())
    }

    async fn get_timeseries(
        &self,
        channels: &[String],
        length: f64,
        to: f64,
    ) -> Result<DataFrame, SourceError> {
        let mut frame = DataFrame::new();
        for channel in channels {
            if let Some(waveform) = self.find(channel) {
                frame.insert(
                    channel.clone(),
                    ChannelData::Series(self.series(waveform, length, to)),
                );
            }
        }
        Ok(frame)
    }

    async fn get_object(
        &self,
        _channels: &[String],
        _length: f64,
        _to: f64,
    ) -> Result<DataFrame, SourceError> {
        Ok(DataFrame::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_grid_aligned_samples() {
        let source = DummySource::new("sim", 10.0, vec![Waveform::Ramp]);
        let frame = source
            .get_timeseries(&["ramp".to_string(), "sin".to_string()], 30.0, 125.0)
            .await
            .unwrap();
        assert_eq!(frame.len(), 1);

        let ChannelData::Series(series) = &frame["ramp"] else {
            panic!("expected series");
        };
        let times: Vec<f64> = series.points().map(|(t, _)| t).collect();
        assert_eq!(times, vec![100.0, 110.0, 120.0]);
        assert_eq!(series.x[0], Some(40.0 / 60.0));
    }

    #[tokio::test]
    async fn test_deterministic() {
        let source = DummySource::new("sim", 1.0, vec![Waveform::Sin, Waveform::Cos]);
        let channels = vec!["sin".to_string(), "cos".to_string()];
        let a = source.get_timeseries(&channels, 60.0, 1000.0).await.unwrap();
        let b = source.get_timeseries(&channels, 60.0, 1000.0).await.unwrap();
        assert_eq!(a, b);
        assert!(source.get_object(&channels, 60.0, 1000.0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sample_cap() {
        let source = DummySource::new("sim", 1.0, vec![Waveform::Sin]);
        let frame = source
            .get_timeseries(&["sin".to_string()], 1e9, 2e9)
            .await
            .unwrap();
        let ChannelData::Series(series) = &frame["sin"] else {
            panic!("expected series");
        };
        assert_eq!(series.len(), MAX_SAMPLES);
        assert_eq!(series.last_time(), Some(2e9));
    }

    #[tokio::test]
    async fn test_from_config() {
        let source = DummySource::from_config(&DataSourceConfig::new(
            "sim",
            "dummy",
            json!({"interval": 0.5, "channels": ["cos"]}),
        ))
        .unwrap();
        let channels = source.get_channels().await.unwrap();
        assert_eq!(channels, vec![ChannelInfo::new("cos", ChannelType::Timeseries)]);

        for params in [
            json!({"interval": 0}),
            json!({"period": "x"}),
            json!({"channels": ["square"]}),
            json!({"channels": "sin"}),
        ] {
            let result = DummySource::from_config(&DataSourceConfig::new("sim", "dummy", params));
            assert!(result.is_err());
        }
    }
}
