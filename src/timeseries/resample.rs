//! Alignment of irregular time series onto a shared bucket grid.
//!
//! # Grid
//! ```text
//! nbins = floor(length / interval)      (+1 if there is a remainder)
//! start = to - nbins * interval
//! bucket(t) = floor((t - start) / interval), kept if t in [start, to)
//! nbins <= MAX_BUCKETS, otherwise the request is rejected
//! output t[k] = interval * (k + 0.5)
//! ```
//!
//! # Design Decisions
//! - Pure functions: no clock, no I/O
//! - Empty buckets yield `None` (serialized as null), except `count`
//! - Auto interval: median of per-series median spacing, at least 1 s and
//!   never finer than `length / MAX_BUCKETS`

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::timeseries::types::{ChannelData, DataFrame, TimeSeries};

/// Tolerance, relative to the interval, for samples sitting on a bucket edge.
const EDGE_TOLERANCE: f64 = 1e-9;

/// Upper bound on the number of buckets of one grid.
pub const MAX_BUCKETS: usize = 1_000_000;

/// Bucket reduction function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reducer {
    First,
    #[default]
    Last,
    Mean,
    Median,
    Sum,
    Count,
    Std,
    Min,
    Max,
}

impl Reducer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reducer::First => "first",
            Reducer::Last => "last",
            Reducer::Mean => "mean",
            Reducer::Median => "median",
            Reducer::Sum => "sum",
            Reducer::Count => "count",
            Reducer::Std => "std",
            Reducer::Min => "min",
            Reducer::Max => "max",
        }
    }

    /// Reduce the samples of one bucket, given in time order.
    pub fn reduce(&self, samples: &[Option<f64>]) -> Option<f64> {
        if *self == Reducer::Count {
            return Some(samples.len() as f64);
        }

        let valid: Vec<f64> = samples
            .iter()
            .filter_map(|x| *x)
            .filter(|x| !x.is_nan())
            .collect();
        if valid.is_empty() {
            return None;
        }

        let n = valid.len() as f64;
        let value = match self {
            Reducer::First => valid[0],
            Reducer::Last => valid[valid.len() - 1],
            Reducer::Sum => valid.iter().sum::<f64>(),
            Reducer::Mean => valid.iter().sum::<f64>() / n,
            Reducer::Median => median(valid),
            Reducer::Std => {
                let mean = valid.iter().sum::<f64>() / n;
                (valid.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n).sqrt()
            }
            Reducer::Min => valid.iter().copied().fold(f64::INFINITY, f64::min),
            Reducer::Max => valid.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Reducer::Count => unreachable!("handled above"),
        };
        Some(value)
    }
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Reducer {
    type Err = ResampleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(Reducer::First),
            "last" => Ok(Reducer::Last),
            "mean" => Ok(Reducer::Mean),
            "median" => Ok(Reducer::Median),
            "sum" => Ok(Reducer::Sum),
            "count" => Ok(Reducer::Count),
            "std" => Ok(Reducer::Std),
            "min" => Ok(Reducer::Min),
            "max" => Ok(Reducer::Max),
            _ => Err(ResampleError::UnknownReducer(s.to_string())),
        }
    }
}

/// Errors from resampling requests.
#[derive(Debug, Error, PartialEq)]
pub enum ResampleError {
    #[error("unknown reducer '{0}'")]
    UnknownReducer(String),

    #[error("window length must be positive, got {0}")]
    InvalidLength(f64),

    #[error("window of {length} s at interval {interval} s exceeds {max} buckets", max = MAX_BUCKETS)]
    TooManyBuckets { length: f64, interval: f64 },
}

fn median(mut values: Vec<f64>) -> f64 {
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Fixed-width bucket grid ending at `to`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    pub start: f64,
    pub end: f64,
    pub interval: f64,
    pub nbins: usize,
}

impl Grid {
    /// Grid covering `[to - length, to)`, grown by one bucket on the left when
    /// `length` is not a whole number of intervals.
    pub fn new(length: f64, to: f64, interval: f64) -> Result<Self, ResampleError> {
        let ratio = length / interval;
        if !ratio.is_finite() || ratio > MAX_BUCKETS as f64 {
            return Err(ResampleError::TooManyBuckets { length, interval });
        }
        let whole = (ratio + EDGE_TOLERANCE).floor();
        let mut nbins = whole as usize;
        let mut start = to - whole * interval;
        if nbins == 0 || length - whole * interval > interval * EDGE_TOLERANCE {
            nbins += 1;
            start -= interval;
        }
        Ok(Self {
            start,
            end: to,
            interval,
            nbins,
        })
    }

    pub fn length(&self) -> f64 {
        self.nbins as f64 * self.interval
    }

    /// Bucket index of an absolute time, if it falls on the grid.
    pub fn bucket(&self, time: f64) -> Option<usize> {
        let lower = self.start - self.interval * EDGE_TOLERANCE;
        if !(time >= lower && time < self.end) {
            return None;
        }
        // The tolerance lifts edge samples rounded down; clamp anything it
        // pushes past the last bucket.
        let k = ((time - self.start) / self.interval + EDGE_TOLERANCE)
            .floor()
            .max(0.0) as usize;
        Some(k.min(self.nbins - 1))
    }

    /// Midpoint offset of bucket `k` from `start`.
    pub fn midpoint(&self, k: usize) -> f64 {
        self.interval * (k as f64 + 0.5)
    }
}

/// Natural bucket width for a set of series.
pub fn auto_interval<'a>(series: impl IntoIterator<Item = &'a TimeSeries>, length: f64) -> f64 {
    let spacings: Vec<f64> = series
        .into_iter()
        .filter(|s| s.len() >= 2)
        .map(|s| median(s.t.windows(2).map(|w| w[1] - w[0]).collect()))
        .collect();

    let estimate = if spacings.is_empty() {
        length / 100.0
    } else {
        median(spacings)
    };
    estimate.max(1.0).max(length / MAX_BUCKETS as f64)
}

/// Align every series onto one grid and reduce each bucket.
///
/// `interval <= 0` selects [`auto_interval`].
pub fn resample(
    input: &BTreeMap<String, TimeSeries>,
    length: f64,
    to: f64,
    interval: f64,
    reducer: Reducer,
) -> Result<BTreeMap<String, TimeSeries>, ResampleError> {
    if length.is_nan() || length <= 0.0 {
        return Err(ResampleError::InvalidLength(length));
    }
    let interval = if interval > 0.0 {
        interval
    } else {
        auto_interval(input.values(), length)
    };
    let grid = Grid::new(length, to, interval)?;

    Ok(input
        .iter()
        .map(|(name, series)| (name.clone(), resample_one(series, &grid, reducer)))
        .collect())
}

fn resample_one(series: &TimeSeries, grid: &Grid, reducer: Reducer) -> TimeSeries {
    let mut buckets: Vec<Vec<(f64, Option<f64>)>> = vec![Vec::new(); grid.nbins];
    for (time, value) in series.points() {
        if let Some(k) = grid.bucket(time) {
            buckets[k].push((time, value));
        }
    }

    let mut out = TimeSeries::new(grid.start, grid.length());
    for (k, mut samples) in buckets.into_iter().enumerate() {
        samples.sort_by(|a, b| a.0.total_cmp(&b.0));
        let values: Vec<Option<f64>> = samples.into_iter().map(|(_, x)| x).collect();
        out.push(grid.midpoint(k), reducer.reduce(&values));
    }
    out
}

/// Resample the series entries of a frame; object entries pass through.
pub fn resample_frame(
    frame: DataFrame,
    length: f64,
    to: f64,
    interval: f64,
    reducer: Reducer,
) -> Result<DataFrame, ResampleError> {
    let mut series = BTreeMap::new();
    let mut out = DataFrame::new();
    for (name, data) in frame {
        match data {
            ChannelData::Series(s) => {
                series.insert(name, s);
            }
            object => {
                out.insert(name, object);
            }
        }
    }
    for (name, s) in resample(&series, length, to, interval, reducer)? {
        out.insert(name, ChannelData::Series(s));
    }
    Ok(out)
}
