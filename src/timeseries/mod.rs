//! Time-series model and resampling.
//!
//! # Data Flow
//! ```text
//! DataSource (raw, irregular samples per channel)
//!     → types.rs (TimeSeries / ObjectRecord keyed by channel)
//!     → resample.rs (shared grid, per-bucket reduction)
//!     → aligned series, one time axis for every channel
//! ```

pub mod resample;
pub mod types;

pub use resample::{auto_interval, resample, resample_frame, Grid, Reducer, ResampleError};
pub use types::{ChannelData, ChannelInfo, ChannelType, DataFrame, ObjectRecord, TimeSeries};
