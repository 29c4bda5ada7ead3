//! Data source plugin contract.

use async_trait::async_trait;
use thiserror::Error;

use crate::timeseries::types::{ChannelInfo, DataFrame};

/// Failure inside a data source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The configured parameters could not be interpreted.
    #[error("data source '{source_name}': invalid params: {reason}")]
    InvalidParams { source_name: String, reason: String },

    /// The backend could not answer.
    #[error("data source '{source_name}' unavailable: {reason}")]
    Unavailable { source_name: String, reason: String },
}

impl SourceError {
    pub fn invalid(source_name: &str, reason: impl Into<String>) -> Self {
        SourceError::InvalidParams {
            source_name: source_name.to_string(),
            reason: reason.into(),
        }
    }
}

/// A backend of historical channel data.
///
/// `length` and `to` describe the window `[to - length, to]` in epoch
/// seconds; `to` is already absolute. Samples are returned raw, resampling
/// happens in the query path.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Instance name from configuration.
    fn name(&self) -> &str;

    async fn get_channels(&self) -> Result<Vec<ChannelInfo>, SourceError>;

    /// Numeric channels among `channels`; unknown names are omitted.
    async fn get_timeseries(
        &self,
        channels: &[String],
        length: f64,
        to: f64,
    ) -> Result<DataFrame, SourceError>;

    /// Object channels among `channels`, latest record in the window.
    async fn get_object(
        &self,
        channels: &[String],
        length: f64,
        to: f64,
    ) -> Result<DataFrame, SourceError>;

    /// Called once before the server accepts requests.
    async fn open(&self) -> Result<(), SourceError> {
        Ok(())
    }

    /// Called once after the server stops accepting requests.
    async fn close(&self) -> Result<(), SourceError> {
        Ok(())
    }
}
