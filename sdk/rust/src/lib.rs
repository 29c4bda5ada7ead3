//! Client SDK for the dashboard server HTTP API.

pub mod client;

pub use client::{ChannelEntry, DashboardClient, DataQuery, PublishReceipt};
