//! Live value cache.
//!
//! Holds the most recently published value of every channel. One writer path
//! (publish) and one reader path (data queries); each entry is replaced as a
//! whole so readers never see a timestamp from one publish with the payload of
//! another.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::broadcast;

use crate::observability::metrics;

/// Latest published value of a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Publish time, seconds since epoch.
    pub timestamp: f64,
    pub data: Value,
}

/// Change notification sent to live subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishEvent {
    pub channel: String,
    pub timestamp: f64,
    pub data: Value,
}

/// Current time in epoch seconds.
pub fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// Shared, last-write-wins store of live channel values.
#[derive(Clone)]
pub struct LiveCache {
    inner: Arc<DashMap<String, CacheEntry>>,
    feed: broadcast::Sender<PublishEvent>,
    persistence_path: Option<String>,
}

impl Default for LiveCache {
    fn default() -> Self {
        Self::new(1024, None)
    }
}

impl LiveCache {
    /// Create an empty cache with a change feed of `feed_capacity` events.
    pub fn new(feed_capacity: usize, persistence_path: Option<String>) -> Self {
        let (feed, _) = broadcast::channel(feed_capacity.max(1));
        Self {
            inner: Arc::new(DashMap::new()),
            feed,
            persistence_path,
        }
    }

    /// Store a value and notify subscribers.
    pub fn publish(&self, channel: &str, timestamp: f64, data: Value) {
        self.inner.insert(
            channel.to_string(),
            CacheEntry {
                timestamp,
                data: data.clone(),
            },
        );
        metrics::record_publish();
        metrics::record_live_channels(self.inner.len());

        // No subscribers is not an error
        let _ = self.feed.send(PublishEvent {
            channel: channel.to_string(),
            timestamp,
            data,
        });
    }

    /// Store a value stamped with the current time. Returns the timestamp.
    pub fn publish_now(&self, channel: &str, data: Value) -> f64 {
        let timestamp = now_secs();
        self.publish(channel, timestamp, data);
        timestamp
    }

    pub fn get(&self, channel: &str) -> Option<CacheEntry> {
        self.inner.get(channel).map(|r| r.value().clone())
    }

    /// Drop a channel. Returns whether it was present.
    pub fn remove(&self, channel: &str) -> bool {
        let removed = self.inner.remove(channel).is_some();
        metrics::record_live_channels(self.inner.len());
        removed
    }

    /// Consistent copy of every entry, ordered by channel name.
    pub fn snapshot(&self) -> BTreeMap<String, CacheEntry> {
        self.inner
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Receive every future publish.
    pub fn subscribe(&self) -> broadcast::Receiver<PublishEvent> {
        self.feed.subscribe()
    }

    /// Restore entries from the persistence file, if configured and present.
    pub fn load(&self) -> std::io::Result<usize> {
        let Some(path) = &self.persistence_path else {
            return Ok(0);
        };
        if !Path::new(path).exists() {
            return Ok(0);
        }
        let reader = BufReader::new(File::open(path)?);
        let map: HashMap<String, CacheEntry> = serde_json::from_reader(reader)?;
        let count = map.len();
        for (channel, entry) in map {
            self.inner.insert(channel, entry);
        }
        metrics::record_live_channels(self.inner.len());
        tracing::info!(path = %path, channels = count, "Live cache restored");
        Ok(count)
    }

    /// Write all entries to the persistence file, if configured.
    pub fn save(&self) -> std::io::Result<()> {
        if let Some(path) = &self.persistence_path {
            let writer = BufWriter::new(File::create(path)?);
            let snapshot = self.snapshot();
            serde_json::to_writer(writer, &snapshot)?;
            tracing::info!(path = %path, channels = snapshot.len(), "Live cache saved");
        }
        Ok(())
    }
}
