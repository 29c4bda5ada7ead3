//! Live cache subsystem.
//!
//! # Data Flow
//! ```text
//! POST /api/publish/{ch} ──► LiveCache::publish ──► DashMap (ts, data)
//!                                    │
//!                                    └──► broadcast feed ──► /api/subscribe
//!
//! GET /api/data ──► sources ──► merge_data(snapshot) ──► resample ──► client
//! ```

pub mod live;
pub mod merge;

pub use live::{now_secs, CacheEntry, LiveCache, PublishEvent};
pub use merge::{infer_channel_type, merge_channel_list, merge_data, TIME_TOLERANCE};
