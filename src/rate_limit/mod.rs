// Per-key token bucket rate limiting

mod bucket;
mod eviction;
mod service;
mod store;

pub use bucket::Bucket;
pub use eviction::{EvictionScheduler, sweep};
pub use service::{LimiterService, LimiterState};
pub use store::{BucketStore, SharedBucket};
