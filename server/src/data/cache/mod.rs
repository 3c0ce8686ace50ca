//! Realtime span cache
//!
//! An in-memory, TTL- and capacity-bounded cache of telemetry spans,
//! sharded by environment. Sits in front of the durable analytics tier
//! as a read accelerator for the realtime UI; it is best-effort by
//! design and may drop or lose spans at any time.
//!
//! - `store` - Per-shard record map: merge-on-write, TTL, eviction
//! - `query` - Attribute-filtered search and trace reconstruction
//! - `shard` - One single-threaded actor per environment
//! - `router` - Environment id to shard registry
//! - `service` - Client facade with timeout and the error taxonomy
//! - `error` - The four failure classes, kept distinct for retry policy

mod error;
mod query;
mod router;
mod service;
mod shard;
mod store;
mod types;

pub use error::CacheError;
pub use service::SpanCache;
pub use store::StoreLimits;
pub use types::{
    AttributeFilter, FilterOp, SortBy, SortOrder, SpanDetail, SpanSearchInput, SpanSearchResponse,
    SpanSearchResult, TraceDetail,
};
