//! Hotspan: realtime span cache service
//!
//! A single-tenant-per-key, in-memory, TTL- and capacity-bounded cache
//! of telemetry spans, sharded by environment and exposed through a
//! small RPC-style HTTP interface. Sits in front of the durable
//! analytics tier as a best-effort read accelerator.

pub mod api;
pub mod app;
pub mod core;
pub mod data;
pub mod domain;
pub mod utils;
