//! Application-wide constants

// =============================================================================
// Application
// =============================================================================

/// Application display name
pub const APP_NAME: &str = "Hotspan";

/// Application name, lowercase (logging filter, CLI name)
pub const APP_NAME_LOWER: &str = "hotspan";

// =============================================================================
// Environment variables
// =============================================================================

/// Server host address
pub const ENV_HOST: &str = "HOTSPAN_HOST";

/// Server port
pub const ENV_PORT: &str = "HOTSPAN_PORT";

/// Log filter (falls back to RUST_LOG)
pub const ENV_LOG: &str = "HOTSPAN_LOG";

/// Enable/disable the span cache subsystem
pub const ENV_CACHE_ENABLED: &str = "HOTSPAN_CACHE_ENABLED";

/// Cache record TTL in seconds
pub const ENV_CACHE_TTL_SECS: &str = "HOTSPAN_CACHE_TTL_SECS";

/// Maximum cached spans per environment shard
pub const ENV_CACHE_MAX_SPANS: &str = "HOTSPAN_CACHE_MAX_SPANS";

/// Maximum cached bytes per environment shard
pub const ENV_CACHE_MAX_BYTES: &str = "HOTSPAN_CACHE_MAX_BYTES";

/// Shard request deadline in milliseconds
pub const ENV_CACHE_REQUEST_TIMEOUT_MS: &str = "HOTSPAN_CACHE_REQUEST_TIMEOUT_MS";

// =============================================================================
// Server defaults
// =============================================================================

pub const DEFAULT_HOST: &str = "127.0.0.1";

pub const DEFAULT_PORT: u16 = 5399;

/// Request body limit for JSON API endpoints
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Request body limit for span ingestion (batches can be large)
pub const UPSERT_BODY_LIMIT: usize = 16 * 1024 * 1024;

/// Grace period for background tasks on shutdown
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// Span cache defaults
// =============================================================================

/// Record TTL. Refreshed on every upsert of the same key.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Per-shard span count cap
pub const DEFAULT_CACHE_MAX_SPANS: usize = 10_000;

/// Per-shard byte cap (estimated serialized sizes)
pub const DEFAULT_CACHE_MAX_BYTES: u64 = 50 * 1024 * 1024;

/// Shard request deadline
pub const DEFAULT_CACHE_REQUEST_TIMEOUT_MS: u64 = 5_000;

/// Shard mailbox capacity; sends block (backpressure) when full
pub const SHARD_MAILBOX_CAPACITY: usize = 256;
