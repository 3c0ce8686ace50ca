use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::data::cache::StoreLimits;

use super::cli::Cli;
use super::constants::{
    DEFAULT_CACHE_MAX_BYTES, DEFAULT_CACHE_MAX_SPANS, DEFAULT_CACHE_REQUEST_TIMEOUT_MS,
    DEFAULT_CACHE_TTL_SECS, DEFAULT_HOST, DEFAULT_PORT, SHARD_MAILBOX_CAPACITY,
};

// =============================================================================
// Server
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

// =============================================================================
// Span cache
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// When false the cache subsystem is not constructed at all and every
    /// cache endpoint reports "not initialized".
    pub enabled: bool,
    pub ttl_secs: u64,
    pub max_spans: usize,
    pub max_bytes: u64,
    pub request_timeout_ms: u64,
    pub mailbox_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: DEFAULT_CACHE_TTL_SECS,
            max_spans: DEFAULT_CACHE_MAX_SPANS,
            max_bytes: DEFAULT_CACHE_MAX_BYTES,
            request_timeout_ms: DEFAULT_CACHE_REQUEST_TIMEOUT_MS,
            mailbox_capacity: SHARD_MAILBOX_CAPACITY,
        }
    }
}

impl CacheConfig {
    pub fn limits(&self) -> StoreLimits {
        StoreLimits {
            ttl_ms: self.ttl_secs.saturating_mul(1_000),
            max_spans: self.max_spans,
            max_bytes: self.max_bytes,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

// =============================================================================
// Application
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub cache: CacheConfig,
}

impl AppConfig {
    /// Build the effective configuration: CLI flags (clap also resolves
    /// the HOTSPAN_* env vars) over built-in defaults.
    pub fn load(cli: &Cli) -> Self {
        let mut config = Self::default();

        if let Some(host) = &cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }
        if let Some(enabled) = cli.cache_enabled {
            config.cache.enabled = enabled;
        }
        if let Some(ttl) = cli.cache_ttl_secs {
            config.cache.ttl_secs = ttl;
        }
        if let Some(max_spans) = cli.cache_max_spans {
            config.cache.max_spans = max_spans;
        }
        if let Some(max_bytes) = cli.cache_max_bytes {
            config.cache.max_bytes = max_bytes;
        }
        if let Some(timeout) = cli.cache_request_timeout_ms {
            config.cache.request_timeout_ms = timeout;
        }

        config
    }
}
