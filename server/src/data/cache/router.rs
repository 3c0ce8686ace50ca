//! Environment-to-shard registry.

use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;

use super::error::CacheError;
use super::shard::{ShardHandle, SpanShard};
use super::store::StoreLimits;

/// Resolves an environment id to its shard, spawning the shard on first
/// use. Shards are never persisted: after `shutdown` (or a process
/// restart) the next resolve would start from an empty store, which is
/// acceptable because the cache is a best-effort read accelerator.
pub struct ShardRouter {
    shards: DashMap<String, ShardHandle>,
    limits: StoreLimits,
    mailbox_capacity: usize,
    closed: AtomicBool,
}

impl ShardRouter {
    pub fn new(limits: StoreLimits, mailbox_capacity: usize) -> Self {
        Self {
            shards: DashMap::new(),
            limits,
            mailbox_capacity,
            closed: AtomicBool::new(false),
        }
    }

    /// Address the shard owning `environment_id`.
    pub fn resolve(&self, environment_id: &str) -> Result<ShardHandle, CacheError> {
        if environment_id.is_empty() || self.closed.load(Ordering::Acquire) {
            return Err(CacheError::ShardResolve(environment_id.to_string()));
        }
        let handle = self
            .shards
            .entry(environment_id.to_string())
            .or_insert_with(|| {
                tracing::debug!(environment_id, "Spawning span cache shard");
                SpanShard::spawn(
                    environment_id.to_string(),
                    self.limits,
                    self.mailbox_capacity,
                )
            })
            .clone();
        Ok(handle)
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Close the registry. Every subsequent resolve fails; dropping the
    /// handles lets the shard tasks drain their mailboxes and exit.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
        let dropped = self.shards.len();
        self.shards.clear();
        tracing::debug!(shards = dropped, "Span cache router shut down");
    }
}
