//! Span cache service facade.
//!
//! The one client surface for the four cache operations. Every call
//! resolves the target shard, sends an envelope with a bounded deadline,
//! and decodes the reply — each step failing with its own `CacheError`
//! class so callers can tell "shard unreachable" from "shard answered
//! garbage". No retries here: the ingestion pipeline owns redelivery.

use std::time::Duration;

use tokio::sync::oneshot;

use crate::domain::spans::SpanBatch;

use super::error::CacheError;
use super::router::ShardRouter;
use super::shard::{ShardCommand, ShardReply};
use super::store::StoreLimits;
use super::types::{SpanSearchInput, SpanSearchResponse, TraceDetail};

pub struct SpanCache {
    router: ShardRouter,
    request_timeout: Duration,
}

impl SpanCache {
    pub fn new(limits: StoreLimits, mailbox_capacity: usize, request_timeout: Duration) -> Self {
        Self {
            router: ShardRouter::new(limits, mailbox_capacity),
            request_timeout,
        }
    }

    /// Merge a span batch into the owning environment's shard.
    /// Success carries no payload; the batch is applied.
    pub async fn upsert(&self, batch: SpanBatch) -> Result<(), CacheError> {
        let environment_id = batch.environment_id.clone();
        let reply = self
            .call(&environment_id, |reply| ShardCommand::Upsert { batch, reply })
            .await?;
        match reply {
            ShardReply::Applied => Ok(()),
            other => Err(unexpected_reply("applied", &other)),
        }
    }

    pub async fn search(
        &self,
        environment_id: &str,
        input: SpanSearchInput,
    ) -> Result<SpanSearchResponse, CacheError> {
        let reply = self
            .call(environment_id, |reply| ShardCommand::Search { input, reply })
            .await?;
        match reply {
            ShardReply::Search(response) => Ok(response),
            other => Err(unexpected_reply("search", &other)),
        }
    }

    pub async fn trace_detail(
        &self,
        environment_id: &str,
        trace_id: String,
    ) -> Result<TraceDetail, CacheError> {
        let reply = self
            .call(environment_id, |reply| ShardCommand::TraceDetail {
                trace_id,
                reply,
            })
            .await?;
        match reply {
            ShardReply::Trace(detail) => Ok(detail),
            other => Err(unexpected_reply("trace", &other)),
        }
    }

    pub async fn exists(
        &self,
        environment_id: &str,
        trace_id: String,
        span_id: String,
    ) -> Result<bool, CacheError> {
        let reply = self
            .call(environment_id, |reply| ShardCommand::Exists {
                trace_id,
                span_id,
                reply,
            })
            .await?;
        match reply {
            ShardReply::Exists(found) => Ok(found),
            other => Err(unexpected_reply("exists", &other)),
        }
    }

    pub fn shard_count(&self) -> usize {
        self.router.shard_count()
    }

    pub fn shutdown(&self) {
        self.router.shutdown();
    }

    /// One request/response exchange with a shard under the configured
    /// deadline. Resolve, send, and await are each mapped to their own
    /// failure class.
    async fn call(
        &self,
        environment_id: &str,
        make_command: impl FnOnce(oneshot::Sender<ShardReply>) -> ShardCommand,
    ) -> Result<ShardReply, CacheError> {
        let handle = self.router.resolve(environment_id)?;
        let (reply_tx, reply_rx) = oneshot::channel();
        let command = make_command(reply_tx);

        let exchange = async {
            handle
                .send(command)
                .await
                .map_err(|_| CacheError::Request("shard mailbox closed".to_string()))?;
            reply_rx
                .await
                .map_err(|_| CacheError::Request("shard dropped the reply".to_string()))
        };

        match tokio::time::timeout(self.request_timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout(self.request_timeout)),
        }
    }
}

fn unexpected_reply(expected: &str, got: &ShardReply) -> CacheError {
    CacheError::Decode(format!(
        "expected '{expected}' reply, got '{}'",
        got.variant_name()
    ))
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
