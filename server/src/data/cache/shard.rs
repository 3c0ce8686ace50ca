//! Per-environment shard actor.
//!
//! Each environment's store is owned by exactly one tokio task that
//! drains a mailbox one command at a time. That serialization is the
//! whole concurrency story: an upsert batch is atomic with respect to
//! reads because nothing else can touch the store mid-batch. Different
//! environments' shards run fully independently.

use tokio::sync::{mpsc, oneshot};

use crate::domain::spans::SpanBatch;
use crate::utils::time::now_millis;

use super::store::{SpanStore, StoreLimits};
use super::types::{SpanSearchInput, SpanSearchResponse, TraceDetail};

/// The envelope sent to a shard's mailbox: one variant per operation,
/// each carrying the oneshot sender for its reply.
pub enum ShardCommand {
    Upsert {
        batch: SpanBatch,
        reply: oneshot::Sender<ShardReply>,
    },
    Search {
        input: SpanSearchInput,
        reply: oneshot::Sender<ShardReply>,
    },
    TraceDetail {
        trace_id: String,
        reply: oneshot::Sender<ShardReply>,
    },
    Exists {
        trace_id: String,
        span_id: String,
        reply: oneshot::Sender<ShardReply>,
    },
}

pub enum ShardReply {
    Applied,
    Search(SpanSearchResponse),
    Trace(TraceDetail),
    Exists(bool),
}

impl ShardReply {
    /// Variant name for decode-failure diagnostics.
    pub fn variant_name(&self) -> &'static str {
        match self {
            ShardReply::Applied => "applied",
            ShardReply::Search(_) => "search",
            ShardReply::Trace(_) => "trace",
            ShardReply::Exists(_) => "exists",
        }
    }
}

/// Cloneable address of one shard's mailbox.
#[derive(Clone)]
pub struct ShardHandle {
    tx: mpsc::Sender<ShardCommand>,
}

impl ShardHandle {
    pub async fn send(&self, command: ShardCommand) -> Result<(), ShardSendError> {
        self.tx.send(command).await.map_err(|_| ShardSendError)
    }
}

/// The shard's mailbox has closed (actor gone).
#[derive(Debug, Clone, Copy)]
pub struct ShardSendError;

pub struct SpanShard {
    environment_id: String,
    store: SpanStore,
    rx: mpsc::Receiver<ShardCommand>,
}

impl SpanShard {
    /// Spawn the actor task for one environment and return its address.
    pub fn spawn(environment_id: String, limits: StoreLimits, mailbox_capacity: usize) -> ShardHandle {
        let (tx, rx) = mpsc::channel(mailbox_capacity);
        let shard = SpanShard {
            environment_id,
            store: SpanStore::new(limits),
            rx,
        };
        tokio::spawn(shard.run());
        ShardHandle { tx }
    }

    /// Drain the mailbox until every handle is dropped. Cached state dies
    /// with the task; the durable tier is authoritative.
    async fn run(mut self) {
        tracing::debug!(environment_id = %self.environment_id, "Span cache shard started");
        while let Some(command) = self.rx.recv().await {
            self.handle(command);
        }
        tracing::debug!(
            environment_id = %self.environment_id,
            spans = self.store.len(),
            "Span cache shard stopped"
        );
    }

    fn handle(&mut self, command: ShardCommand) {
        let now_ms = now_millis();
        match command {
            ShardCommand::Upsert { batch, reply } => {
                let span_count = batch.spans.len();
                let outcome = self.store.upsert_batch(&batch, now_ms);
                tracing::debug!(
                    environment_id = %self.environment_id,
                    spans = span_count,
                    expired = outcome.expired,
                    evicted = outcome.evicted,
                    cached = self.store.len(),
                    cached_bytes = self.store.total_bytes(),
                    "Applied span batch"
                );
                let _ = reply.send(ShardReply::Applied);
            }
            ShardCommand::Search { input, reply } => {
                let response = self.store.search(&input, now_ms);
                let _ = reply.send(ShardReply::Search(response));
            }
            ShardCommand::TraceDetail { trace_id, reply } => {
                let detail = self.store.trace_detail(&trace_id, now_ms);
                let _ = reply.send(ShardReply::Trace(detail));
            }
            ShardCommand::Exists {
                trace_id,
                span_id,
                reply,
            } => {
                let found = self.store.exists(&trace_id, &span_id, now_ms);
                let _ = reply.send(ShardReply::Exists(found));
            }
        }
    }
}
