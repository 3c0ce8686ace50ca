//! In-memory span store with merge-on-write and TTL/capacity eviction.
//!
//! One store per environment, owned by that environment's shard actor.
//! All access is serialized by the actor, so the store itself is plain
//! single-threaded state with no locking.
//!
//! Expiration is lazy: every read treats a record past its `expires_at`
//! as absent, whether or not a sweep has physically removed it yet.

use rustc_hash::FxHashMap;
use serde_json::Value as JsonValue;

use crate::domain::spans::{SpanBatch, SpanKey, SpanRecord, WireSpan, build_record};
use crate::utils::time::parse_unix_nanos;

/// Capacity and TTL bounds for one shard.
#[derive(Debug, Clone, Copy)]
pub struct StoreLimits {
    pub ttl_ms: u64,
    pub max_spans: usize,
    pub max_bytes: u64,
}

/// Counts from one pruning sweep, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneOutcome {
    pub expired: usize,
    pub evicted: usize,
}

pub struct SpanStore {
    limits: StoreLimits,
    records: FxHashMap<SpanKey, SpanRecord>,
    total_bytes: u64,
}

impl SpanStore {
    pub fn new(limits: StoreLimits) -> Self {
        Self {
            limits,
            records: FxHashMap::default(),
            total_bytes: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Apply one ingestion batch: insert-or-merge every span, then sweep.
    ///
    /// The batch applies atomically with respect to reads (the owning
    /// actor serializes access). Spans without both ids cannot be keyed
    /// and are rejected with a warning; nothing else in the batch can
    /// fail, so there is no partial-loss path.
    pub fn upsert_batch(&mut self, batch: &SpanBatch, now_ms: u64) -> PruneOutcome {
        for span in &batch.spans {
            if span.trace_id.is_empty() || span.span_id.is_empty() {
                tracing::warn!(
                    environment_id = %batch.environment_id,
                    trace_id = %span.trace_id,
                    span_id = %span.span_id,
                    "Dropping span without a usable key"
                );
                continue;
            }
            self.apply_span(batch, span);
        }
        self.prune_storage(now_ms)
    }

    fn apply_span(&mut self, batch: &SpanBatch, span: &WireSpan) {
        use std::collections::hash_map::Entry;

        let key = SpanKey::new(span.trace_id.clone(), span.span_id.clone());
        match self.records.entry(key) {
            Entry::Occupied(mut occupied) => {
                let existing = occupied.get_mut();
                let old_size = existing.size_bytes;
                merge_record(existing, batch, span, self.limits.ttl_ms);
                let new_size = existing.size_bytes;
                self.total_bytes = self.total_bytes - old_size + new_size;
            }
            Entry::Vacant(vacant) => {
                let record = build_record(batch, span, self.limits.ttl_ms);
                self.total_bytes += record.size_bytes;
                vacant.insert(record);
            }
        }
    }

    /// Drop expired records, then evict oldest-received until both the
    /// span-count and byte caps hold.
    pub fn prune_storage(&mut self, now_ms: u64) -> PruneOutcome {
        let mut outcome = PruneOutcome::default();

        let expired: Vec<SpanKey> = self
            .records
            .iter()
            .filter(|(_, r)| r.is_expired(now_ms))
            .map(|(k, _)| k.clone())
            .collect();
        for key in expired {
            self.remove(&key);
            outcome.expired += 1;
        }

        if self.records.len() <= self.limits.max_spans && self.total_bytes <= self.limits.max_bytes
        {
            return outcome;
        }

        // Oldest received first; key as tie-break so eviction is
        // reproducible when receive times collide.
        let mut order: Vec<(u64, SpanKey)> = self
            .records
            .iter()
            .map(|(k, r)| (r.received_at, k.clone()))
            .collect();
        order.sort();

        for (_, key) in order {
            if self.records.len() <= self.limits.max_spans
                && self.total_bytes <= self.limits.max_bytes
            {
                break;
            }
            self.remove(&key);
            outcome.evicted += 1;
        }

        outcome
    }

    /// Key lookup with lazy expiry: an expired record answers false and
    /// is deleted opportunistically.
    pub fn exists(&mut self, trace_id: &str, span_id: &str, now_ms: u64) -> bool {
        let key = SpanKey::new(trace_id, span_id);
        let expired = match self.records.get(&key) {
            Some(record) => record.is_expired(now_ms),
            None => return false,
        };
        if expired {
            self.remove(&key);
            return false;
        }
        true
    }

    /// All records still alive at `now_ms`. Expired-but-unswept records
    /// are skipped, never returned.
    pub fn live_records(&self, now_ms: u64) -> impl Iterator<Item = &SpanRecord> {
        self.records.values().filter(move |r| !r.is_expired(now_ms))
    }

    fn remove(&mut self, key: &SpanKey) {
        if let Some(record) = self.records.remove(key) {
            self.total_bytes -= record.size_bytes;
        }
    }
}

// ============================================================================
// MERGE
// ============================================================================

/// Merge an incoming partial span into an existing record.
///
/// A span may first arrive pending (start, no end) and be finalized by a
/// later delivery, or the other way around. Field rules:
/// earliest-known start wins, latest-known end wins, present-and-non-empty
/// collections replace wholesale, non-null scalars overwrite, and the TTL
/// window only ever moves forward.
fn merge_record(existing: &mut SpanRecord, batch: &SpanBatch, incoming: &WireSpan, ttl_ms: u64) {
    existing.start_time_unix_nano = pick_nanos(
        existing.start_time_unix_nano.as_deref(),
        incoming.start_time_unix_nano.as_deref(),
        Extreme::Earlier,
    );
    existing.end_time_unix_nano = pick_nanos(
        existing.end_time_unix_nano.as_deref(),
        incoming.end_time_unix_nano.as_deref(),
        Extreme::Later,
    );

    if !incoming.name.is_empty() {
        existing.name = incoming.name.clone();
    }
    if let Some(parent) = &incoming.parent_span_id {
        existing.parent_span_id = Some(parent.clone());
    }
    if let Some(kind) = incoming.kind {
        existing.kind = Some(kind);
    }
    if let Some(status) = &incoming.status {
        existing.status = Some(status.clone());
    }

    if !incoming.attributes.is_empty() {
        existing.attributes = incoming.attributes.clone();
    }
    if json_non_empty(&incoming.events) {
        existing.events = incoming.events.clone();
    }
    if json_non_empty(&incoming.links) {
        existing.links = incoming.links.clone();
    }

    // Batch context of the latest delivery wins
    existing.environment_id = batch.environment_id.clone();
    existing.project_id = batch.project_id.clone();
    existing.organization_id = batch.organization_id.clone();
    if batch.service_name.is_some() {
        existing.service_name = batch.service_name.clone();
    }
    if batch.service_version.is_some() {
        existing.service_version = batch.service_version.clone();
    }
    if !batch.resource_attributes.is_empty() {
        existing.resource_attributes = batch.resource_attributes.clone();
    }

    // Refresh the TTL window; max() keeps expiry monotonic even when an
    // old batch is redelivered out of order.
    existing.received_at = existing.received_at.max(batch.received_at);
    existing.expires_at = existing
        .expires_at
        .max(batch.received_at.saturating_add(ttl_ms));

    existing.size_bytes = existing.estimate_size();
}

enum Extreme {
    Earlier,
    Later,
}

/// Choose between two raw nanosecond strings by parsed value. A side that
/// is missing or unparseable loses to one that parses; two unusable sides
/// keep the existing value.
fn pick_nanos(existing: Option<&str>, incoming: Option<&str>, extreme: Extreme) -> Option<String> {
    let parsed_existing = existing.and_then(parse_unix_nanos);
    let parsed_incoming = incoming.and_then(parse_unix_nanos);
    let chosen = match (parsed_existing, parsed_incoming) {
        (Some(e), Some(i)) => {
            let take_incoming = match extreme {
                Extreme::Earlier => i < e,
                Extreme::Later => i > e,
            };
            if take_incoming { incoming } else { existing }
        }
        (Some(_), None) => existing,
        (None, Some(_)) => incoming,
        (None, None) => existing.or(incoming),
    };
    chosen.map(String::from)
}

fn json_non_empty(value: &Option<JsonValue>) -> bool {
    match value {
        None | Some(JsonValue::Null) => false,
        Some(JsonValue::Array(a)) => !a.is_empty(),
        Some(JsonValue::Object(o)) => !o.is_empty(),
        Some(_) => true,
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
