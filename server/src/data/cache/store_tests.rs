//! Tests for the span store: merge, expiry, and eviction

use serde_json::json;

use super::*;
use crate::domain::spans::{SpanStatus, duration_ms};

fn limits() -> StoreLimits {
    StoreLimits {
        ttl_ms: 60_000,
        max_spans: 100,
        max_bytes: 10 * 1024 * 1024,
    }
}

fn make_batch(received_at: u64, spans: Vec<WireSpan>) -> SpanBatch {
    SpanBatch {
        environment_id: "env-1".to_string(),
        project_id: "proj-1".to_string(),
        organization_id: "org-1".to_string(),
        received_at,
        service_name: None,
        service_version: None,
        resource_attributes: serde_json::Map::new(),
        spans,
    }
}

fn make_span(trace_id: &str, span_id: &str) -> WireSpan {
    WireSpan {
        trace_id: trace_id.to_string(),
        span_id: span_id.to_string(),
        name: "op".to_string(),
        ..Default::default()
    }
}

fn get<'a>(store: &'a SpanStore, trace_id: &str, span_id: &str) -> &'a SpanRecord {
    store
        .live_records(0)
        .find(|r| r.trace_id == trace_id && r.span_id == span_id)
        .unwrap()
}

// ============================================================================
// UPSERT / MERGE
// ============================================================================

#[test]
fn test_insert_then_lookup() {
    let mut store = SpanStore::new(limits());
    store.upsert_batch(&make_batch(1_000, vec![make_span("t1", "s1")]), 1_000);

    assert_eq!(store.len(), 1);
    assert!(store.exists("t1", "s1", 1_000));
    assert!(!store.exists("t1", "other", 1_000));
    assert!(store.total_bytes() > 0);
}

#[test]
fn test_span_without_key_is_dropped() {
    let mut store = SpanStore::new(limits());
    let mut keyless = make_span("", "s1");
    keyless.name = "orphan".to_string();
    store.upsert_batch(&make_batch(1_000, vec![keyless, make_span("t1", "s2")]), 1_000);

    assert_eq!(store.len(), 1);
}

#[test]
fn test_merge_pending_then_final() {
    // A span arrives pending (start only) and is completed by a later
    // end-only delivery for the same key.
    let mut store = SpanStore::new(limits());

    let mut first = make_span("t1", "s1");
    first.start_time_unix_nano = Some("1000000000".to_string());
    first.name = "root".to_string();
    store.upsert_batch(&make_batch(1_000, vec![first]), 1_000);

    let mut second = make_span("t1", "s1");
    second.name = String::new();
    second.end_time_unix_nano = Some("2000000000".to_string());
    store.upsert_batch(&make_batch(2_000, vec![second]), 2_000);

    assert_eq!(store.len(), 1);
    let record = get(&store, "t1", "s1");
    assert_eq!(record.start_time_unix_nano.as_deref(), Some("1000000000"));
    assert_eq!(record.end_time_unix_nano.as_deref(), Some("2000000000"));
    assert_eq!(record.name, "root");
    assert_eq!(duration_ms(record), Some(1000));
}

#[test]
fn test_merge_start_end_selection_commutes() {
    let mut start_only = make_span("t1", "s1");
    start_only.start_time_unix_nano = Some("1000000000".to_string());
    let mut end_only = make_span("t1", "s1");
    end_only.end_time_unix_nano = Some("3000000000".to_string());

    let mut forward = SpanStore::new(limits());
    forward.upsert_batch(&make_batch(1_000, vec![start_only.clone()]), 1_000);
    forward.upsert_batch(&make_batch(2_000, vec![end_only.clone()]), 2_000);

    let mut reverse = SpanStore::new(limits());
    reverse.upsert_batch(&make_batch(1_000, vec![end_only]), 1_000);
    reverse.upsert_batch(&make_batch(2_000, vec![start_only]), 2_000);

    let a = get(&forward, "t1", "s1");
    let b = get(&reverse, "t1", "s1");
    assert_eq!(a.start_time_unix_nano, b.start_time_unix_nano);
    assert_eq!(a.end_time_unix_nano, b.end_time_unix_nano);
}

#[test]
fn test_merge_keeps_earliest_start_and_latest_end() {
    let mut store = SpanStore::new(limits());

    let mut first = make_span("t1", "s1");
    first.start_time_unix_nano = Some("2000000000".to_string());
    first.end_time_unix_nano = Some("2500000000".to_string());
    store.upsert_batch(&make_batch(1_000, vec![first]), 1_000);

    // Corrected delivery: earlier start, later end
    let mut second = make_span("t1", "s1");
    second.start_time_unix_nano = Some("1000000000".to_string());
    second.end_time_unix_nano = Some("4000000000".to_string());
    store.upsert_batch(&make_batch(2_000, vec![second]), 2_000);

    let record = get(&store, "t1", "s1");
    assert_eq!(record.start_time_unix_nano.as_deref(), Some("1000000000"));
    assert_eq!(record.end_time_unix_nano.as_deref(), Some("4000000000"));

    // A worse delivery (later start, earlier end) must not regress either
    let mut third = make_span("t1", "s1");
    third.start_time_unix_nano = Some("3000000000".to_string());
    third.end_time_unix_nano = Some("3500000000".to_string());
    store.upsert_batch(&make_batch(3_000, vec![third]), 3_000);

    let record = get(&store, "t1", "s1");
    assert_eq!(record.start_time_unix_nano.as_deref(), Some("1000000000"));
    assert_eq!(record.end_time_unix_nano.as_deref(), Some("4000000000"));
}

#[test]
fn test_merge_attributes_replace_wholesale_only_when_non_empty() {
    let mut store = SpanStore::new(limits());

    let mut first = make_span("t1", "s1");
    first.attributes = [("gen_ai.request.model".to_string(), json!("gpt-4o"))]
        .into_iter()
        .collect();
    store.upsert_batch(&make_batch(1_000, vec![first]), 1_000);

    // Empty incoming bag must not null out what is there
    store.upsert_batch(&make_batch(2_000, vec![make_span("t1", "s1")]), 2_000);
    let record = get(&store, "t1", "s1");
    assert_eq!(record.attributes.len(), 1);

    // Non-empty incoming bag replaces wholesale, not per-key
    let mut third = make_span("t1", "s1");
    third.attributes = [("other.key".to_string(), json!(1))].into_iter().collect();
    store.upsert_batch(&make_batch(3_000, vec![third]), 3_000);
    let record = get(&store, "t1", "s1");
    assert_eq!(record.attributes.len(), 1);
    assert!(record.attributes.contains_key("other.key"));
}

#[test]
fn test_merge_scalars_overwrite_only_when_present() {
    let mut store = SpanStore::new(limits());

    let mut first = make_span("t1", "s1");
    first.kind = Some(2);
    first.status = Some(SpanStatus {
        code: 0,
        message: String::new(),
    });
    store.upsert_batch(&make_batch(1_000, vec![first]), 1_000);

    let mut second = make_span("t1", "s1");
    second.status = Some(SpanStatus {
        code: 2,
        message: "boom".to_string(),
    });
    store.upsert_batch(&make_batch(2_000, vec![second]), 2_000);

    let record = get(&store, "t1", "s1");
    assert_eq!(record.kind, Some(2));
    assert_eq!(record.status.as_ref().map(|s| s.code), Some(2));
}

#[test]
fn test_merge_bumps_expiry_forward() {
    let mut store = SpanStore::new(limits());
    store.upsert_batch(&make_batch(1_000, vec![make_span("t1", "s1")]), 1_000);
    let before = get(&store, "t1", "s1").expires_at;

    store.upsert_batch(&make_batch(50_000, vec![make_span("t1", "s1")]), 50_000);
    let after = get(&store, "t1", "s1").expires_at;

    assert!(after >= before);
    assert_eq!(after, 110_000);
}

#[test]
fn test_merge_expiry_never_decreases_on_stale_redelivery() {
    let mut store = SpanStore::new(limits());
    store.upsert_batch(&make_batch(50_000, vec![make_span("t1", "s1")]), 50_000);
    let before = get(&store, "t1", "s1").expires_at;

    // Redelivered batch with an older receive time
    store.upsert_batch(&make_batch(10_000, vec![make_span("t1", "s1")]), 50_000);
    let after = get(&store, "t1", "s1").expires_at;

    assert_eq!(after, before);
    assert_eq!(get(&store, "t1", "s1").received_at, 50_000);
}

#[test]
fn test_byte_accounting_tracks_merges() {
    let mut store = SpanStore::new(limits());

    let mut small = make_span("t1", "s1");
    small.attributes = [("k".to_string(), json!("v"))].into_iter().collect();
    store.upsert_batch(&make_batch(1_000, vec![small]), 1_000);
    let bytes_small = store.total_bytes();

    let mut big = make_span("t1", "s1");
    big.attributes = [("k".to_string(), json!("v".repeat(4096)))]
        .into_iter()
        .collect();
    store.upsert_batch(&make_batch(2_000, vec![big]), 2_000);
    let bytes_big = store.total_bytes();

    assert_eq!(store.len(), 1);
    assert!(bytes_big > bytes_small + 4000);
    assert_eq!(bytes_big, get(&store, "t1", "s1").size_bytes);
}

// ============================================================================
// EXPIRY / PRUNING
// ============================================================================

#[test]
fn test_exists_lazy_expiration() {
    let mut store = SpanStore::new(limits());
    store.upsert_batch(&make_batch(1_000, vec![make_span("t1", "s1")]), 1_000);

    // Past expires_at = 61_000, never pruned
    assert!(!store.exists("t1", "s1", 61_000));
    // Opportunistically deleted
    assert_eq!(store.len(), 0);
    assert_eq!(store.total_bytes(), 0);
}

#[test]
fn test_live_records_skips_expired() {
    let mut store = SpanStore::new(limits());
    store.upsert_batch(&make_batch(1_000, vec![make_span("t1", "s1")]), 1_000);
    store.upsert_batch(&make_batch(30_000, vec![make_span("t1", "s2")]), 30_000);

    // s1 expires at 61_000, s2 at 90_000
    let live: Vec<&str> = store
        .live_records(70_000)
        .map(|r| r.span_id.as_str())
        .collect();
    assert_eq!(live, vec!["s2"]);
}

#[test]
fn test_prune_removes_expired() {
    let mut store = SpanStore::new(limits());
    store.upsert_batch(&make_batch(1_000, vec![make_span("t1", "s1")]), 1_000);
    store.upsert_batch(&make_batch(30_000, vec![make_span("t1", "s2")]), 30_000);

    let outcome = store.prune_storage(70_000);
    assert_eq!(outcome, PruneOutcome { expired: 1, evicted: 0 });
    assert_eq!(store.len(), 1);
    assert!(store.live_records(70_000).all(|r| !r.is_expired(70_000)));
}

#[test]
fn test_prune_enforces_span_cap_oldest_first() {
    let mut store = SpanStore::new(StoreLimits {
        ttl_ms: 600_000,
        max_spans: 2,
        max_bytes: 10 * 1024 * 1024,
    });

    store.upsert_batch(&make_batch(1_000, vec![make_span("t1", "s1")]), 1_000);
    store.upsert_batch(&make_batch(2_000, vec![make_span("t1", "s2")]), 2_000);
    store.upsert_batch(&make_batch(3_000, vec![make_span("t1", "s3")]), 3_000);

    // Strictly the oldest-received record goes first
    assert_eq!(store.len(), 2);
    assert!(!store.exists("t1", "s1", 4_000));
    assert!(store.exists("t1", "s2", 4_000));
    assert!(store.exists("t1", "s3", 4_000));
}

#[test]
fn test_prune_eviction_tie_break_is_deterministic() {
    let mut store = SpanStore::new(StoreLimits {
        ttl_ms: 600_000,
        max_spans: 2,
        max_bytes: 10 * 1024 * 1024,
    });

    // All three share one receive time; lowest key must go first
    store.upsert_batch(
        &make_batch(
            1_000,
            vec![
                make_span("t1", "s-c"),
                make_span("t1", "s-a"),
                make_span("t1", "s-b"),
            ],
        ),
        1_000,
    );

    assert_eq!(store.len(), 2);
    assert!(!store.exists("t1", "s-a", 2_000));
    assert!(store.exists("t1", "s-b", 2_000));
    assert!(store.exists("t1", "s-c", 2_000));
}

#[test]
fn test_prune_enforces_byte_cap() {
    let mut store = SpanStore::new(StoreLimits {
        ttl_ms: 600_000,
        max_spans: 1000,
        max_bytes: 2_000,
    });

    for (i, received) in [(1, 1_000u64), (2, 2_000), (3, 3_000)] {
        let mut span = make_span("t1", &format!("s{i}"));
        span.attributes = [("payload".to_string(), json!("x".repeat(700)))]
            .into_iter()
            .collect();
        store.upsert_batch(&make_batch(received, vec![span]), received);
    }

    assert!(store.total_bytes() <= 2_000);
    // Each record is ~1kB, so only the two newest fit... the byte cap
    // evicted from the oldest end
    assert!(!store.exists("t1", "s1", 4_000));
}

#[test]
fn test_refreshed_span_survives_eviction_over_stale_one() {
    let mut store = SpanStore::new(StoreLimits {
        ttl_ms: 600_000,
        max_spans: 2,
        max_bytes: 10 * 1024 * 1024,
    });

    store.upsert_batch(&make_batch(1_000, vec![make_span("t1", "s1")]), 1_000);
    store.upsert_batch(&make_batch(2_000, vec![make_span("t1", "s2")]), 2_000);
    // Touch s1: its received_at moves to 3_000, making s2 the oldest
    store.upsert_batch(&make_batch(3_000, vec![make_span("t1", "s1")]), 3_000);
    store.upsert_batch(&make_batch(4_000, vec![make_span("t1", "s3")]), 4_000);

    assert!(store.exists("t1", "s1", 5_000));
    assert!(!store.exists("t1", "s2", 5_000));
    assert!(store.exists("t1", "s3", 5_000));
}
