//! End-to-end tests through the service facade

use std::time::Duration;

use serde_json::json;

use super::*;
use crate::domain::spans::WireSpan;

fn cache() -> SpanCache {
    SpanCache::new(
        StoreLimits {
            ttl_ms: 600_000,
            max_spans: 1000,
            max_bytes: 50 * 1024 * 1024,
        },
        64,
        Duration::from_secs(5),
    )
}

fn batch(environment_id: &str, received_at: u64, spans: Vec<WireSpan>) -> SpanBatch {
    SpanBatch {
        environment_id: environment_id.to_string(),
        project_id: "proj-1".to_string(),
        organization_id: "org-1".to_string(),
        received_at,
        service_name: None,
        service_version: None,
        resource_attributes: serde_json::Map::new(),
        spans,
    }
}

fn span(trace_id: &str, span_id: &str, name: &str) -> WireSpan {
    WireSpan {
        trace_id: trace_id.to_string(),
        span_id: span_id.to_string(),
        name: name.to_string(),
        ..Default::default()
    }
}

fn now() -> u64 {
    crate::utils::time::now_millis()
}

#[tokio::test]
async fn test_upsert_then_exists() {
    let cache = cache();
    cache
        .upsert(batch("env-1", now(), vec![span("t1", "s1", "root")]))
        .await
        .unwrap();

    assert!(cache.exists("env-1", "t1".into(), "s1".into()).await.unwrap());
    assert!(!cache.exists("env-1", "t1".into(), "nope".into()).await.unwrap());
}

#[tokio::test]
async fn test_upsert_visible_to_immediate_search() {
    let cache = cache();
    let mut sp = span("t1", "s1", "chat completion");
    sp.attributes = [("gen_ai.request.model".to_string(), json!("gpt-4o"))]
        .into_iter()
        .collect();
    cache.upsert(batch("env-1", now(), vec![sp])).await.unwrap();

    let response = cache
        .search("env-1", SpanSearchInput::default())
        .await
        .unwrap();
    assert_eq!(response.total, 1);
    assert_eq!(response.spans[0].model.as_deref(), Some("gpt-4o"));
    assert!(!response.has_more);
}

#[tokio::test]
async fn test_environments_are_isolated() {
    let cache = cache();
    cache
        .upsert(batch("env-a", now(), vec![span("t1", "s1", "a")]))
        .await
        .unwrap();
    cache
        .upsert(batch("env-b", now(), vec![span("t2", "s2", "b")]))
        .await
        .unwrap();

    assert_eq!(cache.shard_count(), 2);
    assert!(cache.exists("env-a", "t1".into(), "s1".into()).await.unwrap());
    // env-b's shard never saw t1/s1
    assert!(!cache.exists("env-b", "t1".into(), "s1".into()).await.unwrap());
}

#[tokio::test]
async fn test_same_environment_reuses_shard() {
    let cache = cache();
    cache
        .upsert(batch("env-1", now(), vec![span("t1", "s1", "a")]))
        .await
        .unwrap();
    cache
        .upsert(batch("env-1", now(), vec![span("t1", "s2", "b")]))
        .await
        .unwrap();

    assert_eq!(cache.shard_count(), 1);
    let response = cache
        .search("env-1", SpanSearchInput::default())
        .await
        .unwrap();
    assert_eq!(response.total, 2);
}

#[tokio::test]
async fn test_trace_detail_through_facade() {
    let cache = cache();
    let mut root = span("t1", "s1", "root");
    root.start_time_unix_nano = Some("1000000000".to_string());
    root.end_time_unix_nano = Some("2000000000".to_string());
    let mut child = span("t1", "s2", "child");
    child.parent_span_id = Some("s1".to_string());
    cache
        .upsert(batch("env-1", now(), vec![root, child]))
        .await
        .unwrap();

    let detail = cache.trace_detail("env-1", "t1".to_string()).await.unwrap();
    assert_eq!(detail.spans.len(), 2);
    assert_eq!(detail.root_span_id.as_deref(), Some("s1"));
}

#[tokio::test]
async fn test_partial_merge_through_facade() {
    let cache = cache();
    let received = now();

    let mut pending = span("t1", "s1", "root");
    pending.start_time_unix_nano = Some("1000000000".to_string());
    cache
        .upsert(batch("env-1", received, vec![pending]))
        .await
        .unwrap();

    let mut finished = span("t1", "s1", "");
    finished.end_time_unix_nano = Some("2000000000".to_string());
    cache
        .upsert(batch("env-1", received + 10, vec![finished]))
        .await
        .unwrap();

    let detail = cache.trace_detail("env-1", "t1".to_string()).await.unwrap();
    assert_eq!(detail.spans.len(), 1);
    assert_eq!(detail.spans[0].duration_ms, Some(1000));
    assert_eq!(detail.spans[0].name, "root");
}

#[tokio::test]
async fn test_resolve_fails_for_empty_environment() {
    let cache = cache();
    let err = cache
        .search("", SpanSearchInput::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CacheError::ShardResolve(_)));
}

#[tokio::test]
async fn test_all_operations_fail_after_shutdown() {
    let cache = cache();
    cache
        .upsert(batch("env-1", now(), vec![span("t1", "s1", "a")]))
        .await
        .unwrap();

    cache.shutdown();

    let err = cache
        .upsert(batch("env-1", now(), vec![span("t1", "s2", "b")]))
        .await
        .unwrap_err();
    assert!(matches!(err, CacheError::ShardResolve(_)));

    let err = cache
        .search("env-1", SpanSearchInput::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CacheError::ShardResolve(_)));

    let err = cache
        .trace_detail("env-1", "t1".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, CacheError::ShardResolve(_)));

    let err = cache
        .exists("env-1", "t1".to_string(), "s1".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, CacheError::ShardResolve(_)));
}

#[tokio::test]
async fn test_timeout_error_is_distinguishable() {
    // A zero deadline forces the timeout class without a slow shard
    let cache = SpanCache::new(
        StoreLimits {
            ttl_ms: 600_000,
            max_spans: 1000,
            max_bytes: 50 * 1024 * 1024,
        },
        64,
        Duration::ZERO,
    );

    let err = cache
        .search("env-1", SpanSearchInput::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CacheError::Timeout(_)));
}
