//! Span cache API endpoints
//!
//! The four cache operations, each scoped to one environment's shard by
//! the `environment_id` path parameter. Upsert is fire-and-forget for
//! the caller: success is 204 with no body. Authentication happens
//! upstream; these endpoints are not exposed publicly.

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::types::{ApiError, validate_id};
use crate::core::constants::UPSERT_BODY_LIMIT;
use crate::data::cache::{CacheError, SpanCache, SpanSearchInput, SpanSearchResponse, TraceDetail};
use crate::domain::spans::SpanBatch;
use crate::utils::time::parse_unix_nanos;

/// Shared state for cache API endpoints.
///
/// `cache` is `None` when the subsystem is disabled by config; every
/// endpoint then answers with the not-initialized error instead of
/// touching a shard. This replaces any notion of a process-global
/// "current cache" — the dependency is injected here once at startup.
#[derive(Clone)]
pub struct CacheApiState {
    cache: Option<Arc<SpanCache>>,
}

impl CacheApiState {
    fn cache(&self) -> Result<&Arc<SpanCache>, ApiError> {
        self.cache
            .as_ref()
            .ok_or_else(|| ApiError::from_cache(CacheError::NotInitialized))
    }
}

/// Build span cache routes
pub fn routes(cache: Option<Arc<SpanCache>>) -> Router<()> {
    let state = CacheApiState { cache };

    Router::new()
        .route(
            "/environments/{environment_id}/spans",
            post(upsert_spans).layer(DefaultBodyLimit::max(UPSERT_BODY_LIMIT)),
        )
        .route(
            "/environments/{environment_id}/spans/search",
            post(search_spans),
        )
        .route(
            "/environments/{environment_id}/traces/{trace_id}",
            get(get_trace_detail),
        )
        .route(
            "/environments/{environment_id}/traces/{trace_id}/spans/{span_id}",
            get(span_exists),
        )
        .with_state(state)
}

/// Merge a span batch into the environment's cache shard
#[utoipa::path(
    post,
    path = "/api/v1/environments/{environment_id}/spans",
    tag = "span-cache",
    params(
        ("environment_id" = String, Path, description = "Environment ID owning the shard")
    ),
    request_body = SpanBatch,
    responses(
        (status = 204, description = "Batch applied"),
        (status = 400, description = "Malformed batch"),
        (status = 502, description = "Shard exchange failed"),
        (status = 503, description = "Cache not initialized or shard unreachable"),
        (status = 504, description = "Shard request timed out")
    )
)]
pub async fn upsert_spans(
    State(state): State<CacheApiState>,
    Path(environment_id): Path<String>,
    Json(batch): Json<SpanBatch>,
) -> Result<StatusCode, ApiError> {
    validate_id(&environment_id, "environmentId")?;
    if batch.environment_id != environment_id {
        return Err(ApiError::bad_request(
            "ENVIRONMENT_MISMATCH",
            format!(
                "Batch environment '{}' does not match path environment '{}'",
                batch.environment_id, environment_id
            ),
        ));
    }

    state
        .cache()?
        .upsert(batch)
        .await
        .map_err(ApiError::from_cache)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Search cached spans in one environment
#[utoipa::path(
    post,
    path = "/api/v1/environments/{environment_id}/spans/search",
    tag = "span-cache",
    params(
        ("environment_id" = String, Path, description = "Environment ID owning the shard")
    ),
    request_body = SpanSearchInput,
    responses(
        (status = 200, description = "Matching spans", body = SpanSearchResponse),
        (status = 400, description = "Invalid search criteria"),
        (status = 502, description = "Shard exchange failed"),
        (status = 503, description = "Cache not initialized or shard unreachable"),
        (status = 504, description = "Shard request timed out")
    )
)]
pub async fn search_spans(
    State(state): State<CacheApiState>,
    Path(environment_id): Path<String>,
    Json(input): Json<SpanSearchInput>,
) -> Result<Json<SpanSearchResponse>, ApiError> {
    validate_id(&environment_id, "environmentId")?;
    validate_nanos_param(input.start_time_from.as_deref(), "startTimeFrom")?;
    validate_nanos_param(input.start_time_to.as_deref(), "startTimeTo")?;

    let response = state
        .cache()?
        .search(&environment_id, input)
        .await
        .map_err(ApiError::from_cache)?;
    Ok(Json(response))
}

/// Reconstruct one trace from the environment's cache shard
#[utoipa::path(
    get,
    path = "/api/v1/environments/{environment_id}/traces/{trace_id}",
    tag = "span-cache",
    params(
        ("environment_id" = String, Path, description = "Environment ID owning the shard"),
        ("trace_id" = String, Path, description = "Trace ID")
    ),
    responses(
        (status = 200, description = "Trace detail", body = TraceDetail),
        (status = 502, description = "Shard exchange failed"),
        (status = 503, description = "Cache not initialized or shard unreachable"),
        (status = 504, description = "Shard request timed out")
    )
)]
pub async fn get_trace_detail(
    State(state): State<CacheApiState>,
    Path((environment_id, trace_id)): Path<(String, String)>,
) -> Result<Json<TraceDetail>, ApiError> {
    validate_id(&environment_id, "environmentId")?;
    validate_id(&trace_id, "traceId")?;

    let detail = state
        .cache()?
        .trace_detail(&environment_id, trace_id)
        .await
        .map_err(ApiError::from_cache)?;
    Ok(Json(detail))
}

/// Check whether one span key is cached (and not expired)
#[utoipa::path(
    get,
    path = "/api/v1/environments/{environment_id}/traces/{trace_id}/spans/{span_id}",
    tag = "span-cache",
    params(
        ("environment_id" = String, Path, description = "Environment ID owning the shard"),
        ("trace_id" = String, Path, description = "Trace ID"),
        ("span_id" = String, Path, description = "Span ID")
    ),
    responses(
        (status = 200, description = "Whether the span is cached", body = bool),
        (status = 502, description = "Shard exchange failed"),
        (status = 503, description = "Cache not initialized or shard unreachable"),
        (status = 504, description = "Shard request timed out")
    )
)]
pub async fn span_exists(
    State(state): State<CacheApiState>,
    Path((environment_id, trace_id, span_id)): Path<(String, String, String)>,
) -> Result<Json<bool>, ApiError> {
    validate_id(&environment_id, "environmentId")?;
    validate_id(&trace_id, "traceId")?;
    validate_id(&span_id, "spanId")?;

    let found = state
        .cache()?
        .exists(&environment_id, trace_id, span_id)
        .await
        .map_err(ApiError::from_cache)?;
    Ok(Json(found))
}

/// Reject a supplied time bound that does not parse as decimal
/// nanoseconds; a silent no-bound would widen the search unnoticed.
fn validate_nanos_param(value: Option<&str>, field: &str) -> Result<(), ApiError> {
    match value {
        Some(v) if parse_unix_nanos(v).is_none() => Err(ApiError::bad_request(
            "INVALID_TIMESTAMP",
            format!("'{field}' is not a decimal nanosecond timestamp: {v}"),
        )),
        _ => Ok(()),
    }
}
