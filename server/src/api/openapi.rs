//! OpenAPI specification

use axum::Json;
use axum::response::IntoResponse;
use utoipa::OpenApi;

use crate::api::routes::{cache, health};
use crate::data::cache::{
    AttributeFilter, FilterOp, SortBy, SortOrder, SpanDetail, SpanSearchInput, SpanSearchResponse,
    SpanSearchResult, TraceDetail,
};
use crate::domain::spans::{SpanBatch, SpanStatus, WireSpan};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Hotspan API",
        version = env!("CARGO_PKG_VERSION"),
        description = "Realtime span cache service"
    ),
    tags(
        (name = "health", description = "Health check endpoint"),
        (name = "span-cache", description = "Per-environment realtime span cache")
    ),
    paths(
        health::health,
        cache::upsert_spans,
        cache::search_spans,
        cache::get_trace_detail,
        cache::span_exists,
    ),
    components(schemas(
        SpanBatch,
        WireSpan,
        SpanStatus,
        SpanSearchInput,
        AttributeFilter,
        FilterOp,
        SortBy,
        SortOrder,
        SpanSearchResponse,
        SpanSearchResult,
        SpanDetail,
        TraceDetail,
    ))
)]
pub struct ApiDoc;

/// Serve the OpenAPI document as JSON
pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
