//! Search and trace-detail types.

use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};
use utoipa::ToSchema;

use crate::domain::spans::{LlmMetrics, SpanRecord, SpanStatus, duration_ms, start_nanos};

/// Operator for a generic attribute filter.
///
/// A missing attribute satisfies `neq` and fails the other three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    Eq,
    Neq,
    Contains,
    Exists,
}

/// One filter against the opaque attribute bag.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttributeFilter {
    pub key: String,
    pub op: FilterOp,
    #[serde(default)]
    pub value: Option<String>,
}

/// Sort key for search results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    StartTime,
    DurationMs,
    TotalTokens,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Search criteria. Every supplied criterion must match (logical AND);
/// an empty input matches every non-expired span in the shard.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct SpanSearchInput {
    /// Inclusive lower bound on the span start time, decimal nanoseconds.
    pub start_time_from: Option<String>,
    /// Inclusive upper bound on the span start time, decimal nanoseconds.
    pub start_time_to: Option<String>,
    pub trace_id: Option<String>,
    pub span_id: Option<String>,
    /// Free-text name query; all tokens must appear in the span name.
    pub query: Option<String>,
    /// Substring match against the `input.value` attribute.
    pub input_query: Option<String>,
    /// Substring match against the `output.value` attribute.
    pub output_query: Option<String>,
    pub models: Option<Vec<String>>,
    pub providers: Option<Vec<String>>,
    pub function_id: Option<String>,
    pub function_name: Option<String>,
    pub has_error: Option<bool>,
    pub min_total_tokens: Option<u64>,
    pub max_total_tokens: Option<u64>,
    pub min_duration_ms: Option<u64>,
    pub max_duration_ms: Option<u64>,
    pub attribute_filters: Vec<AttributeFilter>,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
}

/// Lightweight projection returned by search. Never the full record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpanSearchResult {
    pub trace_id: String,
    pub span_id: String,
    pub name: String,
    /// Derived start time, decimal nanoseconds.
    pub start_time_unix_nano: String,
    pub duration_ms: Option<u64>,
    pub model: Option<String>,
    pub provider: Option<String>,
    pub total_tokens: Option<u64>,
    pub function_id: Option<String>,
    pub function_name: Option<String>,
}

impl SpanSearchResult {
    pub fn project(record: &SpanRecord) -> Self {
        let metrics = LlmMetrics::from_record(record);
        Self {
            trace_id: record.trace_id.clone(),
            span_id: record.span_id.clone(),
            name: record.name.clone(),
            start_time_unix_nano: start_nanos(record).to_string(),
            duration_ms: duration_ms(record),
            model: metrics.model,
            provider: metrics.provider,
            total_tokens: metrics.total_tokens,
            function_id: metrics.function_id,
            function_name: metrics.function_name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpanSearchResponse {
    pub spans: Vec<SpanSearchResult>,
    pub total: u64,
    /// Always false: search has no pagination window. Callers must not
    /// rely on it.
    pub has_more: bool,
}

/// Full detail view of one cached span, including derived metrics.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpanDetail {
    pub trace_id: String,
    pub span_id: String,
    pub parent_span_id: Option<String>,
    pub name: String,
    pub kind: Option<i32>,
    pub status: Option<SpanStatus>,
    pub start_time_unix_nano: Option<String>,
    pub end_time_unix_nano: Option<String>,
    pub duration_ms: Option<u64>,
    #[schema(value_type = Object)]
    pub attributes: JsonMap<String, JsonValue>,
    #[schema(value_type = Option<Object>)]
    pub events: Option<JsonValue>,
    #[schema(value_type = Option<Object>)]
    pub links: Option<JsonValue>,
    pub environment_id: String,
    pub project_id: String,
    pub organization_id: String,
    pub service_name: Option<String>,
    pub service_version: Option<String>,
    #[schema(value_type = Object)]
    pub resource_attributes: JsonMap<String, JsonValue>,
    pub received_at: u64,
    pub expires_at: u64,
    pub model: Option<String>,
    pub provider: Option<String>,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
    pub cost: Option<f64>,
    pub function_id: Option<String>,
    pub function_name: Option<String>,
    pub function_version: Option<String>,
    pub error_type: Option<String>,
    pub error_message: Option<String>,
}

impl SpanDetail {
    pub fn project(record: &SpanRecord) -> Self {
        let metrics = LlmMetrics::from_record(record);
        Self {
            trace_id: record.trace_id.clone(),
            span_id: record.span_id.clone(),
            parent_span_id: record.parent_span_id.clone(),
            name: record.name.clone(),
            kind: record.kind,
            status: record.status.clone(),
            start_time_unix_nano: record.start_time_unix_nano.clone(),
            end_time_unix_nano: record.end_time_unix_nano.clone(),
            duration_ms: duration_ms(record),
            attributes: record.attributes.clone(),
            events: record.events.clone(),
            links: record.links.clone(),
            environment_id: record.environment_id.clone(),
            project_id: record.project_id.clone(),
            organization_id: record.organization_id.clone(),
            service_name: record.service_name.clone(),
            service_version: record.service_version.clone(),
            resource_attributes: record.resource_attributes.clone(),
            received_at: record.received_at,
            expires_at: record.expires_at,
            model: metrics.model,
            provider: metrics.provider,
            input_tokens: metrics.input_tokens,
            output_tokens: metrics.output_tokens,
            total_tokens: metrics.total_tokens,
            cost: metrics.cost,
            function_id: metrics.function_id,
            function_name: metrics.function_name,
            function_version: metrics.function_version,
            error_type: metrics.error_type,
            error_message: metrics.error_message,
        }
    }
}

/// Reconstructed trace: its spans sorted by start time plus trace-level
/// aggregates.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TraceDetail {
    pub trace_id: String,
    pub spans: Vec<SpanDetail>,
    /// Span id of the first span without a parent; `None` for orphaned or
    /// incomplete traces.
    pub root_span_id: Option<String>,
    /// max(end) - min(start) across spans with parseable timestamps.
    pub total_duration_ms: Option<u64>,
}
