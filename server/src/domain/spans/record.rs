//! Cache record and wire types.

use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};
use utoipa::ToSchema;

/// Span status as reported by the instrumented application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpanStatus {
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

/// A span as delivered by the ingestion pipeline.
///
/// Timestamps are decimal nanosecond strings; they stay strings until a
/// derivation needs them (see `normalize`). Everything except the ids may
/// be absent: a pending span can arrive with only a start time and be
/// completed by a later delivery.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct WireSpan {
    pub trace_id: String,
    pub span_id: String,
    pub parent_span_id: Option<String>,
    pub start_time_unix_nano: Option<String>,
    pub end_time_unix_nano: Option<String>,
    pub name: String,
    pub kind: Option<i32>,
    pub status: Option<SpanStatus>,
    #[schema(value_type = Object)]
    pub attributes: JsonMap<String, JsonValue>,
    #[schema(value_type = Option<Object>)]
    pub events: Option<JsonValue>,
    #[schema(value_type = Option<Object>)]
    pub links: Option<JsonValue>,
}

/// One ingestion batch: spans plus the context shared by all of them.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpanBatch {
    pub environment_id: String,
    pub project_id: String,
    pub organization_id: String,
    /// Batch receive wall-clock time in milliseconds.
    pub received_at: u64,
    #[serde(default)]
    pub service_name: Option<String>,
    #[serde(default)]
    pub service_version: Option<String>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub resource_attributes: JsonMap<String, JsonValue>,
    pub spans: Vec<WireSpan>,
}

/// Storage key. Unique within one environment's cache.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpanKey {
    pub trace_id: String,
    pub span_id: String,
}

impl SpanKey {
    pub fn new(trace_id: impl Into<String>, span_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            span_id: span_id.into(),
        }
    }
}

/// A cached span: the wire span stamped with batch context and cache
/// bookkeeping. `size_bytes` is derived, not part of the serialized shape.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpanRecord {
    pub trace_id: String,
    pub span_id: String,
    pub parent_span_id: Option<String>,
    pub start_time_unix_nano: Option<String>,
    pub end_time_unix_nano: Option<String>,
    pub name: String,
    pub kind: Option<i32>,
    pub status: Option<SpanStatus>,
    pub attributes: JsonMap<String, JsonValue>,
    pub events: Option<JsonValue>,
    pub links: Option<JsonValue>,

    // Context stamped at ingestion
    pub environment_id: String,
    pub project_id: String,
    pub organization_id: String,
    pub service_name: Option<String>,
    pub service_version: Option<String>,
    pub resource_attributes: JsonMap<String, JsonValue>,

    // Cache bookkeeping (milliseconds)
    pub received_at: u64,
    pub expires_at: u64,
    #[serde(skip)]
    pub size_bytes: u64,
}

impl SpanRecord {
    pub fn key(&self) -> SpanKey {
        SpanKey::new(self.trace_id.clone(), self.span_id.clone())
    }

    /// Estimated serialized size, used for byte-cap accounting.
    pub fn estimate_size(&self) -> u64 {
        serde_json::to_string(self).map_or(0, |s| s.len() as u64)
    }

    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.expires_at <= now_ms
    }
}
