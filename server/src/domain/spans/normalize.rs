//! Record construction and pure derivations.
//!
//! Everything in this module is a deterministic function of its input:
//! no clocks, no I/O. The store calls `build_record` on ingestion; the
//! query engine calls the derivations at read time.

use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::utils::time::{millis_to_nanos, nanos_diff_millis, parse_unix_nanos};

use super::{
    STATUS_CODE_ERROR, SpanBatch, SpanRecord, WireSpan, attr_f64, attr_str, get_first,
    get_first_u64, keys,
};

/// Build a cache record from a wire span and its batch context.
///
/// `ttl_ms` is the cache TTL; `expires_at = received_at + ttl_ms`.
pub fn build_record(batch: &SpanBatch, span: &WireSpan, ttl_ms: u64) -> SpanRecord {
    let mut record = SpanRecord {
        trace_id: span.trace_id.clone(),
        span_id: span.span_id.clone(),
        parent_span_id: span.parent_span_id.clone(),
        start_time_unix_nano: span.start_time_unix_nano.clone(),
        end_time_unix_nano: span.end_time_unix_nano.clone(),
        name: span.name.clone(),
        kind: span.kind,
        status: span.status.clone(),
        attributes: span.attributes.clone(),
        events: span.events.clone(),
        links: span.links.clone(),
        environment_id: batch.environment_id.clone(),
        project_id: batch.project_id.clone(),
        organization_id: batch.organization_id.clone(),
        service_name: batch.service_name.clone(),
        service_version: batch.service_version.clone(),
        resource_attributes: batch.resource_attributes.clone(),
        received_at: batch.received_at,
        expires_at: batch.received_at.saturating_add(ttl_ms),
        size_bytes: 0,
    };
    record.size_bytes = record.estimate_size();
    record
}

/// Start time in nanoseconds, falling back to the batch receive time when
/// the span arrived without (or with an unparseable) start timestamp.
pub fn start_nanos(record: &SpanRecord) -> u128 {
    record
        .start_time_unix_nano
        .as_deref()
        .and_then(parse_unix_nanos)
        .unwrap_or_else(|| millis_to_nanos(record.received_at))
}

/// End time in nanoseconds. `None` means the span is still in progress.
pub fn end_nanos(record: &SpanRecord) -> Option<u128> {
    record.end_time_unix_nano.as_deref().and_then(parse_unix_nanos)
}

/// Span duration in whole milliseconds.
///
/// `None` when either raw timestamp is missing or the difference would be
/// negative. The receive-time fallback does NOT apply here: a duration
/// computed against the batch clock would be meaningless.
pub fn duration_ms(record: &SpanRecord) -> Option<u64> {
    let start = record.start_time_unix_nano.as_deref().and_then(parse_unix_nanos)?;
    let end = end_nanos(record)?;
    nanos_diff_millis(start, end)
}

/// Whether the span carries an error: an extracted exception type or an
/// explicit error status code.
pub fn has_error(record: &SpanRecord) -> bool {
    if attr_str(&record.attributes, keys::EXCEPTION_TYPE).is_some() {
        return true;
    }
    record
        .status
        .as_ref()
        .is_some_and(|s| s.code == STATUS_CODE_ERROR)
}

// ============================================================================
// LLM METRICS
// ============================================================================

/// LLM-specific fields extracted from the opaque attribute bag by
/// convention keys. All fields are optional; absence means the span did
/// not report that attribute.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LlmMetrics {
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

impl LlmMetrics {
    pub fn from_record(record: &SpanRecord) -> Self {
        Self::from_attributes(&record.attributes)
    }

    pub fn from_attributes(attrs: &JsonMap<String, JsonValue>) -> Self {
        let input_tokens = get_first_u64(
            attrs,
            &[keys::GEN_AI_INPUT_TOKENS, keys::GEN_AI_PROMPT_TOKENS],
        );
        let output_tokens = get_first_u64(
            attrs,
            &[keys::GEN_AI_OUTPUT_TOKENS, keys::GEN_AI_COMPLETION_TOKENS],
        );

        // Explicit total wins; otherwise input+output, with either side
        // treated as 0 when only one is reported. Null only when the span
        // reported no token usage at all.
        let total_tokens = get_first_u64(attrs, &[keys::GEN_AI_TOTAL_TOKENS]).or(
            match (input_tokens, output_tokens) {
                (None, None) => None,
                (i, o) => Some(i.unwrap_or(0).saturating_add(o.unwrap_or(0))),
            },
        );

        Self {
            model: get_first(
                attrs,
                &[keys::GEN_AI_REQUEST_MODEL, keys::GEN_AI_RESPONSE_MODEL],
            ),
            provider: get_first(attrs, &[keys::GEN_AI_SYSTEM, keys::GEN_AI_PROVIDER_NAME]),
            input_tokens,
            output_tokens,
            total_tokens,
            cost: attr_f64(attrs, keys::GEN_AI_COST),
            function_id: get_first(attrs, &[keys::FUNCTION_ID]),
            function_name: get_first(attrs, &[keys::FUNCTION_NAME]),
            function_version: get_first(attrs, &[keys::FUNCTION_VERSION]),
            error_type: get_first(attrs, &[keys::EXCEPTION_TYPE]),
            error_message: get_first(attrs, &[keys::EXCEPTION_MESSAGE]),
        }
    }
}

#[cfg(test)]
#[path = "normalize_tests.rs"]
mod tests;
