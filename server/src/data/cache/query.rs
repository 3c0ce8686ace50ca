//! Query engine: attribute-filtered search and trace reconstruction.
//!
//! Both operations scan the shard's live records; expired-but-unswept
//! records are invisible here. Search criteria AND together, results are
//! projected to summaries, and missing sort values always order last so
//! they never interleave with present ones.

use serde_json::Value as JsonValue;

use crate::domain::spans::{
    LlmMetrics, SpanRecord, duration_ms, end_nanos, has_error, keys, start_nanos,
};
use crate::utils::time::{nanos_diff_millis, parse_unix_nanos};

use super::store::SpanStore;
use super::types::{
    AttributeFilter, FilterOp, SortBy, SortOrder, SpanDetail, SpanSearchInput, SpanSearchResponse,
    SpanSearchResult, TraceDetail,
};

impl SpanStore {
    /// Search the shard. An empty input matches everything still alive.
    pub fn search(&self, input: &SpanSearchInput, now_ms: u64) -> SpanSearchResponse {
        let mut matched: Vec<&SpanRecord> = self
            .live_records(now_ms)
            .filter(|r| matches(r, input))
            .collect();

        sort_records(&mut matched, input.sort_by, input.sort_order);

        let spans: Vec<SpanSearchResult> =
            matched.iter().map(|r| SpanSearchResult::project(r)).collect();
        SpanSearchResponse {
            total: spans.len() as u64,
            spans,
            has_more: false,
        }
    }

    /// Reconstruct one trace from its live spans, sorted by start time.
    pub fn trace_detail(&self, trace_id: &str, now_ms: u64) -> TraceDetail {
        let mut records: Vec<&SpanRecord> = self
            .live_records(now_ms)
            .filter(|r| r.trace_id == trace_id)
            .collect();
        records.sort_by(|a, b| {
            start_nanos(a)
                .cmp(&start_nanos(b))
                .then_with(|| a.span_id.cmp(&b.span_id))
        });

        let root_span_id = records
            .iter()
            .find(|r| r.parent_span_id.is_none())
            .map(|r| r.span_id.clone());

        let min_start = records
            .iter()
            .filter_map(|r| r.start_time_unix_nano.as_deref().and_then(parse_unix_nanos))
            .min();
        let max_end = records.iter().filter_map(|r| end_nanos(r)).max();
        let total_duration_ms = match (min_start, max_end) {
            (Some(start), Some(end)) => nanos_diff_millis(start, end),
            _ => None,
        };

        TraceDetail {
            trace_id: trace_id.to_string(),
            spans: records.iter().map(|r| SpanDetail::project(r)).collect(),
            root_span_id,
            total_duration_ms,
        }
    }
}

// ============================================================================
// MATCHING
// ============================================================================

fn matches(record: &SpanRecord, input: &SpanSearchInput) -> bool {
    if let Some(from) = input.start_time_from.as_deref().and_then(parse_unix_nanos) {
        if start_nanos(record) < from {
            return false;
        }
    }
    if let Some(to) = input.start_time_to.as_deref().and_then(parse_unix_nanos) {
        if start_nanos(record) > to {
            return false;
        }
    }

    if let Some(trace_id) = &input.trace_id {
        if record.trace_id != *trace_id {
            return false;
        }
    }
    if let Some(span_id) = &input.span_id {
        if record.span_id != *span_id {
            return false;
        }
    }

    if let Some(query) = &input.query {
        if !name_matches(&record.name, query) {
            return false;
        }
    }
    if let Some(q) = &input.input_query {
        if !attr_text_contains(record, keys::INPUT_VALUE, q) {
            return false;
        }
    }
    if let Some(q) = &input.output_query {
        if !attr_text_contains(record, keys::OUTPUT_VALUE, q) {
            return false;
        }
    }

    let metrics = LlmMetrics::from_record(record);

    if let Some(models) = &input.models {
        match &metrics.model {
            Some(model) if models.contains(model) => {}
            _ => return false,
        }
    }
    if let Some(providers) = &input.providers {
        match &metrics.provider {
            Some(provider) if providers.contains(provider) => {}
            _ => return false,
        }
    }

    if let Some(function_id) = &input.function_id {
        if metrics.function_id.as_ref() != Some(function_id) {
            return false;
        }
    }
    if let Some(function_name) = &input.function_name {
        if metrics.function_name.as_ref() != Some(function_name) {
            return false;
        }
    }

    if let Some(wanted) = input.has_error {
        if has_error(record) != wanted {
            return false;
        }
    }

    // Missing metrics count as 0: they fail any minimum and pass any maximum
    let total_tokens = metrics.total_tokens.unwrap_or(0);
    if input.min_total_tokens.is_some_and(|min| total_tokens < min) {
        return false;
    }
    if input.max_total_tokens.is_some_and(|max| total_tokens > max) {
        return false;
    }

    let duration = duration_ms(record).unwrap_or(0);
    if input.min_duration_ms.is_some_and(|min| duration < min) {
        return false;
    }
    if input.max_duration_ms.is_some_and(|max| duration > max) {
        return false;
    }

    input
        .attribute_filters
        .iter()
        .all(|f| attribute_matches(record, f))
}

/// Token query over the span name: every alphanumeric token of the query
/// must appear as a substring of the lower-cased name, in any order.
fn name_matches(name: &str, query: &str) -> bool {
    let name = name.to_lowercase();
    query
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .all(|token| name.contains(token))
}

/// Case-insensitive substring match against a text attribute. A record
/// without the attribute never matches.
fn attr_text_contains(record: &SpanRecord, key: &str, query: &str) -> bool {
    record
        .attributes
        .get(key)
        .and_then(JsonValue::as_str)
        .is_some_and(|text| text.to_lowercase().contains(&query.to_lowercase()))
}

/// Evaluate one generic attribute filter. A missing attribute satisfies
/// `neq` and fails `eq`/`contains`/`exists`.
fn attribute_matches(record: &SpanRecord, filter: &AttributeFilter) -> bool {
    let rendered = record.attributes.get(&filter.key).map(render_attr);
    let wanted = filter.value.as_deref().unwrap_or("");
    match (filter.op, rendered) {
        (FilterOp::Exists, value) => value.is_some(),
        (FilterOp::Eq, Some(value)) => value == wanted,
        (FilterOp::Eq, None) => false,
        (FilterOp::Neq, Some(value)) => value != wanted,
        (FilterOp::Neq, None) => true,
        (FilterOp::Contains, Some(value)) => value.contains(wanted),
        (FilterOp::Contains, None) => false,
    }
}

/// Attribute values compare through their text rendering so numeric and
/// boolean attributes can be filtered without a typed filter grammar.
fn render_attr(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ============================================================================
// SORTING
// ============================================================================

fn sort_key(record: &SpanRecord, sort_by: SortBy) -> Option<u128> {
    match sort_by {
        SortBy::StartTime => Some(start_nanos(record)),
        SortBy::DurationMs => duration_ms(record).map(u128::from),
        SortBy::TotalTokens => LlmMetrics::from_record(record)
            .total_tokens
            .map(u128::from),
    }
}

/// Sort with missing values always last, whatever the direction, and a
/// key tie-break so equal values order reproducibly.
fn sort_records(records: &mut Vec<&SpanRecord>, sort_by: SortBy, order: SortOrder) {
    let mut keyed: Vec<(Option<u128>, &SpanRecord)> = records
        .iter()
        .map(|r| (sort_key(r, sort_by), *r))
        .collect();
    keyed.sort_by(|(a, ra), (b, rb)| match (a, b) {
        (Some(a), Some(b)) => {
            let ord = match order {
                SortOrder::Asc => a.cmp(b),
                SortOrder::Desc => b.cmp(a),
            };
            ord.then_with(|| record_key(ra).cmp(&record_key(rb)))
        }
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => record_key(ra).cmp(&record_key(rb)),
    });
    *records = keyed.into_iter().map(|(_, r)| r).collect();
}

fn record_key(record: &SpanRecord) -> (&str, &str) {
    (record.trace_id.as_str(), record.span_id.as_str())
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod tests;
