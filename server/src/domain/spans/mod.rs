//! Span normalization
//!
//! Converts wire-format spans plus batch-level context into cache records
//! and derives the fields both the store and the query engine need:
//!
//! - `record` - Wire DTOs, the cached record, and the `(trace_id, span_id)` key
//! - `normalize` - Record construction and the pure derivations (timestamps,
//!   duration, LLM metrics)
//!
//! Timestamps are opaque decimal nanosecond strings end to end; arithmetic
//! happens on `u128` after parsing. Attributes are an opaque string-keyed
//! bag; domain fields (model, tokens, cost, function identity, exception
//! info) are pulled out by convention keys so new attribute keys never
//! require a schema change.

mod normalize;
mod record;

use serde_json::{Map as JsonMap, Value as JsonValue};

pub use self::normalize::{
    LlmMetrics, build_record, duration_ms, end_nanos, has_error, start_nanos,
};
pub use self::record::{SpanBatch, SpanKey, SpanRecord, SpanStatus, WireSpan};

/// Span status code for an errored span (OTLP `STATUS_CODE_ERROR`).
pub const STATUS_CODE_ERROR: i32 = 2;

// ============================================================================
// ATTRIBUTE KEYS
// ============================================================================

pub(crate) mod keys {
    // Provider / model
    pub const GEN_AI_SYSTEM: &str = "gen_ai.system";
    pub const GEN_AI_PROVIDER_NAME: &str = "gen_ai.provider.name";
    pub const GEN_AI_REQUEST_MODEL: &str = "gen_ai.request.model";
    pub const GEN_AI_RESPONSE_MODEL: &str = "gen_ai.response.model";

    // Token usage
    pub const GEN_AI_INPUT_TOKENS: &str = "gen_ai.usage.input_tokens";
    pub const GEN_AI_PROMPT_TOKENS: &str = "gen_ai.usage.prompt_tokens";
    pub const GEN_AI_OUTPUT_TOKENS: &str = "gen_ai.usage.output_tokens";
    pub const GEN_AI_COMPLETION_TOKENS: &str = "gen_ai.usage.completion_tokens";
    pub const GEN_AI_TOTAL_TOKENS: &str = "gen_ai.usage.total_tokens";

    // Cost
    pub const GEN_AI_COST: &str = "gen_ai.usage.cost";

    // Function identity
    pub const FUNCTION_ID: &str = "llm.function.id";
    pub const FUNCTION_NAME: &str = "llm.function.name";
    pub const FUNCTION_VERSION: &str = "llm.function.version";

    // Exception info
    pub const EXCEPTION_TYPE: &str = "exception.type";
    pub const EXCEPTION_MESSAGE: &str = "exception.message";

    // I/O attributes
    pub const INPUT_VALUE: &str = "input.value";
    pub const OUTPUT_VALUE: &str = "output.value";
}

// ============================================================================
// SHARED HELPER FUNCTIONS
// ============================================================================

/// Get an attribute as text. Only string values are treated as text.
pub(crate) fn attr_str<'a>(attrs: &'a JsonMap<String, JsonValue>, key: &str) -> Option<&'a str> {
    attrs.get(key).and_then(JsonValue::as_str)
}

/// Get the first matching string value from a list of keys.
pub(crate) fn get_first(attrs: &JsonMap<String, JsonValue>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| attr_str(attrs, k))
        .map(String::from)
}

/// Get an attribute as an unsigned integer, accepting either a JSON number
/// or a decimal string (SDKs disagree on how they encode counts).
pub(crate) fn attr_u64(attrs: &JsonMap<String, JsonValue>, key: &str) -> Option<u64> {
    match attrs.get(key)? {
        JsonValue::Number(n) => n.as_u64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Get the first matching unsigned integer from a list of keys.
pub(crate) fn get_first_u64(attrs: &JsonMap<String, JsonValue>, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|k| attr_u64(attrs, k))
}

/// Get an attribute as a float, accepting a JSON number or a decimal string.
pub(crate) fn attr_f64(attrs: &JsonMap<String, JsonValue>, key: &str) -> Option<f64> {
    match attrs.get(key)? {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
