//! Shared API types
//!
//! Error envelope and helpers used by all endpoints. The cache error
//! taxonomy maps onto distinct HTTP statuses so callers can choose a
//! retry policy from the response alone.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::data::cache::CacheError;

/// Maximum accepted id length for path/body identifiers
pub const MAX_ID_LENGTH: usize = 256;

/// Standard API error response
#[derive(Debug)]
pub enum ApiError {
    BadRequest { code: String, message: String },
    NotFound { code: String, message: String },
    BadGateway { code: String, message: String },
    GatewayTimeout { message: String },
    ServiceUnavailable { code: String, message: String },
    Internal { message: String },
}

impl ApiError {
    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFound {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Translate a cache failure, keeping the four classes distinct:
    /// not-initialized and unreachable-shard are service-availability
    /// problems (503), a deadline is 504, and a failed or malformed
    /// exchange is a bad gateway (502).
    pub fn from_cache(e: CacheError) -> Self {
        tracing::warn!(error = %e, "Span cache error");
        match &e {
            CacheError::NotInitialized => Self::ServiceUnavailable {
                code: "CACHE_NOT_INITIALIZED".to_string(),
                message: e.to_string(),
            },
            CacheError::ShardResolve(_) => Self::ServiceUnavailable {
                code: "SHARD_UNREACHABLE".to_string(),
                message: e.to_string(),
            },
            CacheError::Timeout(_) => Self::GatewayTimeout {
                message: e.to_string(),
            },
            CacheError::Request(_) => Self::BadGateway {
                code: "SHARD_REQUEST_FAILED".to_string(),
                message: e.to_string(),
            },
            CacheError::Decode(_) => Self::BadGateway {
                code: "SHARD_BAD_RESPONSE".to_string(),
                message: e.to_string(),
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::BadGateway { .. } => StatusCode::BAD_GATEWAY,
            Self::GatewayTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error_type, code, message) = match self {
            Self::BadRequest { code, message } => ("bad_request", code, message),
            Self::NotFound { code, message } => ("not_found", code, message),
            Self::BadGateway { code, message } => ("bad_gateway", code, message),
            Self::GatewayTimeout { message } => {
                ("gateway_timeout", "CACHE_TIMEOUT".to_string(), message)
            }
            Self::ServiceUnavailable { code, message } => ("service_unavailable", code, message),
            Self::Internal { message } => ("internal_error", "INTERNAL".to_string(), message),
        };
        (
            status,
            Json(serde_json::json!({
                "error": error_type,
                "code": code,
                "message": message
            })),
        )
            .into_response()
    }
}

/// Reject ids that are empty or absurdly long before they reach a shard.
pub fn validate_id(value: &str, field: &str) -> Result<(), ApiError> {
    if value.is_empty() {
        return Err(ApiError::bad_request(
            "INVALID_ID",
            format!("'{field}' must not be empty"),
        ));
    }
    if value.len() > MAX_ID_LENGTH {
        return Err(ApiError::bad_request(
            "INVALID_ID",
            format!("'{field}' too long (max {MAX_ID_LENGTH} chars)"),
        ));
    }
    Ok(())
}
