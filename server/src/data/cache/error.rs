//! Cache error taxonomy
//!
//! The four failure classes stay distinct so callers can pick a retry
//! policy: a shard that cannot be addressed is not the same as a shard
//! that answered with something unparseable. The cache itself never
//! retries; redelivery is the ingestion pipeline's job.

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    /// The span cache subsystem was never wired up (disabled by config or
    /// called before startup finished). A startup-ordering guard, not a
    /// runtime fault.
    #[error("span cache is not initialized")]
    NotInitialized,

    /// The target environment's shard could not be resolved.
    #[error("failed to resolve span cache shard for environment '{0}'")]
    ShardResolve(String),

    /// The request/response exchange with the shard failed.
    #[error("span cache shard request failed: {0}")]
    Request(String),

    /// The shard did not answer within the configured deadline.
    #[error("span cache shard request timed out after {0:?}")]
    Timeout(Duration),

    /// The shard answered, but the response could not be decoded into the
    /// expected shape.
    #[error("failed to decode span cache shard response: {0}")]
    Decode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_initialized_display() {
        assert_eq!(
            CacheError::NotInitialized.to_string(),
            "span cache is not initialized"
        );
    }

    #[test]
    fn test_shard_resolve_display() {
        let err = CacheError::ShardResolve("env-7".to_string());
        assert_eq!(
            err.to_string(),
            "failed to resolve span cache shard for environment 'env-7'"
        );
    }

    #[test]
    fn test_request_display() {
        let err = CacheError::Request("mailbox closed".to_string());
        assert_eq!(
            err.to_string(),
            "span cache shard request failed: mailbox closed"
        );
    }

    #[test]
    fn test_timeout_display_mentions_deadline() {
        let err = CacheError::Timeout(Duration::from_secs(5));
        assert!(err.to_string().contains("5s"));
    }

    #[test]
    fn test_decode_display() {
        let err = CacheError::Decode("unexpected reply variant".to_string());
        assert!(err.to_string().contains("unexpected reply variant"));
    }
}
