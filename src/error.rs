//! Error types for insight extraction and persistence.
//!
//! Errors are classified by recoverability:
//! - Retryable: network issues, timeouts
//! - NonRetryable: validation rejections, missing entities, bad payloads
//!
//! Decode anomalies in stored lists are deliberately *not* an error category —
//! the canonicalizer is total and always recovers locally.

use thiserror::Error;

/// Error from a persistence write or read.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    // Retryable errors
    #[error("Network error: {0}")]
    Network(String),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    // Non-retryable errors
    #[error("Validation rejected: {0}")]
    Validation(String),

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Returns true if this error is worth a retry click.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Network(_) | StoreError::Timeout(_))
    }
}

/// Error from parsing the AI extraction collaborator's response.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("No JSON object found in extraction response")]
    NoJsonFound,

    #[error("Failed to parse extraction response: {0}")]
    InvalidJson(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(StoreError::Network("connection reset".into()).is_retryable());
        assert!(StoreError::Timeout(30).is_retryable());
        assert!(!StoreError::Validation("title required".into()).is_retryable());
        assert!(!StoreError::NotFound("person-123".into()).is_retryable());
    }

    #[test]
    fn test_error_messages() {
        let e = StoreError::NotFound("sarah-chen".into());
        assert_eq!(e.to_string(), "Entity not found: sarah-chen");
        let e = ExtractError::NoJsonFound;
        assert!(e.to_string().contains("No JSON object"));
    }
}
