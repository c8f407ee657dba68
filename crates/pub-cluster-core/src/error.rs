//! Error types for pub-cluster-core.
//!
//! Defines the crate-level error type [`ClusterError`] and the
//! [`ClusterResult<T>`] alias. Expected, recoverable outcomes (a degenerate
//! candidate during a parameter sweep, a missing optional algorithm, an
//! unknown method string) are NOT errors — they are handled inside the engine
//! and surfaced as response fields or log lines. `ClusterError` is reserved
//! for caller mistakes (invalid parameters) and unrecoverable numeric
//! failures.

use thiserror::Error;

/// Result alias for clustering operations.
pub type ClusterResult<T> = Result<T, ClusterError>;

/// Top-level error type for clustering operations.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// A configuration or request parameter failed validation.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A numeric routine failed in a way the engine could not degrade.
    ///
    /// The engine falls back to a no-reduction k-means path for reduction
    /// failures, so this variant should be rare in practice.
    #[error("Numeric failure in {operation}: {message}")]
    NumericFailure {
        /// The operation that failed (e.g. "pca", "silhouette").
        operation: String,
        /// Description of the failure.
        message: String,
    },
}

impl ClusterError {
    /// Create an `InvalidParameter` error.
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Create a `NumericFailure` error.
    pub fn numeric(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NumericFailure {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_parameter_display() {
        let err = ClusterError::invalid_parameter("k_max must be >= 2, got 1");
        assert!(err.to_string().contains("k_max"));

        println!("[PASS] test_invalid_parameter_display - error: {}", err);
    }

    #[test]
    fn test_numeric_failure_display() {
        let err = ClusterError::numeric("pca", "covariance power iteration did not converge");
        assert!(err.to_string().contains("pca"));

        println!("[PASS] test_numeric_failure_display - error: {}", err);
    }
}
