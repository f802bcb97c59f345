//! Error types for the sync engine.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Network failure while pulling, pushing, or fetching assets.
    #[error("network failure: {message}")]
    Network {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// A deadline elapsed before the operation completed.
    #[error("{message}")]
    Timeout {
        /// Human-readable deadline description.
        message: String,
    },

    /// Sync was cancelled. Never retried.
    #[error("sync cancelled")]
    Cancelled,

    /// A reconciliation run was aborted mid-flight.
    #[error("reconciliation aborted: {source}")]
    MergeAborted {
        /// The failure that aborted the run.
        #[source]
        source: Box<SyncError>,
    },
}

impl SyncError {
    /// Creates a retryable network error.
    pub fn network_retryable(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable network error.
    pub fn network_fatal(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            retryable: false,
        }
    }

    /// Wraps the failure that aborted a reconciliation run.
    pub fn merge_aborted(source: SyncError) -> Self {
        Self::MergeAborted {
            source: Box::new(source),
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Network { retryable, .. } => *retryable,
            SyncError::Timeout { .. } => true,
            SyncError::Cancelled => false,
            SyncError::MergeAborted { source } => source.is_retryable(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(SyncError::network_retryable("connection lost").is_retryable());
        assert!(!SyncError::network_fatal("invalid certificate").is_retryable());
        assert!(SyncError::Timeout {
            message: "timeout after 10ms".into()
        }
        .is_retryable());
        assert!(!SyncError::Cancelled.is_retryable());
    }

    #[test]
    fn merge_aborted_delegates_to_source() {
        let aborted = SyncError::merge_aborted(SyncError::network_retryable("cover fetch failed"));
        assert!(aborted.is_retryable());

        let fatal = SyncError::merge_aborted(SyncError::Cancelled);
        assert!(!fatal.is_retryable());
    }

    #[test]
    fn merge_aborted_preserves_cause() {
        let aborted = SyncError::merge_aborted(SyncError::network_retryable("cover fetch failed"));
        assert_eq!(
            aborted.to_string(),
            "reconciliation aborted: network failure: cover fetch failed"
        );

        let source = std::error::Error::source(&aborted).unwrap();
        assert_eq!(source.to_string(), "network failure: cover fetch failed");
    }

    #[test]
    fn error_display() {
        assert_eq!(SyncError::Cancelled.to_string(), "sync cancelled");
        assert_eq!(
            SyncError::network_retryable("dns lookup failed").to_string(),
            "network failure: dns lookup failed"
        );
    }
}
