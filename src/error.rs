//! Error types for the background-refresh subsystem.

/// Top-level error type for the background-refresh crate.
///
/// Errors propagate internally with `?`; the host-facing gateway never
/// surfaces them to the caller — failures are recorded in the cache's
/// `lastError` field instead.
#[derive(Debug, thiserror::Error)]
pub enum BriefError {
    /// Durable key-value store error (read, commit, or file I/O).
    #[error("store error: {0}")]
    Store(String),

    /// Fetch client construction or request error.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// Job scheduling error (submission, cancellation).
    #[error("scheduler error: {0}")]
    Scheduler(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, BriefError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_store() {
        let err = BriefError::Store("commit failed".into());
        assert_eq!(err.to_string(), "store error: commit failed");
    }

    #[test]
    fn display_scheduler() {
        let err = BriefError::Scheduler("no runtime".into());
        assert_eq!(err.to_string(), "scheduler error: no runtime");
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: BriefError = io.into();
        assert!(matches!(err, BriefError::Io(_)));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BriefError>();
    }
}
