//! Error types for the publish/subscribe system.

use std::sync::Arc;

/// The main error type for the publish/subscribe system.
///
/// Errors travel downstream through `on_error` and may be observed by more
/// than one party (the failed publisher keeps a copy), so causes are shared
/// behind an `Arc` and the type is `Clone`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// A stage failed; carries the underlying cause
    #[error("Stage error: {0}")]
    Stage(#[source] Arc<dyn std::error::Error + Send + Sync>),

    /// The publisher was closed and accepts no more items
    #[error("Publisher is closed")]
    Closed,

    /// The publisher already has an active subscriber
    #[error("Publisher already has an active subscriber")]
    AlreadySubscribed,

    /// A subscriber requested zero items
    #[error("Demand must be positive")]
    InvalidDemand,

    /// The publisher buffer is full
    #[error("Publisher at capacity: {current}/{max}")]
    Capacity { current: usize, max: usize },

    /// An operation timed out
    #[error("Operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// A custom error with a message
    #[error("{0}")]
    Custom(String),
}

// Convenience constructors
impl Error {
    /// Create a stage error from any error type
    pub fn stage<E: std::error::Error + Send + Sync + 'static>(error: E) -> Self {
        Error::Stage(Arc::new(error))
    }

    /// Create a timeout error
    pub fn timeout(duration_ms: u64) -> Self {
        Error::Timeout { duration_ms }
    }

    /// Create a capacity error
    pub fn capacity(current: usize, max: usize) -> Self {
        Error::Capacity { current, max }
    }

    /// Create a custom error with a message
    pub fn custom<S: Into<String>>(message: S) -> Self {
        Error::Custom(message.into())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Custom(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Custom(s.to_string())
    }
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, Error>;

/// Helper trait for converting foreign errors into stage errors
pub trait IntoStageError<T> {
    fn into_stage_error(self) -> Result<T>;
}

impl<T, E> IntoStageError<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn into_stage_error(self) -> Result<T> {
        self.map_err(Error::stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use std::io;

    #[test]
    fn stage_error_keeps_its_cause() {
        let err = Error::stage(io::Error::new(io::ErrorKind::Other, "disk on fire"));
        assert_eq!(err.to_string(), "Stage error: disk on fire");
        assert_eq!(err.source().map(|e| e.to_string()), Some("disk on fire".into()));

        let cloned = err.clone();
        assert_eq!(cloned.to_string(), err.to_string());
    }

    #[test]
    fn into_stage_error_wraps_foreign_errors() {
        let parsed: std::result::Result<i32, _> = "x".parse::<i32>();
        let err = parsed.into_stage_error().unwrap_err();
        assert!(matches!(err, Error::Stage(_)));
    }

    #[test]
    fn display_formats() {
        assert_eq!(Error::capacity(4, 4).to_string(), "Publisher at capacity: 4/4");
        assert_eq!(Error::timeout(50).to_string(), "Operation timed out after 50ms");
        assert_eq!(Error::from("boom").to_string(), "boom");
    }
}
