//! Test error types.

/// Result type alias for harness operations.
pub type Result<T> = std::result::Result<T, TestError>;

/// Harness errors.
#[derive(Debug, thiserror::Error)]
pub enum TestError {
    /// A resource-safety claim failed: a leak, double close or pipelined request.
    #[error("resource violation: {0}")]
    Resource(String),

    /// An operation produced an outcome other than the expected one.
    #[error("unexpected outcome: {0}")]
    Outcome(String),

    /// Error from the report pipeline itself.
    #[error("chrony error: {0}")]
    Chrony(#[from] chronyscope_core::ChronyError),
}

impl TestError {
    /// Creates a resource violation.
    #[must_use]
    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource(msg.into())
    }

    /// Creates an unexpected-outcome error.
    #[must_use]
    pub fn outcome(msg: impl Into<String>) -> Self {
        Self::Outcome(msg.into())
    }
}
