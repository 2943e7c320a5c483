//! Driver-level error type.

use std::sync::Arc;

/// Result type for driver operations.
pub type Result<T> = std::result::Result<T, DriverError>;

/// Errors returned by base drivers and the instrumented wrappers.
///
/// `Clone` so an error can be attached to a [`crate::hooks::HookEvent`]
/// and still be handed back to the caller unchanged.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DriverError {
    /// Optional capability absent. Callers should take their fallback path.
    #[error("driver: skip fast-path; continue as if unimplemented")]
    Skip,

    #[error("driver: bad connection")]
    BadConn,

    #[error("sql: driver does not support the use of Named Parameters")]
    NamedParameters,

    #[error("sql: driver does not support non-default isolation level")]
    UnsupportedIsolation,

    #[error("sql: driver does not support read-only transactions")]
    ReadOnlyUnsupported,

    #[error("driver: {0} is not supported")]
    Unsupported(String),

    #[error("{0}")]
    Backend(Arc<dyn std::error::Error + Send + Sync>),

    #[error("{0}")]
    Message(String),
}

impl DriverError {
    /// Build an error from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        DriverError::Message(message.into())
    }

    /// Whether this error only signals an absent capability.
    pub fn is_skip(&self) -> bool {
        matches!(self, DriverError::Skip)
    }
}

impl From<sqlx::Error> for DriverError {
    fn from(err: sqlx::Error) -> Self {
        DriverError::Backend(Arc::new(err))
    }
}
