//! Error Types

use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error types
#[derive(Error, Debug)]
pub enum CoreError {
    /// Enrollment oracle could not answer (soft failure, viewer stays locked)
    #[error("Entitlement check failed: {0}")]
    EntitlementCheckFailed(String),
}
