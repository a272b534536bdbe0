//! Error types for HIS gateway operations

use thiserror::Error;

/// Result type for HIS gateway operations
pub type SourceResult<T> = Result<T, SourceError>;

/// Errors that can occur while querying the HIS facade
#[derive(Error, Debug)]
pub enum SourceError {
    /// The request never completed (connect failure, timeout)
    #[error("HIS gateway transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The facade answered with a non-success status
    #[error("HIS gateway returned status {0}")]
    Status(u16),
}
