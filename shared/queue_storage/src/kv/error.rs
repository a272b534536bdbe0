//! Error types for atomic key-value operations

use thiserror::Error;

/// Result type for atomic key-value operations
pub type KvResult<T> = Result<T, KvError>;

/// Errors that can occur during atomic key-value operations
#[derive(Error, Debug)]
pub enum KvError {
    /// The store did not answer within the per-operation timeout
    #[error("Key-value store timed out")]
    Timeout,

    /// The underlying Redis command failed
    #[error("Key-value store error: {0}")]
    Redis(#[from] redis::RedisError),
}
