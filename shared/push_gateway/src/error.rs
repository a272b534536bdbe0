//! Error types for push channel operations

use thiserror::Error;

/// Result type for push channel operations
pub type PushResult<T> = Result<T, PushError>;

/// Errors that can occur during a push send
#[derive(Error, Debug)]
pub enum PushError {
    /// The request never completed (connect failure, timeout)
    #[error("Push channel transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The channel answered with a non-success status; the send is
    /// unconfirmed and safe to retry
    #[error("Push channel rejected the send: status {status}, body: {body}")]
    Unconfirmed {
        /// HTTP status returned by the channel
        status: u16,
        /// Response body, for the logs
        body: String,
    },
}
