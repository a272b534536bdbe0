//! Error types for queue manager operations

use queue_storage::kv::KvError;
use queue_storage::ticket::TicketStoreError;
use thiserror::Error;

/// Result type for queue manager operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Errors that can occur during queue manager operations
#[derive(Error, Debug)]
pub enum QueueError {
    /// No ticket exists for the requested visit and category today
    #[error("Ticket not found")]
    NotFound,

    /// The requested status change would move the ticket backward or out of
    /// the allowed set
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        /// Current ticket status
        from: common_types::TicketStatus,
        /// Requested ticket status
        to: common_types::TicketStatus,
    },

    /// The atomic store failed; the request can be retried
    #[error(transparent)]
    Kv(#[from] KvError),

    /// The ticket store failed; the request can be retried
    #[error(transparent)]
    Store(#[from] TicketStoreError),
}
