//! OPD Queue Backend service
//!
//! Synchronous HTTP API for the ticket/FIFO queue manager: counter terminals
//! and the chat front-end register tickets, check positions, call the next
//! patient, and update statuses. Ordering lives in Redis lists, records in
//! DynamoDB, and every mutation pushes a LINE message to the patient.

#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

/// Ticket/FIFO queue manager
pub mod queue_manager;

/// Handler routes
pub mod routes;

/// HTTP server setup
pub mod server;

/// Environment configuration and universal error handling
pub mod types;
