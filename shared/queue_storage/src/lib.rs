//! Storage services for the OPD queue backend and monitor
//!
//! This crate owns every stateful concern of the queue system: the Redis
//! atomic primitives behind ticket numbering and FIFO ordering, the DynamoDB
//! ticket and audit-history tables, the per-day notification tracking tables
//! that enforce at-most-once dispatch, and the LINE identity registry.
//!
//! Each store is exposed through a narrow trait so the queue manager and the
//! reconciliation loop never touch a client directly; the `test-utils`
//! feature provides in-memory implementations of the same traits.

#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

/// Calendar-day helpers (service day keys, local-midnight expiry)
pub mod day;
/// LINE identity registry
pub mod identity;
/// Atomic key-value primitives (counters, FIFO lists, working cache)
pub mod kv;
/// Ticket records and audit history
pub mod ticket;
/// Notification dedup tracking (dispensing stages and slot calls)
pub mod tracking;
