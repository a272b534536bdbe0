//! Hospital information system gateway
//!
//! The HIS is the authoritative system-of-record; this side is strictly
//! read-only and sees it through a REST facade owned by the hospital's
//! integration team. One fetcher per lifecycle stage, each scoped to today.

mod error;
mod gateway;
mod types;

use async_trait::async_trait;

pub use error::{SourceError, SourceResult};
pub use gateway::HisGateway;
pub use types::{DispenseRecord, SlotCall, VisitKeys};

/// Read-only seam over the HIS facade
///
/// Every call carries the client's request timeout; a timed-out fetch is the
/// caller's per-fetcher failure for the cycle, never a stall.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Today's dispensing records still in preparation
    async fn fetch_preparing_today(&self) -> SourceResult<Vec<DispenseRecord>>;

    /// Today's dispensing records marked ready (or with nothing to dispense)
    async fn fetch_ready_today(&self) -> SourceResult<Vec<DispenseRecord>>;

    /// Today's payment-counter slot calls
    async fn fetch_payment_calls_today(&self) -> SourceResult<Vec<SlotCall>>;

    /// Today's pickup-counter slot calls
    async fn fetch_pickup_calls_today(&self) -> SourceResult<Vec<SlotCall>>;

    /// Point lookup of one visit's secondary keys (MRN, citizen id)
    async fn fetch_visit_keys(&self, visit_id: &str) -> SourceResult<Option<VisitKeys>>;
}
