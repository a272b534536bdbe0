//! Dispensing stage classification
//!
//! Pure, ordered first-match-wins over one fetched row. The default is
//! `Waiting`, never a drop: an ambiguous row is retried on the next poll.

use crate::his::DispenseRecord;

/// Why a visit's dispensing lifecycle is considered over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionReason {
    /// A receipt was issued or the visit departed
    PaidOrDeparted,
    /// Explicitly marked as having nothing to dispense; the patient is still
    /// told about it
    NoItem,
}

/// Lifecycle stage of one dispensing record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// Preparation acknowledged, not yet ready
    Waiting,
    /// Prepared and waiting for call-up
    Ready,
    /// Terminal; callers branch on the reason, not just the bucket
    Completed(CompletionReason),
}

/// Classifies one fetched record into its lifecycle stage
#[must_use]
pub const fn determine_status(record: &DispenseRecord) -> StageOutcome {
    if record.receipt_no.is_some() || record.departed_at.is_some() {
        return StageOutcome::Completed(CompletionReason::PaidOrDeparted);
    }
    if record.no_item {
        return StageOutcome::Completed(CompletionReason::NoItem);
    }
    if record.acknowledged && record.ready {
        return StageOutcome::Ready;
    }
    if record.acknowledged {
        return StageOutcome::Waiting;
    }
    // Fail open: an un-acknowledged or otherwise ambiguous row stays
    // waiting and is re-examined next poll
    StageOutcome::Waiting
}
