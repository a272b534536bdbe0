//! Domain types shared between the queue backend and the queue monitor
//!
//! These enums are the vocabulary of the OPD queue: which waiting line a
//! ticket belongs to, where a ticket is in its lifecycle, and which
//! notification stages exist for dedup bookkeeping.

#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A named FIFO waiting line, one per service counter type
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Display,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum QueueCategory {
    /// Pharmacy dispensing counter
    Pharmacy,
    /// Examination room
    Doctor,
    /// Laboratory
    Lab,
    /// Radiology
    Xray,
    /// Cashier counter
    Cashier,
}

impl QueueCategory {
    /// Patient-facing Thai label used in push messages
    #[must_use]
    pub const fn thai_label(self) -> &'static str {
        match self {
            Self::Pharmacy => "ห้องยา",
            Self::Doctor => "ห้องตรวจ",
            Self::Lab => "ห้องแล็บ",
            Self::Xray => "ห้องเอ็กซเรย์",
            Self::Cashier => "ห้องการเงิน",
        }
    }
}

/// Lifecycle state of a ticket
///
/// Tickets only move forward: `waiting → called → serving → done`, with
/// `cancelled` and `no_show` reachable from the non-terminal states.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Display,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TicketStatus {
    /// In the FIFO list, not yet called
    Waiting,
    /// Popped from the FIFO list and announced at a counter
    Called,
    /// Being served at a counter
    Serving,
    /// Service finished
    Done,
    /// Cancelled by the patient or staff
    Cancelled,
    /// Did not show up after being called
    NoShow,
}

impl TicketStatus {
    /// Whether this status ends the ticket's life and removes it from the
    /// FIFO list
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Cancelled | Self::NoShow)
    }

    /// Whether a transition from `self` to `next` moves forward
    ///
    /// Equal statuses are not a transition (callers treat them as a no-op),
    /// and terminal statuses accept nothing.
    #[must_use]
    pub const fn allows_transition_to(self, next: Self) -> bool {
        match self {
            Self::Waiting => matches!(
                next,
                Self::Called | Self::Serving | Self::Done | Self::Cancelled | Self::NoShow
            ),
            Self::Called => matches!(
                next,
                Self::Serving | Self::Done | Self::Cancelled | Self::NoShow
            ),
            Self::Serving => matches!(next, Self::Done | Self::Cancelled),
            Self::Done | Self::Cancelled | Self::NoShow => false,
        }
    }
}

/// Dispensing-lifecycle notification stages tracked for at-most-once dispatch
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotifyStage {
    /// Preparation acknowledged, not yet ready
    Waiting,
    /// Prepared and waiting for call-up
    Ready,
    /// Nothing to dispense for this visit
    NoItem,
}

/// Progress of a visit through the dispensing lifecycle, as recorded in the
/// tracking store
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TrackingProgress {
    /// Preparation in progress
    Waiting,
    /// Ready for pickup, waiting for call-up
    Ready,
    /// Terminal: paid, departed, or nothing to dispense
    Completed,
}

/// Slot-call stages tracked by the shadow dedup tables
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SlotStage {
    /// Called to a payment slot
    Payment,
    /// Called to a dispensing pickup slot
    Pickup,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn category_round_trips_through_strings() {
        assert_eq!(QueueCategory::Pharmacy.to_string(), "pharmacy");
        assert_eq!(
            QueueCategory::from_str("xray").unwrap(),
            QueueCategory::Xray
        );
        assert_eq!(
            serde_json::to_string(&QueueCategory::Cashier).unwrap(),
            "\"cashier\""
        );
    }

    #[test]
    fn terminal_statuses_accept_no_transition() {
        for terminal in [
            TicketStatus::Done,
            TicketStatus::Cancelled,
            TicketStatus::NoShow,
        ] {
            assert!(terminal.is_terminal());
            assert!(!terminal.allows_transition_to(TicketStatus::Waiting));
            assert!(!terminal.allows_transition_to(TicketStatus::Called));
        }
    }

    #[test]
    fn statuses_only_move_forward() {
        assert!(TicketStatus::Waiting.allows_transition_to(TicketStatus::Called));
        assert!(TicketStatus::Called.allows_transition_to(TicketStatus::Serving));
        assert!(TicketStatus::Serving.allows_transition_to(TicketStatus::Done));
        assert!(TicketStatus::Called.allows_transition_to(TicketStatus::NoShow));

        assert!(!TicketStatus::Called.allows_transition_to(TicketStatus::Waiting));
        assert!(!TicketStatus::Serving.allows_transition_to(TicketStatus::Called));
        // Same status is not a transition
        assert!(!TicketStatus::Waiting.allows_transition_to(TicketStatus::Waiting));
    }

    #[test]
    fn stage_names_match_tracking_columns() {
        assert_eq!(NotifyStage::Waiting.to_string(), "waiting");
        assert_eq!(NotifyStage::NoItem.to_string(), "no_item");
        assert_eq!(SlotStage::Payment.to_string(), "payment");
        assert_eq!(TrackingProgress::Completed.to_string(), "completed");
    }
}
