//! Row projections returned by the HIS facade
//!
//! Transient by design: each row is consumed within one reconciliation pass
//! and never persisted verbatim.

use serde::Deserialize;

/// One dispensing row for one visit
#[derive(Debug, Clone, Deserialize)]
pub struct DispenseRecord {
    /// Visit number
    pub visit_id: String,
    /// Medical-record number, when the facade projects it
    pub mrn: Option<String>,
    /// Patient display name
    pub patient_name: Option<String>,
    /// Clinic that issued the prescription
    pub clinic_name: Option<String>,
    /// Preparation acknowledged by the dispensary
    #[serde(default)]
    pub acknowledged: bool,
    /// Preparation finished
    #[serde(default)]
    pub ready: bool,
    /// Explicitly marked as having nothing to dispense
    #[serde(default)]
    pub no_item: bool,
    /// Payment receipt number, once issued
    pub receipt_no: Option<String>,
    /// Departure timestamp (unix seconds), once the visit left
    pub departed_at: Option<i64>,
}

/// One slot call row (payment or pickup counter)
#[derive(Debug, Clone, Deserialize)]
pub struct SlotCall {
    /// Visit number
    pub visit_id: String,
    /// Medical-record number, when the source row carries it
    pub mrn: Option<String>,
    /// Counter slot the visit is called to
    pub slot: String,
}

/// Secondary keys of one visit, for identity resolution
#[derive(Debug, Clone, Deserialize)]
pub struct VisitKeys {
    /// Visit number
    pub visit_id: String,
    /// Medical-record number
    pub mrn: Option<String>,
    /// National citizen id
    pub citizen_id: Option<String>,
}
