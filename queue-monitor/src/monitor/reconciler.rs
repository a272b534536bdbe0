//! Per-record reconciliation pipeline
//!
//! determine stage → resolve identity → `should_notify` → dispatch →
//! `commit_notified`, in that order. The commit happens strictly after a
//! confirmed send: an unconfirmed send leaves the flag clear and the next
//! poll retries. A crash between send and commit can duplicate one
//! notification; that window is accepted, not papered over.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Context;
use common_types::{NotifyStage, SlotStage, TrackingProgress};
use metrics::counter;
use push_gateway::{messages, PushChannel};
use queue_storage::tracking::{SlotCallStore, TrackingStore};
use tracing::{debug, info, warn};

use crate::his::{DispenseRecord, SlotCall};
use crate::identity::IdentityResolver;
use crate::status::{determine_status, CompletionReason, StageOutcome};

/// Drives one record or one slot call through the dedup-and-dispatch steps
pub struct Reconciler {
    resolver: IdentityResolver,
    tracker: Arc<dyn TrackingStore>,
    slot_calls: Arc<dyn SlotCallStore>,
    push: Arc<dyn PushChannel>,
}

impl Reconciler {
    /// Creates a reconciler
    #[must_use]
    pub fn new(
        resolver: IdentityResolver,
        tracker: Arc<dyn TrackingStore>,
        slot_calls: Arc<dyn SlotCallStore>,
        push: Arc<dyn PushChannel>,
    ) -> Self {
        Self {
            resolver,
            tracker,
            slot_calls,
            push,
        }
    }

    /// Processes one dispensing record
    ///
    /// # Errors
    ///
    /// Returns an error when a store, the resolver, or the push channel
    /// fails; the caller isolates it to this record.
    pub async fn process_dispense_record(
        &self,
        service_day: &str,
        record: &DispenseRecord,
    ) -> anyhow::Result<()> {
        let visit_id = &record.visit_id;

        let (stage, progress) = match determine_status(record) {
            StageOutcome::Completed(CompletionReason::PaidOrDeparted) => {
                // Paid or departed: nothing to tell the patient, just close
                // out the tracking entry if one exists
                self.tracker
                    .set_progress(service_day, visit_id, TrackingProgress::Completed)
                    .await
                    .context("failed to record completion")?;
                return Ok(());
            }
            StageOutcome::Completed(CompletionReason::NoItem) => {
                (NotifyStage::NoItem, TrackingProgress::Completed)
            }
            StageOutcome::Ready => (NotifyStage::Ready, TrackingProgress::Ready),
            StageOutcome::Waiting => (NotifyStage::Waiting, TrackingProgress::Waiting),
        };

        if !self
            .tracker
            .should_notify(service_day, visit_id, stage)
            .await
            .context("failed to read tracking flags")?
        {
            // Already notified for this stage; keep the progress current
            self.tracker
                .set_progress(service_day, visit_id, progress)
                .await
                .context("failed to update progress")?;
            return Ok(());
        }

        let Some(channel_identity) = self
            .resolver
            .resolve(visit_id, record.mrn.as_deref())
            .await
            .context("identity resolution failed")?
        else {
            debug!(%visit_id, "No LINE registration for this visit, skipping");
            return Ok(());
        };

        let text = match stage {
            NotifyStage::Waiting => messages::preparing(
                visit_id,
                record.patient_name.as_deref(),
                record.clinic_name.as_deref(),
            ),
            NotifyStage::Ready => messages::ready(
                visit_id,
                record.patient_name.as_deref(),
                record.clinic_name.as_deref(),
            ),
            NotifyStage::NoItem => messages::no_item(visit_id, record.patient_name.as_deref()),
        };

        if let Err(e) = self.push.send(&channel_identity, &text).await {
            counter!("notification_failed").increment(1);
            // Unconfirmed: leave the flag clear so the next poll retries
            return Err(e).context("dispatch unconfirmed");
        }

        self.tracker
            .commit_notified(service_day, visit_id, stage, &channel_identity, progress)
            .await
            .context("failed to commit notification flag")?;

        counter!("notification_delivered").increment(1);
        info!(%visit_id, %stage, "Dispensing notification dispatched");
        Ok(())
    }

    /// Processes one payment or pickup slot call
    ///
    /// # Errors
    ///
    /// Returns an error when a store, the resolver, or the push channel
    /// fails; the caller isolates it to this call.
    pub async fn process_slot_call(
        &self,
        service_day: &str,
        stage: SlotStage,
        call: &SlotCall,
    ) -> anyhow::Result<()> {
        let visit_id = &call.visit_id;

        if self
            .slot_calls
            .already_called(service_day, stage, visit_id, &call.slot)
            .await
            .context("failed to read slot-call dedup")?
        {
            return Ok(());
        }

        let Some(channel_identity) = self
            .resolver
            .resolve(visit_id, call.mrn.as_deref())
            .await
            .context("identity resolution failed")?
        else {
            debug!(%visit_id, "No LINE registration for this visit, skipping");
            return Ok(());
        };

        let text = match stage {
            SlotStage::Payment => messages::payment_call(visit_id, &call.slot),
            SlotStage::Pickup => messages::pickup_call(visit_id, &call.slot),
        };

        if let Err(e) = self.push.send(&channel_identity, &text).await {
            counter!("notification_failed").increment(1);
            return Err(e).context("dispatch unconfirmed");
        }

        self.slot_calls
            .record_called(service_day, stage, visit_id, &call.slot, &channel_identity)
            .await
            .context("failed to record slot call")?;

        counter!("notification_delivered").increment(1);
        info!(%visit_id, %stage, slot = %call.slot, "Slot call dispatched");
        Ok(())
    }

    /// Closes out tracking entries whose visits vanished from the active
    /// fetch set
    ///
    /// For the dispensing stages, absence from the source means the visit
    /// was receipted or departed. Only called when every dispensing fetcher
    /// succeeded — a partial fetch must not fabricate completions.
    ///
    /// # Errors
    ///
    /// Returns an error when the tracking store fails.
    pub async fn mark_disappeared(
        &self,
        service_day: &str,
        active_visits: &HashSet<String>,
    ) -> anyhow::Result<u64> {
        let mut closed = 0u64;

        for entry in self
            .tracker
            .list_for_day(service_day)
            .await
            .context("failed to list tracking entries")?
        {
            if entry.progress == TrackingProgress::Completed
                || active_visits.contains(&entry.visit_id)
            {
                continue;
            }

            if let Err(e) = self
                .tracker
                .set_progress(service_day, &entry.visit_id, TrackingProgress::Completed)
                .await
            {
                warn!(visit_id = %entry.visit_id, "Failed to close out entry: {e}");
                continue;
            }

            info!(
                visit_id = %entry.visit_id,
                "Visit left the active set, closing tracking entry"
            );
            closed += 1;
        }

        Ok(closed)
    }
}
