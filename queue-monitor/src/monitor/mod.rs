//! The reconciliation loop
//!
//! One long-running task, one cycle at a time: run the stage fetchers with
//! per-fetcher fault isolation, drive every returned record through the
//! reconciler, run the payment and pickup slot-call passes, close out
//! disappeared visits, then sleep for whatever the backoff policy answers.
//! Shutdown waits for the in-flight cycle to finish.

pub mod backoff;
mod reconciler;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use common_types::SlotStage;
use metrics::counter;
use push_gateway::PushChannel;
use queue_storage::day;
use queue_storage::identity::IdentityStore;
use queue_storage::tracking::{SlotCallStore, TrackingStore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use backoff::{BackoffPolicy, PollOutcome};
pub use reconciler::Reconciler;

use crate::his::{DispenseRecord, RecordSource};
use crate::identity::IdentityResolver;

/// The queue lifecycle monitor
pub struct QueueMonitor {
    source: Arc<dyn RecordSource>,
    reconciler: Reconciler,
    tracker: Arc<dyn TrackingStore>,
    slot_calls: Arc<dyn SlotCallStore>,
    backoff: BackoffPolicy,
    shutdown_token: CancellationToken,
    last_purge_day: Option<String>,
}

impl QueueMonitor {
    /// Wires the monitor together
    #[must_use]
    pub fn new(
        source: Arc<dyn RecordSource>,
        registry: Arc<dyn IdentityStore>,
        tracker: Arc<dyn TrackingStore>,
        slot_calls: Arc<dyn SlotCallStore>,
        push: Arc<dyn PushChannel>,
        backoff: BackoffPolicy,
    ) -> Self {
        let resolver = IdentityResolver::new(registry, source.clone());
        let reconciler = Reconciler::new(
            resolver,
            tracker.clone(),
            slot_calls.clone(),
            push,
        );

        Self {
            source,
            reconciler,
            tracker,
            slot_calls,
            backoff,
            shutdown_token: CancellationToken::new(),
            last_purge_day: None,
        }
    }

    /// Returns a clone of the shutdown token for external control
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Runs the polling loop until shutdown
    ///
    /// The in-flight cycle always completes; only the sleep between cycles
    /// is interruptible.
    pub async fn start(mut self) {
        info!("Queue monitor started");

        while !self.shutdown_token.is_cancelled() {
            let outcome = self.run_cycle().await;
            let sleep = self.backoff.next_sleep(outcome);
            debug!(?outcome, ?sleep, "Cycle finished");

            tokio::select! {
                () = self.shutdown_token.cancelled() => break,
                () = tokio::time::sleep(sleep) => {}
            }
        }

        info!("Queue monitor stopped");
    }

    /// Runs one full reconciliation cycle and classifies it
    pub async fn run_cycle(&mut self) -> PollOutcome {
        let service_day = day::today();
        self.purge_if_new_day(&service_day).await;

        let mut failed_fetchers = 0u32;
        let mut failed_records = 0u32;

        // Stage fetchers run independently; one failure never aborts the
        // others. Ready rows win the merge so a visit that advanced between
        // the two queries is seen in its newer stage.
        let mut merged: HashMap<String, DispenseRecord> = HashMap::new();
        let mut dispense_fetchers_ok = 0u32;

        match self.source.fetch_preparing_today().await {
            Ok(rows) => {
                dispense_fetchers_ok += 1;
                for row in rows {
                    merged.insert(row.visit_id.clone(), row);
                }
            }
            Err(e) => {
                failed_fetchers += 1;
                warn!("Preparing fetcher failed: {e}");
            }
        }

        match self.source.fetch_ready_today().await {
            Ok(rows) => {
                dispense_fetchers_ok += 1;
                for row in rows {
                    merged.insert(row.visit_id.clone(), row);
                }
            }
            Err(e) => {
                failed_fetchers += 1;
                warn!("Ready fetcher failed: {e}");
            }
        }

        let active_visits: HashSet<String> = merged.keys().cloned().collect();

        for record in merged.values() {
            if let Err(e) = self
                .reconciler
                .process_dispense_record(&service_day, record)
                .await
            {
                failed_records += 1;
                warn!(visit_id = %record.visit_id, "Record processing failed: {e:#}");
            }
        }

        // Absence-from-source only means completion when the source was
        // fully visible this cycle
        if dispense_fetchers_ok == 2 {
            match self
                .reconciler
                .mark_disappeared(&service_day, &active_visits)
                .await
            {
                Ok(closed) if closed > 0 => debug!(closed, "Closed disappeared visits"),
                Ok(_) => {}
                Err(e) => warn!("Disappeared pass failed: {e:#}"),
            }
        }

        failed_fetchers += self
            .run_slot_pass(&service_day, SlotStage::Payment, &mut failed_records)
            .await;
        failed_fetchers += self
            .run_slot_pass(&service_day, SlotStage::Pickup, &mut failed_records)
            .await;

        counter!("reconcile_cycles").increment(1);

        if failed_fetchers == 4 {
            PollOutcome::Failure
        } else if failed_fetchers > 0 || failed_records > 0 {
            PollOutcome::Partial
        } else {
            PollOutcome::Success
        }
    }

    /// Runs one slot-call pass; returns 1 when its fetcher failed
    async fn run_slot_pass(
        &self,
        service_day: &str,
        stage: SlotStage,
        failed_records: &mut u32,
    ) -> u32 {
        let calls = match stage {
            SlotStage::Payment => self.source.fetch_payment_calls_today().await,
            SlotStage::Pickup => self.source.fetch_pickup_calls_today().await,
        };

        let calls = match calls {
            Ok(calls) => calls,
            Err(e) => {
                warn!(%stage, "Slot-call fetcher failed: {e}");
                return 1;
            }
        };

        for call in &calls {
            if let Err(e) = self
                .reconciler
                .process_slot_call(service_day, stage, call)
                .await
            {
                *failed_records += 1;
                warn!(visit_id = %call.visit_id, %stage, "Slot call failed: {e:#}");
            }
        }

        0
    }

    /// Purges tracking entries for days before today, once per day
    async fn purge_if_new_day(&mut self, service_day: &str) {
        if self.last_purge_day.as_deref() == Some(service_day) {
            return;
        }

        match self.tracker.purge_before(service_day).await {
            Ok(deleted) => info!(deleted, "Purged tracking entries from previous days"),
            Err(e) => {
                warn!("Tracking purge failed: {e}");
                return; // retry next cycle
            }
        }

        match self.slot_calls.purge_before(service_day).await {
            Ok(deleted) => info!(deleted, "Purged slot calls from previous days"),
            Err(e) => {
                warn!("Slot-call purge failed: {e}");
                return;
            }
        }

        self.last_purge_day = Some(service_day.to_string());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use common_types::{NotifyStage, TrackingProgress};
    use pretty_assertions::assert_eq;
    use push_gateway::mock::MockPushChannel;
    use queue_storage::identity::{memory::MemoryIdentityStore, IdentityBinding};
    use queue_storage::tracking::memory::{MemorySlotCallStore, MemoryTrackingStore};

    use super::*;
    use crate::his::{SlotCall, SourceError, SourceResult, VisitKeys};

    #[derive(Default)]
    struct ScriptedSource {
        preparing: Mutex<Vec<DispenseRecord>>,
        ready: Mutex<Vec<DispenseRecord>>,
        payment_calls: Mutex<Vec<SlotCall>>,
        pickup_calls: Mutex<Vec<SlotCall>>,
        fail_dispense: Mutex<bool>,
        fail_everything: Mutex<bool>,
    }

    impl ScriptedSource {
        fn set_preparing(&self, rows: Vec<DispenseRecord>) {
            *self.preparing.lock().unwrap() = rows;
        }

        fn set_ready(&self, rows: Vec<DispenseRecord>) {
            *self.ready.lock().unwrap() = rows;
        }

        fn set_payment_calls(&self, calls: Vec<SlotCall>) {
            *self.payment_calls.lock().unwrap() = calls;
        }

        fn fail(&self) -> SourceError {
            SourceError::Status(503)
        }
    }

    #[async_trait]
    impl RecordSource for ScriptedSource {
        async fn fetch_preparing_today(&self) -> SourceResult<Vec<DispenseRecord>> {
            if *self.fail_everything.lock().unwrap() || *self.fail_dispense.lock().unwrap() {
                return Err(self.fail());
            }
            Ok(self.preparing.lock().unwrap().clone())
        }

        async fn fetch_ready_today(&self) -> SourceResult<Vec<DispenseRecord>> {
            if *self.fail_everything.lock().unwrap() {
                return Err(self.fail());
            }
            Ok(self.ready.lock().unwrap().clone())
        }

        async fn fetch_payment_calls_today(&self) -> SourceResult<Vec<SlotCall>> {
            if *self.fail_everything.lock().unwrap() {
                return Err(self.fail());
            }
            Ok(self.payment_calls.lock().unwrap().clone())
        }

        async fn fetch_pickup_calls_today(&self) -> SourceResult<Vec<SlotCall>> {
            if *self.fail_everything.lock().unwrap() {
                return Err(self.fail());
            }
            Ok(self.pickup_calls.lock().unwrap().clone())
        }

        async fn fetch_visit_keys(&self, _visit_id: &str) -> SourceResult<Option<VisitKeys>> {
            Ok(None)
        }
    }

    fn dispense(visit_id: &str, mrn: &str, acknowledged: bool, ready: bool) -> DispenseRecord {
        DispenseRecord {
            visit_id: visit_id.to_string(),
            mrn: Some(mrn.to_string()),
            patient_name: Some("สมชาย ใจดี".to_string()),
            clinic_name: Some("อายุรกรรม".to_string()),
            acknowledged,
            ready,
            no_item: false,
            receipt_no: None,
            departed_at: None,
        }
    }

    struct TestContext {
        source: Arc<ScriptedSource>,
        tracker: Arc<MemoryTrackingStore>,
        push: Arc<MockPushChannel>,
        monitor: QueueMonitor,
    }

    fn setup() -> TestContext {
        let source = Arc::new(ScriptedSource::default());
        let registry = Arc::new(MemoryIdentityStore::new());
        registry.insert(IdentityBinding {
            mrn: "AB1234".to_string(),
            citizen_id: None,
            channel_identity: "U123".to_string(),
            created_at: 1_700_000_000,
        });

        let tracker = Arc::new(MemoryTrackingStore::new());
        let slot_calls = Arc::new(MemorySlotCallStore::new());
        let push = Arc::new(MockPushChannel::new());

        let monitor = QueueMonitor::new(
            source.clone(),
            registry,
            tracker.clone(),
            slot_calls,
            push.clone(),
            BackoffPolicy::new(Duration::from_secs(30), 3, Duration::from_secs(300)),
        );

        TestContext {
            source,
            tracker,
            push,
            monitor,
        }
    }

    #[tokio::test]
    async fn waiting_then_ready_dispatches_each_stage_once() {
        let mut ctx = setup();
        let today = day::today();

        // Poll 1: the record is still in preparation
        ctx.source
            .set_preparing(vec![dispense("V001", "AB-1234", true, false)]);
        assert_eq!(ctx.monitor.run_cycle().await, PollOutcome::Success);
        assert_eq!(ctx.push.sent_count(), 1);

        // Poll 2: same record, now ready; the waiting flag stays set
        ctx.source.set_preparing(Vec::new());
        ctx.source
            .set_ready(vec![dispense("V001", "AB-1234", true, true)]);
        assert_eq!(ctx.monitor.run_cycle().await, PollOutcome::Success);
        assert_eq!(ctx.push.sent_count(), 2);

        let entry = ctx.tracker.get(&today, "V001").await.unwrap().unwrap();
        assert!(entry.waiting_notified);
        assert!(entry.ready_notified);
        assert_eq!(entry.progress, TrackingProgress::Ready);

        // Poll 3: nothing new to say
        assert_eq!(ctx.monitor.run_cycle().await, PollOutcome::Success);
        assert_eq!(ctx.push.sent_count(), 2);
    }

    #[tokio::test]
    async fn ready_rows_win_the_merge() {
        let mut ctx = setup();

        // The same visit shows up in both fetches mid-transition
        ctx.source
            .set_preparing(vec![dispense("V001", "AB-1234", true, false)]);
        ctx.source
            .set_ready(vec![dispense("V001", "AB-1234", true, true)]);
        ctx.monitor.run_cycle().await;

        // Only the ready notification went out
        let sends = ctx.push.sent();
        assert_eq!(sends.len(), 1);
        assert!(sends[0].1.contains("พร้อมแล้ว"));
    }

    #[tokio::test]
    async fn unresolved_identity_is_skipped_not_failed() {
        let mut ctx = setup();

        ctx.source
            .set_preparing(vec![dispense("V002", "ZZ-0000", true, false)]);
        assert_eq!(ctx.monitor.run_cycle().await, PollOutcome::Success);
        assert_eq!(ctx.push.sent_count(), 0);

        // No tracking entry was fabricated; a late registration still gets
        // this stage on a later poll
        let today = day::today();
        assert!(ctx.tracker.get(&today, "V002").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unconfirmed_send_is_retried_next_cycle() {
        let mut ctx = setup();
        let today = day::today();

        ctx.source
            .set_preparing(vec![dispense("V001", "AB-1234", true, false)]);

        ctx.push.fail_next_send();
        assert_eq!(ctx.monitor.run_cycle().await, PollOutcome::Partial);
        assert_eq!(ctx.push.sent_count(), 0);
        assert!(ctx
            .tracker
            .should_notify(&today, "V001", NotifyStage::Waiting)
            .await
            .unwrap());

        // Next poll retries and commits
        assert_eq!(ctx.monitor.run_cycle().await, PollOutcome::Success);
        assert_eq!(ctx.push.sent_count(), 1);
        assert!(!ctx
            .tracker
            .should_notify(&today, "V001", NotifyStage::Waiting)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn one_fetcher_failure_does_not_abort_the_others() {
        let mut ctx = setup();

        *ctx.source.fail_dispense.lock().unwrap() = true;
        ctx.source
            .set_ready(vec![dispense("V001", "AB-1234", true, true)]);

        assert_eq!(ctx.monitor.run_cycle().await, PollOutcome::Partial);
        // The ready record still went out despite the preparing fetcher
        // being down
        assert_eq!(ctx.push.sent_count(), 1);
    }

    #[tokio::test]
    async fn all_fetchers_down_is_a_full_failure() {
        let mut ctx = setup();

        *ctx.source.fail_everything.lock().unwrap() = true;
        assert_eq!(ctx.monitor.run_cycle().await, PollOutcome::Failure);
        assert_eq!(ctx.push.sent_count(), 0);
    }

    #[tokio::test]
    async fn disappeared_visits_are_closed_out() {
        let mut ctx = setup();
        let today = day::today();

        ctx.source
            .set_preparing(vec![dispense("V001", "AB-1234", true, false)]);
        ctx.monitor.run_cycle().await;

        // The visit vanished from both fetches (receipted at the cashier)
        ctx.source.set_preparing(Vec::new());
        ctx.monitor.run_cycle().await;

        let entry = ctx.tracker.get(&today, "V001").await.unwrap().unwrap();
        assert_eq!(entry.progress, TrackingProgress::Completed);
    }

    #[tokio::test]
    async fn disappeared_pass_is_skipped_on_partial_fetch() {
        let mut ctx = setup();
        let today = day::today();

        ctx.source
            .set_preparing(vec![dispense("V001", "AB-1234", true, false)]);
        ctx.monitor.run_cycle().await;

        // One dispensing fetcher is down; absence proves nothing
        *ctx.source.fail_dispense.lock().unwrap() = true;
        ctx.source.set_preparing(Vec::new());
        ctx.monitor.run_cycle().await;

        let entry = ctx.tracker.get(&today, "V001").await.unwrap().unwrap();
        assert_eq!(entry.progress, TrackingProgress::Waiting);
    }

    #[tokio::test]
    async fn slot_calls_dispatch_once_across_polls() {
        let mut ctx = setup();

        ctx.source.set_payment_calls(vec![SlotCall {
            visit_id: "V001".to_string(),
            mrn: Some("AB-1234".to_string()),
            slot: "3".to_string(),
        }]);

        ctx.monitor.run_cycle().await;
        ctx.monitor.run_cycle().await;
        assert_eq!(ctx.push.sent_count(), 1);
        assert!(ctx.push.sent()[0].1.contains("ชำระเงิน"));

        // A different slot is a fresh call
        ctx.source.set_payment_calls(vec![SlotCall {
            visit_id: "V001".to_string(),
            mrn: Some("AB-1234".to_string()),
            slot: "5".to_string(),
        }]);
        ctx.monitor.run_cycle().await;
        assert_eq!(ctx.push.sent_count(), 2);
    }

    #[tokio::test]
    async fn no_item_notifies_once_and_completes() {
        let mut ctx = setup();
        let today = day::today();

        let mut record = dispense("V001", "AB-1234", true, false);
        record.no_item = true;
        ctx.source.set_ready(vec![record]);

        ctx.monitor.run_cycle().await;
        ctx.monitor.run_cycle().await;

        assert_eq!(ctx.push.sent_count(), 1);
        assert!(ctx.push.sent()[0].1.contains("ไม่มียา"));

        let entry = ctx.tracker.get(&today, "V001").await.unwrap().unwrap();
        assert!(entry.no_item_notified);
        assert_eq!(entry.progress, TrackingProgress::Completed);
    }

    #[tokio::test]
    async fn receipted_rows_complete_silently() {
        let mut ctx = setup();

        let mut record = dispense("V001", "AB-1234", true, true);
        record.receipt_no = Some("R123".to_string());
        ctx.source.set_ready(vec![record]);

        assert_eq!(ctx.monitor.run_cycle().await, PollOutcome::Success);
        assert_eq!(ctx.push.sent_count(), 0);
    }
}
