//! In-memory tracking stores for tests

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use common_types::{NotifyStage, SlotStage, TrackingProgress};

use super::{QueueTracking, SlotCallStore, TrackingResult, TrackingStore};

/// In-memory queue tracking store
#[derive(Default)]
pub struct MemoryTrackingStore {
    entries: Mutex<HashMap<(String, String), QueueTracking>>,
}

impl MemoryTrackingStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TrackingStore for MemoryTrackingStore {
    async fn get(
        &self,
        service_day: &str,
        visit_id: &str,
    ) -> TrackingResult<Option<QueueTracking>> {
        let key = (service_day.to_string(), visit_id.to_string());
        Ok(self.entries.lock().unwrap().get(&key).cloned())
    }

    async fn should_notify(
        &self,
        service_day: &str,
        visit_id: &str,
        stage: NotifyStage,
    ) -> TrackingResult<bool> {
        Ok(self
            .get(service_day, visit_id)
            .await?
            .is_none_or(|e| !e.notified(stage)))
    }

    async fn commit_notified(
        &self,
        service_day: &str,
        visit_id: &str,
        stage: NotifyStage,
        channel_identity: &str,
        progress: TrackingProgress,
    ) -> TrackingResult<()> {
        let now = Utc::now().timestamp();
        let key = (service_day.to_string(), visit_id.to_string());
        let mut entries = self.entries.lock().unwrap();
        let entry = entries.entry(key).or_insert_with(|| QueueTracking {
            service_day: service_day.to_string(),
            visit_id: visit_id.to_string(),
            channel_identity: channel_identity.to_string(),
            progress,
            waiting_notified: false,
            ready_notified: false,
            no_item_notified: false,
            created_at: now,
            updated_at: now,
            ttl: now + 86_400,
        });

        match stage {
            NotifyStage::Waiting => entry.waiting_notified = true,
            NotifyStage::Ready => entry.ready_notified = true,
            NotifyStage::NoItem => entry.no_item_notified = true,
        }
        entry.channel_identity = channel_identity.to_string();
        entry.progress = progress;
        entry.updated_at = now;
        Ok(())
    }

    async fn set_progress(
        &self,
        service_day: &str,
        visit_id: &str,
        progress: TrackingProgress,
    ) -> TrackingResult<()> {
        let key = (service_day.to_string(), visit_id.to_string());
        if let Some(entry) = self.entries.lock().unwrap().get_mut(&key) {
            entry.progress = progress;
            entry.updated_at = Utc::now().timestamp();
        }
        Ok(())
    }

    async fn list_for_day(&self, service_day: &str) -> TrackingResult<Vec<QueueTracking>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .values()
            .filter(|e| e.service_day == service_day)
            .cloned()
            .collect())
    }

    async fn purge_before(&self, service_day: &str) -> TrackingResult<u64> {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|(day, _), _| day.as_str() >= service_day);
        Ok((before - entries.len()) as u64)
    }
}

/// In-memory slot call store
#[derive(Default)]
pub struct MemorySlotCallStore {
    calls: Mutex<HashSet<(String, SlotStage, String, String)>>,
}

impl MemorySlotCallStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SlotCallStore for MemorySlotCallStore {
    async fn already_called(
        &self,
        service_day: &str,
        stage: SlotStage,
        visit_id: &str,
        slot: &str,
    ) -> TrackingResult<bool> {
        Ok(self.calls.lock().unwrap().contains(&(
            service_day.to_string(),
            stage,
            visit_id.to_string(),
            slot.to_string(),
        )))
    }

    async fn record_called(
        &self,
        service_day: &str,
        stage: SlotStage,
        visit_id: &str,
        slot: &str,
        _channel_identity: &str,
    ) -> TrackingResult<()> {
        self.calls.lock().unwrap().insert((
            service_day.to_string(),
            stage,
            visit_id.to_string(),
            slot.to_string(),
        ));
        Ok(())
    }

    async fn purge_before(&self, service_day: &str) -> TrackingResult<u64> {
        let mut calls = self.calls.lock().unwrap();
        let before = calls.len();
        calls.retain(|(day, ..)| day.as_str() >= service_day);
        Ok((before - calls.len()) as u64)
    }
}
