//! Notification dedup tracking using DynamoDB
//!
//! One item per `(service_day, visit_id)` carries a flag per notification
//! stage; a stage is dispatched at most once while its flag is set. Flags
//! reset only when the item is purged — by the daily cleanup for days before
//! today, with a TTL attribute past end-of-day as a backstop.
//!
//! Slot calls (payment, pickup) use a structurally identical shadow table
//! keyed by `(service_day, stage, visit_id, slot)`.

mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_dynamodb::{error::SdkError, types::AttributeValue, Client as DynamoDbClient};
use chrono::Utc;
use rand::Rng;
use common_types::{NotifyStage, SlotStage, TrackingProgress};
use serde::{Deserialize, Serialize};
use strum::Display;

pub use error::{TrackingError, TrackingResult};

use crate::day;

/// Randomized spread added to end-of-day TTLs, in seconds
const TTL_JITTER_SECS: u64 = 3 * 3600;

/// Attribute names for the queue tracking table
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum TrackingAttribute {
    /// Service day (Partition Key)
    ServiceDay,
    /// Visit number (Sort Key)
    VisitId,
    /// LINE user id resolved for this visit
    ChannelIdentity,
    /// Lifecycle progress
    Progress,
    /// Waiting-stage flag
    WaitingNotified,
    /// Ready-stage flag
    ReadyNotified,
    /// No-item flag
    NoItemNotified,
    /// Created At
    CreatedAt,
    /// Updated At
    UpdatedAt,
    /// TTL timestamp
    Ttl,
}

/// Dedup bookkeeping for one visit on one service day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueTracking {
    /// Service day (Partition Key)
    pub service_day: String,
    /// Visit number (Sort Key)
    pub visit_id: String,
    /// LINE user id resolved for this visit
    pub channel_identity: String,
    /// Lifecycle progress as of the last reconciliation pass
    pub progress: TrackingProgress,
    /// Whether the waiting notification went out
    pub waiting_notified: bool,
    /// Whether the ready notification went out
    pub ready_notified: bool,
    /// Whether the no-item notification went out
    pub no_item_notified: bool,
    /// Created At
    pub created_at: i64,
    /// Updated At
    pub updated_at: i64,
    /// TTL timestamp
    pub ttl: i64,
}

impl QueueTracking {
    /// Whether the flag for `stage` is already set
    #[must_use]
    pub const fn notified(&self, stage: NotifyStage) -> bool {
        match stage {
            NotifyStage::Waiting => self.waiting_notified,
            NotifyStage::Ready => self.ready_notified,
            NotifyStage::NoItem => self.no_item_notified,
        }
    }
}

/// Dedup seam for dispensing-stage notifications
#[async_trait]
pub trait TrackingStore: Send + Sync {
    /// Reads the tracking entry for one visit
    async fn get(&self, service_day: &str, visit_id: &str)
        -> TrackingResult<Option<QueueTracking>>;

    /// Whether a notification for `stage` may still be dispatched
    async fn should_notify(
        &self,
        service_day: &str,
        visit_id: &str,
        stage: NotifyStage,
    ) -> TrackingResult<bool>;

    /// Sets the flag for `stage`, creating the entry if absent
    ///
    /// Callers invoke this only after a confirmed send.
    async fn commit_notified(
        &self,
        service_day: &str,
        visit_id: &str,
        stage: NotifyStage,
        channel_identity: &str,
        progress: TrackingProgress,
    ) -> TrackingResult<()>;

    /// Records lifecycle progress without touching any flag
    async fn set_progress(
        &self,
        service_day: &str,
        visit_id: &str,
        progress: TrackingProgress,
    ) -> TrackingResult<()>;

    /// All tracking entries for one service day
    async fn list_for_day(&self, service_day: &str) -> TrackingResult<Vec<QueueTracking>>;

    /// Deletes entries for service days before `service_day`
    async fn purge_before(&self, service_day: &str) -> TrackingResult<u64>;
}

/// Dedup seam for slot calls (payment, pickup)
#[async_trait]
pub trait SlotCallStore: Send + Sync {
    /// Whether this `(visit, slot)` was already called for `stage` today
    async fn already_called(
        &self,
        service_day: &str,
        stage: SlotStage,
        visit_id: &str,
        slot: &str,
    ) -> TrackingResult<bool>;

    /// Records a confirmed slot-call dispatch
    async fn record_called(
        &self,
        service_day: &str,
        stage: SlotStage,
        visit_id: &str,
        slot: &str,
        channel_identity: &str,
    ) -> TrackingResult<()>;

    /// Deletes entries for service days before `service_day`
    async fn purge_before(&self, service_day: &str) -> TrackingResult<u64>;
}

/// Queue tracking client for DynamoDB operations
pub struct DynamoTrackingStore {
    dynamodb_client: Arc<DynamoDbClient>,
    table_name: String,
}

impl DynamoTrackingStore {
    /// Creates a new tracking storage client
    #[must_use]
    pub const fn new(dynamodb_client: Arc<DynamoDbClient>, table_name: String) -> Self {
        Self {
            dynamodb_client,
            table_name,
        }
    }

    fn stage_attribute(stage: NotifyStage) -> TrackingAttribute {
        match stage {
            NotifyStage::Waiting => TrackingAttribute::WaitingNotified,
            NotifyStage::Ready => TrackingAttribute::ReadyNotified,
            NotifyStage::NoItem => TrackingAttribute::NoItemNotified,
        }
    }
}

#[async_trait]
impl TrackingStore for DynamoTrackingStore {
    async fn get(
        &self,
        service_day: &str,
        visit_id: &str,
    ) -> TrackingResult<Option<QueueTracking>> {
        let response = self
            .dynamodb_client
            .get_item()
            .table_name(&self.table_name)
            .key(
                TrackingAttribute::ServiceDay.to_string(),
                AttributeValue::S(service_day.to_string()),
            )
            .key(
                TrackingAttribute::VisitId.to_string(),
                AttributeValue::S(visit_id.to_string()),
            )
            .send()
            .await?;

        let entry = response
            .item()
            .map(|item| serde_dynamo::from_item(item.clone()))
            .transpose()
            .map_err(|e| TrackingError::SerializationError(e.to_string()))?;

        Ok(entry)
    }

    async fn should_notify(
        &self,
        service_day: &str,
        visit_id: &str,
        stage: NotifyStage,
    ) -> TrackingResult<bool> {
        let entry = self.get(service_day, visit_id).await?;
        Ok(entry.is_none_or(|e| !e.notified(stage)))
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
        let ttl = day::expiry_after_midnight(rand::thread_rng().gen_range(0..TTL_JITTER_SECS));

        // The target flag is set outright; only the two other flags get
        // if_not_exists defaults (the same path may not appear twice in one
        // update expression)
        let other_flags: Vec<TrackingAttribute> = [
            TrackingAttribute::WaitingNotified,
            TrackingAttribute::ReadyNotified,
            TrackingAttribute::NoItemNotified,
        ]
        .into_iter()
        .filter(|attr| *attr != Self::stage_attribute(stage))
        .collect();

        self.dynamodb_client
            .update_item()
            .table_name(&self.table_name)
            .key(
                TrackingAttribute::ServiceDay.to_string(),
                AttributeValue::S(service_day.to_string()),
            )
            .key(
                TrackingAttribute::VisitId.to_string(),
                AttributeValue::S(visit_id.to_string()),
            )
            .update_expression(
                "SET #flag = :true, #cid = :cid, #progress = :progress, \
                 #updated_at = :now, #created_at = if_not_exists(#created_at, :now), \
                 #other_a = if_not_exists(#other_a, :false), \
                 #other_b = if_not_exists(#other_b, :false), \
                 #ttl = if_not_exists(#ttl, :ttl)",
            )
            .expression_attribute_names("#flag", Self::stage_attribute(stage).to_string())
            .expression_attribute_names("#cid", TrackingAttribute::ChannelIdentity.to_string())
            .expression_attribute_names("#progress", TrackingAttribute::Progress.to_string())
            .expression_attribute_names("#updated_at", TrackingAttribute::UpdatedAt.to_string())
            .expression_attribute_names("#created_at", TrackingAttribute::CreatedAt.to_string())
            .expression_attribute_names("#other_a", other_flags[0].to_string())
            .expression_attribute_names("#other_b", other_flags[1].to_string())
            .expression_attribute_names("#ttl", TrackingAttribute::Ttl.to_string())
            .expression_attribute_values(":true", AttributeValue::Bool(true))
            .expression_attribute_values(":false", AttributeValue::Bool(false))
            .expression_attribute_values(
                ":cid",
                AttributeValue::S(channel_identity.to_string()),
            )
            .expression_attribute_values(":progress", AttributeValue::S(progress.to_string()))
            .expression_attribute_values(":now", AttributeValue::N(now.to_string()))
            .expression_attribute_values(":ttl", AttributeValue::N(ttl.to_string()))
            .send()
            .await?;

        Ok(())
    }

    async fn set_progress(
        &self,
        service_day: &str,
        visit_id: &str,
        progress: TrackingProgress,
    ) -> TrackingResult<()> {
        let now = Utc::now().timestamp();

        self.dynamodb_client
            .update_item()
            .table_name(&self.table_name)
            .key(
                TrackingAttribute::ServiceDay.to_string(),
                AttributeValue::S(service_day.to_string()),
            )
            .key(
                TrackingAttribute::VisitId.to_string(),
                AttributeValue::S(visit_id.to_string()),
            )
            .update_expression("SET #progress = :progress, #updated_at = :now")
            // Progress only ever annotates an entry a dispatch created;
            // never materialize a flagless item here
            .condition_expression("attribute_exists(#day)")
            .expression_attribute_names("#day", TrackingAttribute::ServiceDay.to_string())
            .expression_attribute_names("#progress", TrackingAttribute::Progress.to_string())
            .expression_attribute_names("#updated_at", TrackingAttribute::UpdatedAt.to_string())
            .expression_attribute_values(":progress", AttributeValue::S(progress.to_string()))
            .expression_attribute_values(":now", AttributeValue::N(now.to_string()))
            .send()
            .await
            .map(|_| ())
            .or_else(|err| {
                if matches!(
                    err,
                    SdkError::ServiceError(ref svc) if svc.err().is_conditional_check_failed_exception()
                ) {
                    Ok(())
                } else {
                    Err(TrackingError::from(err))
                }
            })
    }

    async fn list_for_day(&self, service_day: &str) -> TrackingResult<Vec<QueueTracking>> {
        let response = self
            .dynamodb_client
            .query()
            .table_name(&self.table_name)
            .key_condition_expression("#day = :day")
            .expression_attribute_names("#day", TrackingAttribute::ServiceDay.to_string())
            .expression_attribute_values(":day", AttributeValue::S(service_day.to_string()))
            .send()
            .await?;

        response
            .items()
            .iter()
            .map(|item| {
                serde_dynamo::from_item(item.clone())
                    .map_err(|e| TrackingError::SerializationError(e.to_string()))
            })
            .collect()
    }

    async fn purge_before(&self, service_day: &str) -> TrackingResult<u64> {
        purge_scan(
            &self.dynamodb_client,
            &self.table_name,
            service_day,
            &TrackingAttribute::ServiceDay.to_string(),
            &TrackingAttribute::VisitId.to_string(),
        )
        .await
    }
}

/// Attribute names for the slot call table
#[derive(Debug, Clone, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SlotCallAttribute {
    /// `{service_day}#{stage}` (Partition Key)
    DayStage,
    /// `{visit_id}#{slot}` (Sort Key)
    CallKey,
    /// Service day, duplicated for purge scans
    ServiceDay,
}

/// Slot call dedup client for DynamoDB operations
pub struct DynamoSlotCallStore {
    dynamodb_client: Arc<DynamoDbClient>,
    table_name: String,
}

impl DynamoSlotCallStore {
    /// Creates a new slot call storage client
    #[must_use]
    pub const fn new(dynamodb_client: Arc<DynamoDbClient>, table_name: String) -> Self {
        Self {
            dynamodb_client,
            table_name,
        }
    }

    fn day_stage(service_day: &str, stage: SlotStage) -> String {
        format!("{service_day}#{stage}")
    }

    fn call_key(visit_id: &str, slot: &str) -> String {
        format!("{visit_id}#{slot}")
    }
}

#[async_trait]
impl SlotCallStore for DynamoSlotCallStore {
    async fn already_called(
        &self,
        service_day: &str,
        stage: SlotStage,
        visit_id: &str,
        slot: &str,
    ) -> TrackingResult<bool> {
        let response = self
            .dynamodb_client
            .get_item()
            .table_name(&self.table_name)
            .key(
                SlotCallAttribute::DayStage.to_string(),
                AttributeValue::S(Self::day_stage(service_day, stage)),
            )
            .key(
                SlotCallAttribute::CallKey.to_string(),
                AttributeValue::S(Self::call_key(visit_id, slot)),
            )
            .projection_expression(SlotCallAttribute::CallKey.to_string())
            .send()
            .await?;

        Ok(response.item().is_some())
    }

    async fn record_called(
        &self,
        service_day: &str,
        stage: SlotStage,
        visit_id: &str,
        slot: &str,
        channel_identity: &str,
    ) -> TrackingResult<()> {
        let now = Utc::now().timestamp();
        let ttl = day::expiry_after_midnight(rand::thread_rng().gen_range(0..TTL_JITTER_SECS));

        self.dynamodb_client
            .put_item()
            .table_name(&self.table_name)
            .item(
                SlotCallAttribute::DayStage.to_string(),
                AttributeValue::S(Self::day_stage(service_day, stage)),
            )
            .item(
                SlotCallAttribute::CallKey.to_string(),
                AttributeValue::S(Self::call_key(visit_id, slot)),
            )
            .item(
                SlotCallAttribute::ServiceDay.to_string(),
                AttributeValue::S(service_day.to_string()),
            )
            .item(
                "channel_identity",
                AttributeValue::S(channel_identity.to_string()),
            )
            .item("created_at", AttributeValue::N(now.to_string()))
            .item("ttl", AttributeValue::N(ttl.to_string()))
            .send()
            .await?;

        Ok(())
    }

    async fn purge_before(&self, service_day: &str) -> TrackingResult<u64> {
        purge_scan(
            &self.dynamodb_client,
            &self.table_name,
            service_day,
            &SlotCallAttribute::DayStage.to_string(),
            &SlotCallAttribute::CallKey.to_string(),
        )
        .await
    }
}

/// Scans for items whose `service_day` sorts before `before_day` and deletes
/// them by primary key
async fn purge_scan(
    client: &DynamoDbClient,
    table_name: &str,
    before_day: &str,
    pk_name: &str,
    sk_name: &str,
) -> TrackingResult<u64> {
    let mut deleted = 0u64;
    let mut last_key: Option<std::collections::HashMap<String, AttributeValue>> = None;

    loop {
        let response = client
            .scan()
            .table_name(table_name)
            .filter_expression("#day < :day")
            .expression_attribute_names("#day", "service_day")
            .expression_attribute_values(":day", AttributeValue::S(before_day.to_string()))
            .set_exclusive_start_key(last_key.take())
            .send()
            .await?;

        for item in response.items() {
            let (Some(pk), Some(sk)) = (item.get(pk_name), item.get(sk_name)) else {
                continue;
            };

            client
                .delete_item()
                .table_name(table_name)
                .key(pk_name, pk.clone())
                .key(sk_name, sk.clone())
                .send()
                .await?;
            deleted += 1;
        }

        match response.last_evaluated_key() {
            Some(key) if !key.is_empty() => last_key = Some(key.clone()),
            _ => break,
        }
    }

    Ok(deleted)
}
