//! Ticket records and audit history using DynamoDB
//!
//! The current row for a ticket is overwritten in place; every mutation also
//! archives a full snapshot into a history table that is never deleted. The
//! FIFO list in the atomic store is the operation of record for ordering —
//! ticket rows are derived from it.

mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_dynamodb::{types::AttributeValue, Client as DynamoDbClient};
use common_types::{QueueCategory, TicketStatus};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::Display;

pub use error::{TicketStoreError, TicketStoreResult};

/// Attribute names for the ticket table
#[derive(Debug, Clone, Display)]
#[strum(serialize_all = "snake_case")]
pub enum TicketAttribute {
    /// Service day (Partition Key)
    ServiceDay,
    /// `{category}#{visit_id}` (Sort Key)
    TicketId,
    /// Ticket status
    Status,
    /// TTL timestamp
    Ttl,
}

/// One ticket in a category's waiting line
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Ticket {
    /// Service day (Partition Key)
    pub service_day: String,
    /// `{category}#{visit_id}` (Sort Key)
    pub ticket_id: String,
    /// Visit number in the hospital system-of-record
    pub visit_id: String,
    /// Waiting line this ticket belongs to
    pub category: QueueCategory,
    /// Number issued by the per-category, per-day counter
    pub ticket_number: i64,
    /// Patient display name
    pub display_name: String,
    /// LINE user id to notify
    pub channel_identity: String,
    /// Lifecycle state
    pub status: TicketStatus,
    /// Counter that called this ticket, once called
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counter_no: Option<String>,
    /// Staff member who called this ticket, once called
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staff_name: Option<String>,
    /// Reason recorded on cancellation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_reason: Option<String>,
    /// Creation time (unix seconds)
    pub created_at: i64,
    /// Call-up time (unix seconds), once called
    #[serde(skip_serializing_if = "Option::is_none")]
    pub called_at: Option<i64>,
    /// Last mutation time (unix seconds)
    pub updated_at: i64,
    /// TTL timestamp for the current row (history rows carry none)
    pub ttl: i64,
}

impl Ticket {
    /// Builds the sort key for a `(category, visit_id)` pair
    #[must_use]
    pub fn ticket_id_for(category: QueueCategory, visit_id: &str) -> String {
        format!("{category}#{visit_id}")
    }
}

/// Persistence seam for ticket rows and their audit history
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Overwrites the current row for this ticket
    async fn save(&self, ticket: &Ticket) -> TicketStoreResult<()>;

    /// Appends an immutable snapshot of this ticket to the history table
    async fn archive(&self, ticket: &Ticket) -> TicketStoreResult<()>;

    /// Reads the current row for `(service_day, category, visit_id)`
    async fn get(
        &self,
        service_day: &str,
        category: QueueCategory,
        visit_id: &str,
    ) -> TicketStoreResult<Option<Ticket>>;

    /// Lists a category's tickets for one day, optionally filtered by status,
    /// ordered by ticket number
    async fn list_by_category(
        &self,
        service_day: &str,
        category: QueueCategory,
        status: Option<TicketStatus>,
    ) -> TicketStoreResult<Vec<Ticket>>;
}

/// Ticket storage client for DynamoDB operations
pub struct DynamoTicketStore {
    dynamodb_client: Arc<DynamoDbClient>,
    table_name: String,
    history_table_name: String,
}

impl DynamoTicketStore {
    /// Creates a new ticket storage client
    ///
    /// # Arguments
    ///
    /// * `dynamodb_client` - Pre-configured DynamoDB client
    /// * `table_name` - Table holding the current row per ticket
    /// * `history_table_name` - Append-only audit history table
    #[must_use]
    pub const fn new(
        dynamodb_client: Arc<DynamoDbClient>,
        table_name: String,
        history_table_name: String,
    ) -> Self {
        Self {
            dynamodb_client,
            table_name,
            history_table_name,
        }
    }
}

#[async_trait]
impl TicketStore for DynamoTicketStore {
    async fn save(&self, ticket: &Ticket) -> TicketStoreResult<()> {
        let item = serde_dynamo::to_item(ticket)
            .map_err(|e| TicketStoreError::SerializationError(e.to_string()))?;

        self.dynamodb_client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .send()
            .await?;

        Ok(())
    }

    async fn archive(&self, ticket: &Ticket) -> TicketStoreResult<()> {
        let mut item: std::collections::HashMap<String, AttributeValue> =
            serde_dynamo::to_item(ticket)
                .map_err(|e| TicketStoreError::SerializationError(e.to_string()))?;

        // History rows are keyed by revision time so snapshots never collide
        item.insert(
            "revision_key".to_string(),
            AttributeValue::S(format!(
                "{}#{}",
                ticket.service_day,
                Ticket::ticket_id_for(ticket.category, &ticket.visit_id)
            )),
        );
        item.insert(
            "revision_at".to_string(),
            AttributeValue::N(ticket.updated_at.to_string()),
        );
        item.remove(&TicketAttribute::Ttl.to_string());

        self.dynamodb_client
            .put_item()
            .table_name(&self.history_table_name)
            .set_item(Some(item))
            .send()
            .await?;

        Ok(())
    }

    async fn get(
        &self,
        service_day: &str,
        category: QueueCategory,
        visit_id: &str,
    ) -> TicketStoreResult<Option<Ticket>> {
        let response = self
            .dynamodb_client
            .get_item()
            .table_name(&self.table_name)
            .key(
                TicketAttribute::ServiceDay.to_string(),
                AttributeValue::S(service_day.to_string()),
            )
            .key(
                TicketAttribute::TicketId.to_string(),
                AttributeValue::S(Ticket::ticket_id_for(category, visit_id)),
            )
            .send()
            .await?;

        let ticket = response
            .item()
            .map(|item| serde_dynamo::from_item(item.clone()))
            .transpose()
            .map_err(|e| TicketStoreError::SerializationError(e.to_string()))?;

        Ok(ticket)
    }

    async fn list_by_category(
        &self,
        service_day: &str,
        category: QueueCategory,
        status: Option<TicketStatus>,
    ) -> TicketStoreResult<Vec<Ticket>> {
        let mut query = self
            .dynamodb_client
            .query()
            .table_name(&self.table_name)
            .key_condition_expression("#day = :day AND begins_with(#tid, :prefix)")
            .expression_attribute_names("#day", TicketAttribute::ServiceDay.to_string())
            .expression_attribute_names("#tid", TicketAttribute::TicketId.to_string())
            .expression_attribute_values(":day", AttributeValue::S(service_day.to_string()))
            .expression_attribute_values(":prefix", AttributeValue::S(format!("{category}#")));

        if let Some(status) = status {
            query = query
                .filter_expression("#status = :status")
                .expression_attribute_names("#status", TicketAttribute::Status.to_string())
                .expression_attribute_values(":status", AttributeValue::S(status.to_string()));
        }

        let response = query.send().await?;

        let mut tickets = response
            .items()
            .iter()
            .map(|item| {
                serde_dynamo::from_item(item.clone())
                    .map_err(|e| TicketStoreError::SerializationError(e.to_string()))
            })
            .collect::<TicketStoreResult<Vec<Ticket>>>()?;

        tickets.sort_by_key(|t| t.ticket_number);
        Ok(tickets)
    }
}
