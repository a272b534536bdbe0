//! LINE identity registry using DynamoDB
//!
//! Written by the registration workflow (outside this system's core), read
//! by the identity resolver. Point lookups by medical-record number
//! (partition key) and by citizen id (GSI).

mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_dynamodb::{types::AttributeValue, Client as DynamoDbClient};
use serde::{Deserialize, Serialize};
use strum::Display;

pub use error::{IdentityStoreError, IdentityStoreResult};

/// Attribute names for the identity registry table
#[derive(Debug, Clone, Display)]
#[strum(serialize_all = "snake_case")]
pub enum IdentityAttribute {
    /// Medical-record number (Primary Key)
    Mrn,
    /// Citizen id (Global Secondary Index)
    CitizenId,
}

/// One registered patient-to-LINE binding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityBinding {
    /// Medical-record number (Primary Key)
    pub mrn: String,
    /// Citizen id (Global Secondary Index), when captured at registration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citizen_id: Option<String>,
    /// LINE user id to push to
    pub channel_identity: String,
    /// Registration time (unix seconds)
    pub created_at: i64,
}

/// Lookup seam over the identity registry
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Exact lookup by medical-record number
    async fn get_by_mrn(&self, mrn: &str) -> IdentityStoreResult<Option<IdentityBinding>>;

    /// Lookup by citizen id via the GSI
    async fn get_by_citizen_id(
        &self,
        citizen_id: &str,
    ) -> IdentityStoreResult<Option<IdentityBinding>>;
}

/// Identity registry client for DynamoDB operations
pub struct DynamoIdentityStore {
    dynamodb_client: Arc<DynamoDbClient>,
    table_name: String,
    gsi_name: String,
}

impl DynamoIdentityStore {
    /// Creates a new identity registry client
    ///
    /// # Arguments
    ///
    /// * `dynamodb_client` - Pre-configured DynamoDB client
    /// * `table_name` - DynamoDB table name for identity bindings
    /// * `gsi_name` - Global Secondary Index name for citizen-id queries
    #[must_use]
    pub const fn new(
        dynamodb_client: Arc<DynamoDbClient>,
        table_name: String,
        gsi_name: String,
    ) -> Self {
        Self {
            dynamodb_client,
            table_name,
            gsi_name,
        }
    }
}

#[async_trait]
impl IdentityStore for DynamoIdentityStore {
    async fn get_by_mrn(&self, mrn: &str) -> IdentityStoreResult<Option<IdentityBinding>> {
        let response = self
            .dynamodb_client
            .get_item()
            .table_name(&self.table_name)
            .key(
                IdentityAttribute::Mrn.to_string(),
                AttributeValue::S(mrn.to_string()),
            )
            .send()
            .await?;

        let binding = response
            .item()
            .map(|item| serde_dynamo::from_item(item.clone()))
            .transpose()
            .map_err(|e| IdentityStoreError::SerializationError(e.to_string()))?;

        Ok(binding)
    }

    async fn get_by_citizen_id(
        &self,
        citizen_id: &str,
    ) -> IdentityStoreResult<Option<IdentityBinding>> {
        let response = self
            .dynamodb_client
            .query()
            .table_name(&self.table_name)
            .index_name(&self.gsi_name)
            .key_condition_expression("#cid = :cid")
            .expression_attribute_names("#cid", IdentityAttribute::CitizenId.to_string())
            .expression_attribute_values(":cid", AttributeValue::S(citizen_id.to_string()))
            .limit(1)
            .send()
            .await?;

        let binding = response
            .items()
            .first()
            .map(|item| serde_dynamo::from_item(item.clone()))
            .transpose()
            .map_err(|e| IdentityStoreError::SerializationError(e.to_string()))?;

        Ok(binding)
    }
}
