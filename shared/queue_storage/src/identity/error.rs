//! Error types for identity registry operations

use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::{get_item::GetItemError, query::QueryError};
use thiserror::Error;

/// Result type for identity registry operations
pub type IdentityStoreResult<T> = Result<T, IdentityStoreError>;

/// Errors that can occur during identity registry operations
#[derive(Error, Debug)]
pub enum IdentityStoreError {
    /// Failed to read a binding from DynamoDB
    #[error("Failed to get identity binding from DynamoDB: {0}")]
    DynamoDbGetError(#[from] SdkError<GetItemError>),

    /// Failed to query bindings from DynamoDB
    #[error("Failed to query identity bindings from DynamoDB: {0}")]
    DynamoDbQueryError(#[from] SdkError<QueryError>),

    /// Serialization error for `serde_dynamo`
    #[error("Serialization error: {0}")]
    SerializationError(String),
}
