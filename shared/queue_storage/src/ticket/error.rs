//! Error types for ticket storage operations

use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::{
    get_item::GetItemError, put_item::PutItemError, query::QueryError,
};
use thiserror::Error;

/// Result type for ticket storage operations
pub type TicketStoreResult<T> = Result<T, TicketStoreError>;

/// Errors that can occur during ticket storage operations
#[derive(Error, Debug)]
pub enum TicketStoreError {
    /// Failed to write a ticket row to DynamoDB
    #[error("Failed to put ticket into DynamoDB: {0}")]
    DynamoDbPutError(#[from] SdkError<PutItemError>),

    /// Failed to read a ticket row from DynamoDB
    #[error("Failed to get ticket from DynamoDB: {0}")]
    DynamoDbGetError(#[from] SdkError<GetItemError>),

    /// Failed to query ticket rows from DynamoDB
    #[error("Failed to query tickets from DynamoDB: {0}")]
    DynamoDbQueryError(#[from] SdkError<QueryError>),

    /// Serialization error for `serde_dynamo`
    #[error("Serialization error: {0}")]
    SerializationError(String),
}
