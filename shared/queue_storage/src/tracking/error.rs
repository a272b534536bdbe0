//! Error types for notification tracking operations

use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::{
    delete_item::DeleteItemError, get_item::GetItemError, put_item::PutItemError,
    query::QueryError, scan::ScanError, update_item::UpdateItemError,
};
use thiserror::Error;

/// Result type for notification tracking operations
pub type TrackingResult<T> = Result<T, TrackingError>;

/// Errors that can occur during notification tracking operations
#[derive(Error, Debug)]
pub enum TrackingError {
    /// Failed to write a tracking item to DynamoDB
    #[error("Failed to put tracking item into DynamoDB: {0}")]
    DynamoDbPutError(#[from] SdkError<PutItemError>),

    /// Failed to read a tracking item from DynamoDB
    #[error("Failed to get tracking item from DynamoDB: {0}")]
    DynamoDbGetError(#[from] SdkError<GetItemError>),

    /// Failed to update a tracking item in DynamoDB
    #[error("Failed to update tracking item in DynamoDB: {0}")]
    DynamoDbUpdateError(#[from] SdkError<UpdateItemError>),

    /// Failed to query tracking items from DynamoDB
    #[error("Failed to query tracking items from DynamoDB: {0}")]
    DynamoDbQueryError(#[from] SdkError<QueryError>),

    /// Failed to scan tracking items from DynamoDB
    #[error("Failed to scan tracking items from DynamoDB: {0}")]
    DynamoDbScanError(#[from] SdkError<ScanError>),

    /// Failed to delete a tracking item from DynamoDB
    #[error("Failed to delete tracking item from DynamoDB: {0}")]
    DynamoDbDeleteError(#[from] SdkError<DeleteItemError>),

    /// Serialization error for `serde_dynamo`
    #[error("Serialization error: {0}")]
    SerializationError(String),
}
