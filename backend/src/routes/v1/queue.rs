//! Queue manager endpoints
//!
//! All operations are synchronous request/response over JSON; the chat
//! front-end and counter terminals are the callers.

use std::sync::Arc;

use aide::axum::{
    routing::{get, post},
    ApiRouter,
};
use axum::{Extension, Json};
use common_types::{QueueCategory, TicketStatus};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::queue_manager::QueueManager;
use crate::types::AppError;
use queue_storage::ticket::Ticket;

/// Creates the queue endpoint router
pub fn handler() -> ApiRouter {
    ApiRouter::new()
        .api_route("/register", post(register))
        .api_route("/status", get(status))
        .api_route("/update-status", post(update_status))
        .api_route("/call-next", post(call_next))
        .api_route("/cancel", post(cancel))
        .api_route("/list", get(list))
}

/// Registration request for one visit into one waiting line
#[derive(Debug, Deserialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct RegisterRequest {
    /// Waiting line to join
    pub category: QueueCategory,
    /// Visit number from the hospital system-of-record
    pub visit_id: String,
    /// Patient display name; a generic fallback is used when absent
    pub display_name: Option<String>,
    /// LINE user id to notify
    pub channel_identity: String,
}

/// A ticket with its live position
#[derive(Debug, Serialize, JsonSchema)]
pub struct RegisterResponse {
    /// The active ticket
    pub ticket: Ticket,
    /// Visits ahead in the waiting line
    pub waiting_count: u64,
    /// Whether this visit already held an active ticket
    pub already_registered: bool,
}

/// Registers a visit into a category's waiting line
///
/// Re-registering an active visit returns the existing ticket instead of a
/// duplicate.
///
/// # Errors
///
/// Returns an error when the queue stores are unavailable.
#[instrument(skip(queue_manager, payload))]
async fn register(
    Extension(queue_manager): Extension<Arc<QueueManager>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, AppError> {
    let display_name = payload.display_name.as_deref().unwrap_or("ผู้ป่วย");

    let registration = queue_manager
        .register(
            payload.category,
            &payload.visit_id,
            display_name,
            &payload.channel_identity,
        )
        .await?;

    Ok(Json(RegisterResponse {
        ticket: registration.ticket,
        waiting_count: registration.waiting_ahead,
        already_registered: registration.already_registered,
    }))
}

/// Status query for one visit
#[derive(Debug, Deserialize, JsonSchema)]
pub struct StatusQuery {
    /// Waiting line to look in
    pub category: QueueCategory,
    /// Visit number
    pub visit_id: String,
}

/// A ticket with position and wait estimate
#[derive(Debug, Serialize, JsonSchema)]
pub struct StatusResponse {
    /// The ticket
    pub ticket: Ticket,
    /// Visits ahead in the waiting line
    pub waiting_count: u64,
    /// Rough wait estimate in minutes
    pub estimated_wait_minutes: u64,
}

/// Looks up a visit's ticket, position, and wait estimate
///
/// # Errors
///
/// Returns 404 when no ticket exists for this visit today.
#[instrument(skip(queue_manager))]
async fn status(
    Extension(queue_manager): Extension<Arc<QueueManager>>,
    axum::extract::Query(query): axum::extract::Query<StatusQuery>,
) -> Result<Json<StatusResponse>, AppError> {
    let position = queue_manager.status(query.category, &query.visit_id).await?;

    Ok(Json(StatusResponse {
        ticket: position.ticket,
        waiting_count: position.waiting_ahead,
        estimated_wait_minutes: position.estimated_wait_minutes,
    }))
}

/// Status update request from a counter terminal
#[derive(Debug, Deserialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct UpdateStatusRequest {
    /// Waiting line the ticket belongs to
    pub category: QueueCategory,
    /// Visit number
    pub visit_id: String,
    /// New status; must move the ticket forward
    pub status: TicketStatus,
    /// Operator performing the update
    pub updated_by: Option<String>,
}

/// Outcome of a status update
#[derive(Debug, Serialize, JsonSchema)]
pub struct UpdateStatusResponse {
    /// The ticket after the update
    pub ticket: Ticket,
    /// `false` when the requested status was already current (no-op)
    pub updated: bool,
}

/// Moves a ticket to a new status
///
/// # Errors
///
/// Returns 404 for a missing ticket and 409 for a backward transition.
#[instrument(skip(queue_manager, payload))]
async fn update_status(
    Extension(queue_manager): Extension<Arc<QueueManager>>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<UpdateStatusResponse>, AppError> {
    let update = queue_manager
        .update_status(
            payload.category,
            &payload.visit_id,
            payload.status,
            payload.updated_by.as_deref(),
        )
        .await?;

    Ok(Json(UpdateStatusResponse {
        ticket: update.ticket,
        updated: update.updated,
    }))
}

/// Call-next request from a counter terminal
#[derive(Debug, Deserialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct CallNextRequest {
    /// Waiting line to pop from
    pub category: QueueCategory,
    /// Counter announcing the call
    pub counter_no: Option<String>,
    /// Staff member announcing the call
    pub staff_name: Option<String>,
}

/// Outcome of a call-next
#[derive(Debug, Serialize, JsonSchema)]
pub struct CallNextResponse {
    /// The called ticket, or `null` when the waiting line is empty
    pub ticket: Option<Ticket>,
}

/// Pops and calls the next waiting visit
///
/// An empty waiting line is not an error; the response carries no ticket.
///
/// # Errors
///
/// Returns an error when the queue stores are unavailable.
#[instrument(skip(queue_manager, payload))]
async fn call_next(
    Extension(queue_manager): Extension<Arc<QueueManager>>,
    Json(payload): Json<CallNextRequest>,
) -> Result<Json<CallNextResponse>, AppError> {
    let ticket = queue_manager
        .call_next(
            payload.category,
            payload.counter_no.as_deref(),
            payload.staff_name.as_deref(),
        )
        .await?;

    Ok(Json(CallNextResponse { ticket }))
}

/// Cancellation request
#[derive(Debug, Deserialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct CancelRequest {
    /// Waiting line the ticket belongs to
    pub category: QueueCategory,
    /// Visit number
    pub visit_id: String,
    /// Reason shown to the patient and kept in the audit history
    pub reason: Option<String>,
}

/// The cancelled ticket
#[derive(Debug, Serialize, JsonSchema)]
pub struct CancelResponse {
    /// The ticket after cancellation
    pub ticket: Ticket,
}

/// Cancels a ticket and removes it from the waiting line
///
/// # Errors
///
/// Returns 404 for a missing ticket and 409 when it is already terminal.
#[instrument(skip(queue_manager, payload))]
async fn cancel(
    Extension(queue_manager): Extension<Arc<QueueManager>>,
    Json(payload): Json<CancelRequest>,
) -> Result<Json<CancelResponse>, AppError> {
    let ticket = queue_manager
        .cancel(
            payload.category,
            &payload.visit_id,
            payload.reason.as_deref(),
        )
        .await?;

    Ok(Json(CancelResponse { ticket }))
}

/// Listing query for operator dashboards
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListQuery {
    /// Waiting line to list
    pub category: QueueCategory,
    /// Restrict to one status
    pub status: Option<TicketStatus>,
}

/// Today's tickets for one category
#[derive(Debug, Serialize, JsonSchema)]
pub struct ListResponse {
    /// Tickets ordered by ticket number
    pub tickets: Vec<Ticket>,
    /// Number of tickets returned
    pub count: usize,
}

/// Lists today's tickets for one category
///
/// # Errors
///
/// Returns an error when the ticket store is unavailable.
#[instrument(skip(queue_manager))]
async fn list(
    Extension(queue_manager): Extension<Arc<QueueManager>>,
    axum::extract::Query(query): axum::extract::Query<ListQuery>,
) -> Result<Json<ListResponse>, AppError> {
    let tickets = queue_manager
        .list_by_category(query.category, query.status)
        .await?;

    Ok(Json(ListResponse {
        count: tickets.len(),
        tickets,
    }))
}
