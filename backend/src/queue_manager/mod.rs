//! Ticket/FIFO queue manager
//!
//! Issues ticket numbers from a per-category, per-day atomic counter, keeps
//! each category's waiting line in an atomic FIFO list, and drives the
//! ticket status state machine. The FIFO mutation is the operation of
//! record: ticket rows are derived from it, and a store failure after a list
//! mutation fails only that request, never the ordering.
//!
//! Push sends happen after the state mutation and are confirmed-or-logged;
//! a channel failure does not fail the request, and the same-status no-op
//! keeps redelivery idempotent.

mod error;

use std::sync::Arc;

use chrono::Local;
use common_types::{QueueCategory, TicketStatus};
use metrics::counter;
use push_gateway::{messages, PushChannel};
use queue_storage::day;
use queue_storage::kv::{self, AtomicKv};
use queue_storage::ticket::{Ticket, TicketStore};
use tracing::{info, instrument, warn};

pub use error::{QueueError, QueueResult};

/// Seconds a working-cache copy of a ticket stays readable
const TICKET_CACHE_TTL_SECS: u64 = 24 * 3600;

/// Outcome of a registration
#[derive(Debug)]
pub struct Registration {
    /// The active ticket for this visit
    pub ticket: Ticket,
    /// Number of visits ahead in the FIFO list
    pub waiting_ahead: u64,
    /// Whether an active ticket already existed (idempotent re-registration)
    pub already_registered: bool,
}

/// A ticket together with its live queue position
#[derive(Debug)]
pub struct TicketPosition {
    /// The ticket
    pub ticket: Ticket,
    /// Number of visits ahead in the FIFO list (0 when not waiting)
    pub waiting_ahead: u64,
    /// `waiting_ahead` × the per-person estimate, in minutes
    pub estimated_wait_minutes: u64,
}

/// Outcome of a status update
#[derive(Debug)]
pub struct StatusUpdate {
    /// The ticket after the update
    pub ticket: Ticket,
    /// `false` when the requested status equals the current one (no-op)
    pub updated: bool,
}

/// The queue manager
///
/// Cheap to clone behind `Arc`s; invoked concurrently by request handlers.
/// It holds no mutable state of its own — every cross-request invariant
/// lives in the atomic store.
pub struct QueueManager {
    kv: Arc<dyn AtomicKv>,
    tickets: Arc<dyn TicketStore>,
    push: Arc<dyn PushChannel>,
    per_person_minutes: u64,
}

impl QueueManager {
    /// Creates a queue manager over the given stores and push channel
    #[must_use]
    pub fn new(
        kv: Arc<dyn AtomicKv>,
        tickets: Arc<dyn TicketStore>,
        push: Arc<dyn PushChannel>,
        per_person_minutes: u64,
    ) -> Self {
        Self {
            kv,
            tickets,
            push,
            per_person_minutes,
        }
    }

    /// Registers a visit into a category's waiting line
    ///
    /// Idempotent: if an active (non-terminal) ticket already exists for
    /// this visit and category today, it is returned unchanged instead of
    /// issuing a duplicate number.
    ///
    /// # Errors
    ///
    /// Returns `QueueError` if the atomic store or the ticket store fails.
    #[instrument(skip(self, display_name, channel_identity))]
    pub async fn register(
        &self,
        category: QueueCategory,
        visit_id: &str,
        display_name: &str,
        channel_identity: &str,
    ) -> QueueResult<Registration> {
        let now = Local::now();
        let service_day = day::service_day(&now);

        if let Some(existing) = self.tickets.get(&service_day, category, visit_id).await? {
            if !existing.status.is_terminal() {
                info!(visit_id, %category, "Duplicate registration, returning existing ticket");
                let waiting_ahead = self.waiting_ahead(category, visit_id).await?;
                return Ok(Registration {
                    ticket: existing,
                    waiting_ahead,
                    already_registered: true,
                });
            }
        }

        // The counter and the list push are the operations of record; the
        // ticket row below is derived from them
        let ticket_number = self
            .kv
            .increment(
                &kv::counter_key(category, &service_day),
                day::seconds_until_midnight(&now),
            )
            .await?;
        self.kv
            .list_push(&kv::fifo_key(category), visit_id)
            .await?;

        let timestamp = now.timestamp();
        let ticket = Ticket {
            service_day: service_day.clone(),
            ticket_id: Ticket::ticket_id_for(category, visit_id),
            visit_id: visit_id.to_string(),
            category,
            ticket_number,
            display_name: display_name.to_string(),
            channel_identity: channel_identity.to_string(),
            status: TicketStatus::Waiting,
            counter_no: None,
            staff_name: None,
            cancelled_reason: None,
            created_at: timestamp,
            called_at: None,
            updated_at: timestamp,
            ttl: day::expiry_after_midnight(86_400),
        };

        self.persist(&ticket).await?;
        counter!("queue_ticket_registered").increment(1);

        let waiting_ahead = self.waiting_ahead(category, visit_id).await?;
        self.notify(
            &ticket.channel_identity,
            &messages::registration_confirmed(
                category,
                ticket.ticket_number,
                &ticket.display_name,
                waiting_ahead,
            ),
        )
        .await;

        Ok(Registration {
            ticket,
            waiting_ahead,
            already_registered: false,
        })
    }

    /// Looks up a visit's ticket and live queue position
    ///
    /// # Errors
    ///
    /// Returns `QueueError::NotFound` when no ticket exists for this visit
    /// and category today.
    #[instrument(skip(self))]
    pub async fn status(
        &self,
        category: QueueCategory,
        visit_id: &str,
    ) -> QueueResult<TicketPosition> {
        let ticket = self
            .load(category, visit_id)
            .await?
            .ok_or(QueueError::NotFound)?;

        let waiting_ahead = if ticket.status == TicketStatus::Waiting {
            self.waiting_ahead(category, visit_id).await?
        } else {
            0
        };

        Ok(TicketPosition {
            waiting_ahead,
            estimated_wait_minutes: waiting_ahead * self.per_person_minutes,
            ticket,
        })
    }

    /// Pops the next waiting visit and calls it to a counter
    ///
    /// Returns `Ok(None)` when the category's waiting line is empty; nothing
    /// is mutated in that case.
    ///
    /// # Errors
    ///
    /// Returns `QueueError` if the atomic store or the ticket store fails.
    #[instrument(skip(self))]
    pub async fn call_next(
        &self,
        category: QueueCategory,
        counter_no: Option<&str>,
        staff_name: Option<&str>,
    ) -> QueueResult<Option<Ticket>> {
        let Some(visit_id) = self.kv.list_pop(&kv::fifo_key(category)).await? else {
            return Ok(None);
        };

        let now = Local::now();
        let service_day = day::service_day(&now);
        let timestamp = now.timestamp();

        // The list entry is authoritative; a missing row is recovered with a
        // zero ticket number rather than dropping the patient's call-up
        let mut ticket = match self.tickets.get(&service_day, category, &visit_id).await? {
            Some(ticket) => ticket,
            None => {
                warn!(%visit_id, %category, "FIFO entry without a ticket row, recovering");
                Ticket {
                    service_day: service_day.clone(),
                    ticket_id: Ticket::ticket_id_for(category, &visit_id),
                    visit_id: visit_id.clone(),
                    category,
                    ticket_number: 0,
                    display_name: String::new(),
                    channel_identity: String::new(),
                    status: TicketStatus::Waiting,
                    counter_no: None,
                    staff_name: None,
                    cancelled_reason: None,
                    created_at: timestamp,
                    called_at: None,
                    updated_at: timestamp,
                    ttl: day::expiry_after_midnight(86_400),
                }
            }
        };

        ticket.status = TicketStatus::Called;
        ticket.counter_no = counter_no.map(ToString::to_string);
        ticket.staff_name = staff_name.map(ToString::to_string);
        ticket.called_at = Some(timestamp);
        ticket.updated_at = timestamp;

        self.persist(&ticket).await?;
        counter!("queue_ticket_called").increment(1);

        if !ticket.channel_identity.is_empty() {
            self.notify(
                &ticket.channel_identity,
                &messages::call_up(category, ticket.ticket_number, counter_no, staff_name),
            )
            .await;
        }

        Ok(Some(ticket))
    }

    /// Moves a ticket to a new status
    ///
    /// A request for the current status is a no-op (`updated == false`, no
    /// push). Terminal statuses also remove the visit from the FIFO list,
    /// tolerating its absence.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::NotFound` when the ticket does not exist and
    /// `QueueError::InvalidTransition` when the status would move backward.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        category: QueueCategory,
        visit_id: &str,
        new_status: TicketStatus,
        actor: Option<&str>,
    ) -> QueueResult<StatusUpdate> {
        let mut ticket = self
            .load(category, visit_id)
            .await?
            .ok_or(QueueError::NotFound)?;

        if ticket.status == new_status {
            return Ok(StatusUpdate {
                ticket,
                updated: false,
            });
        }

        if !ticket.status.allows_transition_to(new_status) {
            return Err(QueueError::InvalidTransition {
                from: ticket.status,
                to: new_status,
            });
        }

        info!(
            visit_id,
            %category,
            from = %ticket.status,
            to = %new_status,
            actor = actor.unwrap_or("system"),
            "Updating ticket status"
        );

        ticket.status = new_status;
        ticket.updated_at = Local::now().timestamp();

        if new_status.is_terminal() {
            // Should already be gone after call_next; removal tolerates that
            self.kv
                .list_remove(&kv::fifo_key(category), visit_id)
                .await?;
        }

        self.persist(&ticket).await?;

        if !ticket.channel_identity.is_empty() {
            self.notify(
                &ticket.channel_identity,
                &messages::status_changed(
                    new_status,
                    category,
                    ticket.ticket_number,
                    ticket.counter_no.as_deref(),
                ),
            )
            .await;
        }

        Ok(StatusUpdate {
            ticket,
            updated: true,
        })
    }

    /// Cancels a ticket, recording the reason and leaving the waiting line
    ///
    /// # Errors
    ///
    /// Returns `QueueError::NotFound` when the ticket does not exist and
    /// `QueueError::InvalidTransition` when it is already terminal.
    #[instrument(skip(self))]
    pub async fn cancel(
        &self,
        category: QueueCategory,
        visit_id: &str,
        reason: Option<&str>,
    ) -> QueueResult<Ticket> {
        let mut ticket = self
            .load(category, visit_id)
            .await?
            .ok_or(QueueError::NotFound)?;

        if !ticket.status.allows_transition_to(TicketStatus::Cancelled) {
            return Err(QueueError::InvalidTransition {
                from: ticket.status,
                to: TicketStatus::Cancelled,
            });
        }

        ticket.status = TicketStatus::Cancelled;
        ticket.cancelled_reason = reason.map(ToString::to_string);
        ticket.updated_at = Local::now().timestamp();

        self.kv
            .list_remove(&kv::fifo_key(category), visit_id)
            .await?;
        self.persist(&ticket).await?;

        if !ticket.channel_identity.is_empty() {
            self.notify(
                &ticket.channel_identity,
                &messages::cancelled_with_reason(category, ticket.ticket_number, reason),
            )
            .await;
        }

        Ok(ticket)
    }

    /// Lists today's tickets for one category, optionally filtered by status
    ///
    /// # Errors
    ///
    /// Returns `QueueError` if the ticket store fails.
    #[instrument(skip(self))]
    pub async fn list_by_category(
        &self,
        category: QueueCategory,
        status: Option<TicketStatus>,
    ) -> QueueResult<Vec<Ticket>> {
        let service_day = day::today();
        Ok(self
            .tickets
            .list_by_category(&service_day, category, status)
            .await?)
    }

    /// 0-based position of a visit in its category's FIFO list
    async fn waiting_ahead(&self, category: QueueCategory, visit_id: &str) -> QueueResult<u64> {
        Ok(self
            .kv
            .list_position(&kv::fifo_key(category), visit_id)
            .await?
            .unwrap_or(0))
    }

    /// Loads a ticket from the working cache, falling back to the store
    async fn load(
        &self,
        category: QueueCategory,
        visit_id: &str,
    ) -> QueueResult<Option<Ticket>> {
        let service_day = day::today();
        let cache_key = kv::ticket_cache_key(visit_id, category);

        if let Some(raw) = self.kv.get(&cache_key).await? {
            match serde_json::from_str::<Ticket>(&raw) {
                Ok(ticket) if ticket.service_day == service_day => return Ok(Some(ticket)),
                Ok(_) => {} // stale day, fall through to the store
                Err(e) => warn!(visit_id, "Discarding unreadable cached ticket: {e}"),
            }
        }

        let ticket = self.tickets.get(&service_day, category, visit_id).await?;
        if let Some(ticket) = &ticket {
            self.cache(ticket).await;
        }
        Ok(ticket)
    }

    /// Writes the current row, archives a history snapshot, and refreshes
    /// the working cache
    async fn persist(&self, ticket: &Ticket) -> QueueResult<()> {
        self.tickets.save(ticket).await?;
        self.tickets.archive(ticket).await?;
        self.cache(ticket).await;
        Ok(())
    }

    /// Best-effort cache write; DynamoDB remains the source of truth
    async fn cache(&self, ticket: &Ticket) {
        let Ok(raw) = serde_json::to_string(ticket) else {
            return;
        };
        let cache_key = kv::ticket_cache_key(&ticket.visit_id, ticket.category);
        if let Err(e) = self
            .kv
            .set_with_ttl(&cache_key, &raw, TICKET_CACHE_TTL_SECS)
            .await
        {
            warn!(visit_id = %ticket.visit_id, "Ticket cache write failed: {e}");
        }
    }

    /// Sends a push after a confirmed state mutation; failures are logged
    /// and never bubble up to the request
    async fn notify(&self, channel_identity: &str, text: &str) {
        match self.push.send(channel_identity, text).await {
            Ok(()) => {
                counter!("queue_notification_delivered").increment(1);
            }
            Err(e) => {
                counter!("queue_notification_failed").increment(1);
                warn!("Push send failed after state mutation: {e}");
            }
        }
    }
}
