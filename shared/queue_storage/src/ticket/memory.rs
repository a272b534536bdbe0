//! In-memory ticket store for tests

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use common_types::{QueueCategory, TicketStatus};

use super::{Ticket, TicketStore, TicketStoreResult};

/// In-memory ticket store with a visible history log
#[derive(Default)]
pub struct MemoryTicketStore {
    current: Mutex<HashMap<(String, String), Ticket>>,
    history: Mutex<Vec<Ticket>>,
}

impl MemoryTicketStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of archived snapshots
    ///
    /// # Panics
    ///
    /// Panics if the store mutex is poisoned.
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.lock().unwrap().len()
    }
}

#[async_trait]
impl TicketStore for MemoryTicketStore {
    async fn save(&self, ticket: &Ticket) -> TicketStoreResult<()> {
        self.current.lock().unwrap().insert(
            (ticket.service_day.clone(), ticket.ticket_id.clone()),
            ticket.clone(),
        );
        Ok(())
    }

    async fn archive(&self, ticket: &Ticket) -> TicketStoreResult<()> {
        self.history.lock().unwrap().push(ticket.clone());
        Ok(())
    }

    async fn get(
        &self,
        service_day: &str,
        category: QueueCategory,
        visit_id: &str,
    ) -> TicketStoreResult<Option<Ticket>> {
        let key = (
            service_day.to_string(),
            Ticket::ticket_id_for(category, visit_id),
        );
        Ok(self.current.lock().unwrap().get(&key).cloned())
    }

    async fn list_by_category(
        &self,
        service_day: &str,
        category: QueueCategory,
        status: Option<TicketStatus>,
    ) -> TicketStoreResult<Vec<Ticket>> {
        let prefix = format!("{category}#");
        let mut tickets: Vec<Ticket> = self
            .current
            .lock()
            .unwrap()
            .values()
            .filter(|t| t.service_day == service_day && t.ticket_id.starts_with(&prefix))
            .filter(|t| status.is_none_or(|s| t.status == s))
            .cloned()
            .collect();

        tickets.sort_by_key(|t| t.ticket_number);
        Ok(tickets)
    }
}
