//! Queue manager behavior against in-memory stores

use std::collections::HashSet;
use std::sync::Arc;

use common_types::{QueueCategory, TicketStatus};
use pretty_assertions::assert_eq;

use push_gateway::mock::MockPushChannel;
use queue_backend::queue_manager::{QueueError, QueueManager};
use queue_storage::kv::memory::MemoryKv;
use queue_storage::ticket::memory::MemoryTicketStore;

struct TestContext {
    manager: QueueManager,
    push: Arc<MockPushChannel>,
    tickets: Arc<MemoryTicketStore>,
}

fn setup() -> TestContext {
    let kv = Arc::new(MemoryKv::new());
    let tickets = Arc::new(MemoryTicketStore::new());
    let push = Arc::new(MockPushChannel::new());

    let manager = QueueManager::new(kv, tickets.clone(), push.clone(), 5);

    TestContext {
        manager,
        push,
        tickets,
    }
}

#[tokio::test]
async fn register_issues_sequential_numbers_and_tracks_positions() {
    let ctx = setup();

    let first = ctx
        .manager
        .register(QueueCategory::Pharmacy, "V001", "Somchai", "U123")
        .await
        .unwrap();
    assert_eq!(first.ticket.ticket_number, 1);
    assert_eq!(first.ticket.status, TicketStatus::Waiting);
    assert!(!first.already_registered);

    let second = ctx
        .manager
        .register(QueueCategory::Pharmacy, "V002", "Malee", "U456")
        .await
        .unwrap();
    assert_eq!(second.ticket.ticket_number, 2);
    assert_eq!(second.waiting_ahead, 1);

    let position = ctx
        .manager
        .status(QueueCategory::Pharmacy, "V001")
        .await
        .unwrap();
    assert_eq!(position.waiting_ahead, 0);
    assert_eq!(position.estimated_wait_minutes, 0);

    let position = ctx
        .manager
        .status(QueueCategory::Pharmacy, "V002")
        .await
        .unwrap();
    assert_eq!(position.waiting_ahead, 1);
    assert_eq!(position.estimated_wait_minutes, 5);
}

#[tokio::test]
async fn register_twice_returns_the_same_ticket() {
    let ctx = setup();

    let first = ctx
        .manager
        .register(QueueCategory::Lab, "V001", "Somchai", "U123")
        .await
        .unwrap();
    let second = ctx
        .manager
        .register(QueueCategory::Lab, "V001", "Somchai", "U123")
        .await
        .unwrap();

    assert_eq!(second.ticket.ticket_number, first.ticket.ticket_number);
    assert!(second.already_registered);

    // The duplicate did not grow the waiting line
    let third = ctx
        .manager
        .register(QueueCategory::Lab, "V002", "Malee", "U456")
        .await
        .unwrap();
    assert_eq!(third.ticket.ticket_number, 2);
    assert_eq!(third.waiting_ahead, 1);
}

#[tokio::test]
async fn concurrent_registrations_issue_contiguous_numbers() {
    let ctx = setup();
    let manager = Arc::new(ctx.manager);

    let mut handles = Vec::new();
    for i in 0..20 {
        let manager = manager.clone();
        handles.push(tokio::spawn(async move {
            manager
                .register(
                    QueueCategory::Cashier,
                    &format!("V{i:03}"),
                    "Patient",
                    &format!("U{i:03}"),
                )
                .await
                .unwrap()
                .ticket
                .ticket_number
        }));
    }

    let mut numbers = HashSet::new();
    for handle in handles {
        numbers.insert(handle.await.unwrap());
    }

    let expected: HashSet<i64> = (1..=20).collect();
    assert_eq!(numbers, expected);
}

#[tokio::test]
async fn call_next_pops_in_fifo_order_and_empties_cleanly() {
    let ctx = setup();

    ctx.manager
        .register(QueueCategory::Pharmacy, "V001", "Somchai", "U123")
        .await
        .unwrap();
    ctx.manager
        .register(QueueCategory::Pharmacy, "V002", "Malee", "U456")
        .await
        .unwrap();
    let sends_after_register = ctx.push.sent_count();

    let first = ctx
        .manager
        .call_next(QueueCategory::Pharmacy, Some("C1"), Some("Nurse A"))
        .await
        .unwrap()
        .expect("queue should not be empty");
    assert_eq!(first.visit_id, "V001");
    assert_eq!(first.status, TicketStatus::Called);
    assert_eq!(first.counter_no.as_deref(), Some("C1"));
    assert!(first.called_at.is_some());

    // Exactly one call-up push went to the first patient
    let sends = ctx.push.sent();
    assert_eq!(sends.len(), sends_after_register + 1);
    assert_eq!(sends.last().unwrap().0, "U123");

    let second = ctx
        .manager
        .call_next(QueueCategory::Pharmacy, Some("C1"), Some("Nurse A"))
        .await
        .unwrap()
        .expect("second ticket should be waiting");
    assert_eq!(second.visit_id, "V002");

    // Exhausted: no error, no mutation, no push
    let sends_before = ctx.push.sent_count();
    let empty = ctx
        .manager
        .call_next(QueueCategory::Pharmacy, None, None)
        .await
        .unwrap();
    assert!(empty.is_none());
    assert_eq!(ctx.push.sent_count(), sends_before);
}

#[tokio::test]
async fn called_visit_never_comes_back() {
    let ctx = setup();

    ctx.manager
        .register(QueueCategory::Doctor, "V001", "Somchai", "U123")
        .await
        .unwrap();
    ctx.manager
        .call_next(QueueCategory::Doctor, None, None)
        .await
        .unwrap();

    let position = ctx
        .manager
        .status(QueueCategory::Doctor, "V001")
        .await
        .unwrap();
    assert_eq!(position.ticket.status, TicketStatus::Called);
    assert_eq!(position.waiting_ahead, 0);

    assert!(ctx
        .manager
        .call_next(QueueCategory::Doctor, None, None)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn same_status_update_is_a_no_op() {
    let ctx = setup();

    let registered = ctx
        .manager
        .register(QueueCategory::Xray, "V001", "Somchai", "U123")
        .await
        .unwrap();
    let sends_before = ctx.push.sent_count();

    let update = ctx
        .manager
        .update_status(
            QueueCategory::Xray,
            "V001",
            TicketStatus::Waiting,
            Some("staff"),
        )
        .await
        .unwrap();

    assert!(!update.updated);
    assert_eq!(update.ticket.updated_at, registered.ticket.updated_at);
    assert_eq!(ctx.push.sent_count(), sends_before);
}

#[tokio::test]
async fn backward_transitions_are_rejected() {
    let ctx = setup();

    ctx.manager
        .register(QueueCategory::Xray, "V001", "Somchai", "U123")
        .await
        .unwrap();
    ctx.manager
        .call_next(QueueCategory::Xray, None, None)
        .await
        .unwrap();

    let err = ctx
        .manager
        .update_status(QueueCategory::Xray, "V001", TicketStatus::Waiting, None)
        .await
        .unwrap_err();
    assert!(matches!(err, QueueError::InvalidTransition { .. }));
}

#[tokio::test]
async fn status_for_unknown_visit_is_not_found() {
    let ctx = setup();

    let err = ctx
        .manager
        .status(QueueCategory::Pharmacy, "V404")
        .await
        .unwrap_err();
    assert!(matches!(err, QueueError::NotFound));
}

#[tokio::test]
async fn terminal_update_removes_the_visit_from_the_waiting_line() {
    let ctx = setup();

    ctx.manager
        .register(QueueCategory::Cashier, "V001", "Somchai", "U123")
        .await
        .unwrap();
    ctx.manager
        .register(QueueCategory::Cashier, "V002", "Malee", "U456")
        .await
        .unwrap();

    // Cancel a visit that is still in the list
    let cancelled = ctx
        .manager
        .cancel(QueueCategory::Cashier, "V001", Some("เปลี่ยนวันนัด"))
        .await
        .unwrap();
    assert_eq!(cancelled.status, TicketStatus::Cancelled);
    assert_eq!(cancelled.cancelled_reason.as_deref(), Some("เปลี่ยนวันนัด"));

    // The other visit moved up
    let next = ctx
        .manager
        .call_next(QueueCategory::Cashier, None, None)
        .await
        .unwrap()
        .expect("V002 should be next");
    assert_eq!(next.visit_id, "V002");

    // Completing a called visit tolerates its absence from the list
    let update = ctx
        .manager
        .update_status(QueueCategory::Cashier, "V002", TicketStatus::Done, None)
        .await
        .unwrap();
    assert!(update.updated);
}

#[tokio::test]
async fn push_failure_does_not_fail_the_mutation() {
    let ctx = setup();

    ctx.push.fail_next_send();
    let registration = ctx
        .manager
        .register(QueueCategory::Pharmacy, "V001", "Somchai", "U123")
        .await
        .unwrap();
    assert_eq!(registration.ticket.ticket_number, 1);
    assert_eq!(ctx.push.sent_count(), 0);

    // The ticket is fully registered despite the failed confirmation push
    let position = ctx
        .manager
        .status(QueueCategory::Pharmacy, "V001")
        .await
        .unwrap();
    assert_eq!(position.ticket.status, TicketStatus::Waiting);
}

#[tokio::test]
async fn every_mutation_archives_a_history_snapshot() {
    let ctx = setup();

    ctx.manager
        .register(QueueCategory::Lab, "V001", "Somchai", "U123")
        .await
        .unwrap();
    ctx.manager
        .call_next(QueueCategory::Lab, Some("C2"), None)
        .await
        .unwrap();
    ctx.manager
        .update_status(QueueCategory::Lab, "V001", TicketStatus::Done, None)
        .await
        .unwrap();

    assert_eq!(ctx.tickets.history_len(), 3);
}

#[tokio::test]
async fn list_by_category_filters_by_status() {
    let ctx = setup();

    ctx.manager
        .register(QueueCategory::Pharmacy, "V001", "Somchai", "U123")
        .await
        .unwrap();
    ctx.manager
        .register(QueueCategory::Pharmacy, "V002", "Malee", "U456")
        .await
        .unwrap();
    ctx.manager
        .call_next(QueueCategory::Pharmacy, None, None)
        .await
        .unwrap();

    let all = ctx
        .manager
        .list_by_category(QueueCategory::Pharmacy, None)
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].ticket_number, 1);

    let waiting = ctx
        .manager
        .list_by_category(QueueCategory::Pharmacy, Some(TicketStatus::Waiting))
        .await
        .unwrap();
    assert_eq!(waiting.len(), 1);
    assert_eq!(waiting[0].visit_id, "V002");
}
