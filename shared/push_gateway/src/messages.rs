//! Patient-facing Thai message templates
//!
//! One function per notification, shared by the HTTP backend (ticket
//! lifecycle) and the monitor (dispensing stages, slot calls) so the wording
//! stays identical across both senders.

use common_types::{QueueCategory, TicketStatus};

/// Confirmation sent right after a successful registration
#[must_use]
pub fn registration_confirmed(
    category: QueueCategory,
    ticket_number: i64,
    display_name: &str,
    waiting_ahead: u64,
) -> String {
    format!(
        "✅ ลงทะเบียนคิวสำเร็จ\n\n📋 ประเภท: {}\n🎫 หมายเลขคิว: {}\n👤 ชื่อ: {}\n⏱️ คิวที่รออยู่ข้างหน้า: {} คน\n\nกรุณารอเรียกคิวของคุณ",
        category.thai_label(),
        ticket_number,
        display_name,
        waiting_ahead
    )
}

/// Call-up message with counter and staff details
#[must_use]
pub fn call_up(
    category: QueueCategory,
    ticket_number: i64,
    counter_no: Option<&str>,
    staff_name: Option<&str>,
) -> String {
    format!(
        "🔔 ถึงคิวของคุณแล้ว!\n\n📋 ประเภท: {}\n🎫 หมายเลขคิว: {}\n🏢 ช่องบริการ: {}\n👨‍⚕️ เจ้าหน้าที่: {}\n\nกรุณามาที่ช่องบริการด้วยค่ะ",
        category.thai_label(),
        ticket_number,
        counter_no.unwrap_or("กรุณาดูหน้าจอ"),
        staff_name.unwrap_or("-")
    )
}

/// Status-change message for every ticket status
#[must_use]
pub fn status_changed(
    status: TicketStatus,
    category: QueueCategory,
    ticket_number: i64,
    counter_no: Option<&str>,
) -> String {
    let label = category.thai_label();
    match status {
        TicketStatus::Waiting => format!(
            "⏳ คิวของคุณกำลังรออยู่\n\n📋 ประเภท: {label}\n🎫 หมายเลขคิว: {ticket_number}\n\nกรุณารอเรียกคิวของคุณ"
        ),
        TicketStatus::Called => {
            let counter = counter_no
                .map(|c| format!("\n🏢 ช่องบริการ: {c}"))
                .unwrap_or_default();
            format!(
                "🔔 ถึงคิวของคุณแล้ว!\n\n📋 ประเภท: {label}\n🎫 หมายเลขคิว: {ticket_number}{counter}\n\nกรุณามาที่ช่องบริการด้วยค่ะ"
            )
        }
        TicketStatus::Serving => format!(
            "👨‍⚕️ กำลังให้บริการ\n\n📋 ประเภท: {label}\n🎫 หมายเลขคิว: {ticket_number}"
        ),
        TicketStatus::Done => format!(
            "✅ เสร็จสิ้นการบริการ\n\n📋 ประเภท: {label}\n🎫 หมายเลขคิว: {ticket_number}\n\nขอบคุณที่ใช้บริการค่ะ"
        ),
        TicketStatus::Cancelled => format!(
            "❌ ยกเลิกคิวแล้ว\n\n📋 ประเภท: {label}\n🎫 หมายเลขคิว: {ticket_number}"
        ),
        TicketStatus::NoShow => format!(
            "⚠️ ไม่มาตามนัด\n\n📋 ประเภท: {label}\n🎫 หมายเลขคิว: {ticket_number}\n\nหากต้องการใช้บริการกรุณาลงทะเบียนใหม่"
        ),
    }
}

/// Cancellation message with the recorded reason
#[must_use]
pub fn cancelled_with_reason(
    category: QueueCategory,
    ticket_number: i64,
    reason: Option<&str>,
) -> String {
    let reason = reason
        .map(|r| format!("\n\nเหตุผล: {r}"))
        .unwrap_or_default();
    format!(
        "❌ ยกเลิกคิวแล้ว\n\n📋 ประเภท: {}\n🎫 หมายเลขคิว: {}{}",
        category.thai_label(),
        ticket_number,
        reason
    )
}

/// Dispensing stage: preparation in progress
#[must_use]
pub fn preparing(visit_id: &str, patient_name: Option<&str>, clinic_name: Option<&str>) -> String {
    format!(
        "⏳ รอจัดยา\n\n📋 VN: {}\n👤 ชื่อ: {}\n🏥 คลินิก: {}\n\nกรุณารอสักครู่ ระบบกำลังจัดเตรียมยาให้คุณ",
        visit_id,
        patient_name.unwrap_or("-"),
        clinic_name.unwrap_or("-")
    )
}

/// Dispensing stage: prepared, waiting for call-up
#[must_use]
pub fn ready(visit_id: &str, patient_name: Option<&str>, clinic_name: Option<&str>) -> String {
    format!(
        "✅ ยาของคุณพร้อมแล้ว!\n\n📋 VN: {}\n👤 ชื่อ: {}\n🏥 คลินิก: {}\n\nกรุณารอเรียกคิวที่หน้าช่องจ่ายยา\nระบบจะแจ้งเตือนเมื่อถึงคิวของคุณ 🔔",
        visit_id,
        patient_name.unwrap_or("-"),
        clinic_name.unwrap_or("-")
    )
}

/// Dispensing stage: nothing to dispense for this visit
#[must_use]
pub fn no_item(visit_id: &str, patient_name: Option<&str>) -> String {
    format!(
        "ℹ️ แจ้งเตือน\n\n📋 VN: {}\n👤 ชื่อ: {}\n\nคุณไม่มียาที่ต้องรับในครั้งนี้\nกรุณาติดต่อเจ้าหน้าที่หากมีข้อสงสัย",
        visit_id,
        patient_name.unwrap_or("-")
    )
}

/// Slot call: payment counter
#[must_use]
pub fn payment_call(visit_id: &str, slot: &str) -> String {
    format!(
        "💰 ถึงคิวชำระเงินของคุณแล้ว\n\n📋 VN: {visit_id}\n🧮 ช่องชำระเงิน: {slot}\n\nกรุณาไปที่ช่องชำระเงินหมายเลข {slot} เพื่อทำการชำระเงินค่ะ"
    )
}

/// Slot call: dispensing pickup counter
#[must_use]
pub fn pickup_call(visit_id: &str, slot: &str) -> String {
    format!(
        "🔔 ถึงคิวรับยาของคุณแล้ว!\n\n📋 VN: {visit_id}\n🏢 ช่องจ่ายยา: {slot}\n\nกรุณามารับยาที่ช่องจ่ายยาด้วยค่ะ"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_message_carries_number_and_ahead_count() {
        let msg = registration_confirmed(QueueCategory::Pharmacy, 7, "สมชาย", 3);
        assert!(msg.contains("หมายเลขคิว: 7"));
        assert!(msg.contains("ห้องยา"));
        assert!(msg.contains("3 คน"));
    }

    #[test]
    fn call_up_falls_back_when_counter_is_unknown() {
        let msg = call_up(QueueCategory::Cashier, 12, None, None);
        assert!(msg.contains("กรุณาดูหน้าจอ"));
        assert!(msg.contains("เจ้าหน้าที่: -"));
    }

    #[test]
    fn every_status_has_a_message() {
        for status in [
            TicketStatus::Waiting,
            TicketStatus::Called,
            TicketStatus::Serving,
            TicketStatus::Done,
            TicketStatus::Cancelled,
            TicketStatus::NoShow,
        ] {
            let msg = status_changed(status, QueueCategory::Lab, 5, None);
            assert!(msg.contains("หมายเลขคิว: 5"), "empty message for {status}");
        }
    }

    #[test]
    fn slot_calls_name_the_slot_twice_or_once() {
        assert!(payment_call("V001", "3").contains("ช่องชำระเงินหมายเลข 3"));
        assert!(pickup_call("V001", "2").contains("ช่องจ่ายยา: 2"));
    }
}
