use std::sync::Arc;

use assert_matches::assert_matches;
use futures::StreamExt;

use appointment_cell::models::{
    messages, AppointmentError, AppointmentStatus, BookAppointmentRequest, CancelAppointmentRequest,
};
use appointment_cell::services::{AppointmentBookingService, DoctorBoardService};
use shared_database::AppState;
use shared_utils::test_utils::{october, seed_slot, seeded_state, TestConfig};

fn form(slot_id: &str) -> BookAppointmentRequest {
    BookAppointmentRequest {
        patient_name: "Ana Lopez".to_string(),
        contact_number: "600123456".to_string(),
        requirements: Some("First visit".to_string()),
        slot_id: slot_id.to_string(),
    }
}

async fn book(service: &AppointmentBookingService, slot_id: &str) -> String {
    let result = service
        .request_appointment("patient123", form(slot_id))
        .await
        .unwrap();
    assert!(result.confirmation_status, "booking {} failed: {}", slot_id, result.reason);
    result.appointment_id.unwrap()
}

async fn setup() -> (Arc<AppState>, AppointmentBookingService) {
    let state = seeded_state(&TestConfig::default()).await;
    let service = AppointmentBookingService::new(&state);
    (state, service)
}

#[tokio::test]
async fn test_booking_creates_pending_and_approval_keeps_date() {
    let (state, service) = setup().await;
    seed_slot(state.store.as_ref(), "1", october(26, 9, 0)).await;

    let result = service
        .request_appointment("patient123", form("1_2024-10-26T09:00:00.000Z"))
        .await
        .unwrap();
    assert!(result.confirmation_status);
    assert_eq!(result.reason, messages::REQUEST_SENT);

    let id = result.appointment_id.unwrap();
    let booked = service.get_appointment(&id).await.unwrap();
    assert_eq!(booked.status, AppointmentStatus::Pending);
    assert_eq!(booked.doctor.name, "Dr. Sarah Johnson");
    assert_eq!(booked.requirements.as_deref(), Some("First visit"));
    assert!(state.store.get_slot("1_2024-10-26T09:00:00.000Z").await.unwrap().is_none());

    let approved = service.approve(&id).await.unwrap();
    assert_eq!(approved.status, AppointmentStatus::Approved);
    assert_eq!(approved.appointment_date, october(26, 9, 0));
}

#[tokio::test]
async fn test_instant_confirmation_books_as_approved() {
    let state = seeded_state(&TestConfig::instant()).await;
    let service = AppointmentBookingService::new(&state);
    let slot = seed_slot(state.store.as_ref(), "2", october(27, 12, 0)).await;

    let result = service.request_appointment("patient123", form(&slot.id)).await.unwrap();

    assert_eq!(result.reason, messages::REQUEST_CONFIRMED);
    let appointment = service.get_appointment(&result.appointment_id.unwrap()).await.unwrap();
    assert_eq!(appointment.status, AppointmentStatus::Approved);
}

#[tokio::test]
async fn test_slot_can_be_booked_only_once() {
    let (state, service) = setup().await;
    let slot = seed_slot(state.store.as_ref(), "1", october(26, 9, 0)).await;
    seed_slot(state.store.as_ref(), "1", october(26, 11, 0)).await;

    book(&service, &slot.id).await;
    let second = service.request_appointment("patient-2", form(&slot.id)).await.unwrap();

    assert!(!second.confirmation_status);
    assert_eq!(second.reason, messages::SLOT_TAKEN);
    assert_eq!(second.suggested_alternative.as_deref(), Some("2024-10-26T11:00:00.000Z"));
    assert!(second.appointment_id.is_none());
}

#[tokio::test]
async fn test_invalid_form_reports_fields() {
    let (_, service) = setup().await;
    let mut request = form("1_2024-10-26T09:00:00.000Z");
    request.patient_name = "A".to_string();

    let result = service.request_appointment("patient123", request).await;

    assert_matches!(result, Err(AppointmentError::InvalidFields(fields)) if fields[0].field == "patientName");
}

#[tokio::test]
async fn test_cancel_approved_reopens_slot() {
    let (state, service) = setup().await;
    let slot = seed_slot(state.store.as_ref(), "2", october(28, 10, 0)).await;
    let id = book(&service, &slot.id).await;
    service.approve(&id).await.unwrap();

    let release = service
        .cancel(
            &id,
            CancelAppointmentRequest {
                doctor_id: "2".to_string(),
                appointment_date: october(28, 10, 0),
            },
        )
        .await
        .unwrap();

    assert!(release.slot_restored);
    assert_eq!(release.slot.id, "2_2024-10-28T10:00:00.000Z");
    assert!(state.store.get_slot("2_2024-10-28T10:00:00.000Z").await.unwrap().is_some());
    assert_matches!(service.get_appointment(&id).await, Err(AppointmentError::NotFound(_)));
}

#[tokio::test]
async fn test_cancel_twice_fails_gracefully_and_keeps_one_slot() {
    let (state, service) = setup().await;
    let slot = seed_slot(state.store.as_ref(), "2", october(28, 10, 0)).await;
    let id = book(&service, &slot.id).await;
    let request = CancelAppointmentRequest {
        doctor_id: "2".to_string(),
        appointment_date: october(28, 10, 0),
    };

    service.cancel(&id, request.clone()).await.unwrap();
    let second = service.cancel(&id, request).await;

    assert_matches!(second, Err(AppointmentError::NotFound(_)));
    let slots = state.store.list_slots(Some("2")).await.unwrap();
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].id, slot.id);
}

#[tokio::test]
async fn test_late_repeat_cancel_keeps_slot_of_new_booking() {
    let (state, service) = setup().await;
    let slot = seed_slot(state.store.as_ref(), "2", october(28, 10, 0)).await;
    let request = CancelAppointmentRequest {
        doctor_id: "2".to_string(),
        appointment_date: october(28, 10, 0),
    };

    let first = book(&service, &slot.id).await;
    service.cancel(&first, request.clone()).await.unwrap();
    let second = book(&service, &slot.id).await;

    let stale = service.cancel(&first, request).await;
    assert_matches!(stale, Err(AppointmentError::NotFound(_)));
    assert!(state.store.get_slot(&slot.id).await.unwrap().is_none());

    let third = service.request_appointment("patient-3", form(&slot.id)).await.unwrap();
    assert!(!third.confirmation_status);

    let board = DoctorBoardService::new(&state).board("2").await.unwrap();
    assert_eq!(board.pending.len(), 1);
    assert_eq!(board.pending[0].appointment.id, second);
}

#[tokio::test]
async fn test_cancel_with_unknown_doctor_creates_no_slot() {
    let (state, service) = setup().await;

    let result = service
        .cancel(
            "bogus",
            CancelAppointmentRequest {
                doctor_id: "999".to_string(),
                appointment_date: october(28, 10, 0),
            },
        )
        .await;

    assert_matches!(result, Err(AppointmentError::NotFound(_)));
    assert!(state.store.list_slots(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cancel_one_of_two_requests_keeps_time_closed() {
    let (state, service) = setup().await;
    let slot = seed_slot(state.store.as_ref(), "1", october(26, 9, 0)).await;
    let first = book(&service, &slot.id).await;
    seed_slot(state.store.as_ref(), "1", october(26, 9, 0)).await;
    book(&service, &slot.id).await;

    let release = service
        .cancel(
            &first,
            CancelAppointmentRequest {
                doctor_id: "1".to_string(),
                appointment_date: october(26, 9, 0),
            },
        )
        .await
        .unwrap();

    assert!(!release.slot_restored);
    assert!(state.store.get_slot(&slot.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_reject_only_applies_to_pending() {
    let (state, service) = setup().await;
    let slot = seed_slot(state.store.as_ref(), "1", october(26, 9, 0)).await;
    let id = book(&service, &slot.id).await;
    service.approve(&id).await.unwrap();

    assert_matches!(
        service.reject(&id).await,
        Err(AppointmentError::InvalidStatus { status: AppointmentStatus::Approved, .. })
    );
    let kept = service.get_appointment(&id).await.unwrap();
    assert_eq!(kept.status, AppointmentStatus::Approved);
    assert!(state.store.get_slot(&slot.id).await.unwrap().is_none());

    let other = seed_slot(state.store.as_ref(), "1", october(26, 10, 0)).await;
    let pending = book(&service, &other.id).await;
    let release = service.reject(&pending).await.unwrap();
    assert!(release.slot_restored);
    assert_eq!(release.slot.id, other.id);
}

#[tokio::test]
async fn test_rejected_reschedule_keeps_original_date() {
    let (state, service) = setup().await;
    let slot = seed_slot(state.store.as_ref(), "1", october(26, 9, 0)).await;
    let id = book(&service, &slot.id).await;

    assert_matches!(
        service.request_reschedule(&id).await,
        Err(AppointmentError::InvalidStatus { status: AppointmentStatus::Pending, .. })
    );

    service.approve(&id).await.unwrap();
    let requested = service.request_reschedule(&id).await.unwrap();
    assert_eq!(requested.status, AppointmentStatus::RescheduleRequested);
    assert_eq!(requested.appointment_date, october(26, 9, 0));

    let restored = service.reject_reschedule(&id).await.unwrap();
    assert_eq!(restored.status, AppointmentStatus::Approved);
    assert_eq!(restored.appointment_date, october(26, 9, 0));
}

#[tokio::test]
async fn test_reschedule_moves_and_consumes_target_slot() {
    let (state, service) = setup().await;
    let slot = seed_slot(state.store.as_ref(), "1", october(26, 9, 0)).await;
    let target = seed_slot(state.store.as_ref(), "1", october(29, 15, 30)).await;
    let id = book(&service, &slot.id).await;
    service.approve(&id).await.unwrap();
    service.request_reschedule(&id).await.unwrap();

    let moved = service.reschedule(&id, october(29, 15, 30)).await.unwrap();

    assert_eq!(moved.status, AppointmentStatus::Approved);
    assert_eq!(moved.appointment_date, october(29, 15, 30));
    assert!(state.store.get_slot(&target.id).await.unwrap().is_none());
    assert!(state.store.get_slot(&slot.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_reschedule_truncates_to_slot_precision() {
    let (state, service) = setup().await;
    let slot = seed_slot(state.store.as_ref(), "1", october(26, 9, 0)).await;
    let target = seed_slot(state.store.as_ref(), "1", october(29, 15, 30)).await;
    let id = book(&service, &slot.id).await;
    service.approve(&id).await.unwrap();

    let new_date = october(29, 15, 30) + chrono::Duration::microseconds(400);
    let moved = service.reschedule(&id, new_date).await.unwrap();

    assert_eq!(moved.appointment_date, october(29, 15, 30));
    assert!(state.store.get_slot(&target.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_pending_requests_are_flagged_after_approval() {
    let (state, service) = setup().await;
    let boards = DoctorBoardService::new(&state);
    let slot = seed_slot(state.store.as_ref(), "1", october(26, 9, 0)).await;

    let first = book(&service, &slot.id).await;
    seed_slot(state.store.as_ref(), "1", october(26, 9, 0)).await;
    let second = book(&service, &slot.id).await;

    let board = boards.board("1").await.unwrap();
    assert_eq!(board.pending.len(), 2);
    assert!(board.pending.iter().all(|entry| !entry.in_conflict));

    service.approve(&first).await.unwrap();

    let board = boards.board("1").await.unwrap();
    assert_eq!(board.approved.len(), 1);
    assert_eq!(board.pending.len(), 1);
    assert_eq!(board.pending[0].appointment.id, second);
    assert!(board.pending[0].in_conflict);
}

#[tokio::test]
async fn test_board_of_unknown_doctor_is_not_found() {
    let (state, _) = setup().await;
    let boards = DoctorBoardService::new(&state);

    assert_matches!(boards.board("404").await, Err(AppointmentError::DoctorNotFound(_)));
}

#[tokio::test]
async fn test_board_feed_pushes_full_snapshots() {
    let (state, service) = setup().await;
    let boards = DoctorBoardService::new(&state);
    let slot = seed_slot(state.store.as_ref(), "1", october(26, 9, 0)).await;

    let feed = boards.board_feed("1".to_string());
    futures::pin_mut!(feed);

    let initial = feed.next().await.unwrap().unwrap();
    assert!(initial.pending.is_empty());

    book(&service, &slot.id).await;

    let updated = feed.next().await.unwrap().unwrap();
    assert_eq!(updated.pending.len(), 1);
}
