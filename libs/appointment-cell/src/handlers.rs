use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};
use tracing::error;

use shared_database::AppState;
use shared_models::action::ActionResponse;
use shared_models::error::AppError;
use shared_utils::extractor::PatientIdentity;
use shared_utils::sse::snapshot_events;

use crate::models::{
    messages, AppointmentError, BookAppointmentRequest, CancelAppointmentRequest,
    ConfirmAppointmentInput, ConfirmationResult, MissingField, RescheduleAppointmentRequest,
};
use crate::services::{confirm_appointment, AppointmentBookingService, DoctorBoardService};

/// Converts a lifecycle outcome into the `{success, message}` body. Store
/// failures are logged and reported with `failure` only.
fn action_outcome<T>(
    appointment_id: &str,
    result: Result<T, AppointmentError>,
    success: &str,
    failure: &str,
) -> ActionResponse {
    match result {
        Ok(_) => ActionResponse::ok(success),
        Err(AppointmentError::NotFound(_)) => {
            ActionResponse::failed(StatusCode::NOT_FOUND, messages::NOT_FOUND)
        }
        Err(AppointmentError::InvalidStatus { .. }) => {
            ActionResponse::failed(StatusCode::CONFLICT, messages::INVALID_STATUS)
        }
        Err(AppointmentError::MissingData(MissingField::AppointmentId)) => {
            ActionResponse::failed(StatusCode::BAD_REQUEST, messages::MISSING_ID)
        }
        Err(AppointmentError::MissingData(MissingField::DoctorId)) => {
            ActionResponse::failed(StatusCode::BAD_REQUEST, failure)
        }
        Err(e) => {
            error!("Action on appointment {} failed: {}", appointment_id, e);
            ActionResponse::failed(StatusCode::INTERNAL_SERVER_ERROR, failure)
        }
    }
}

// ==============================================================================
// BOOKING
// ==============================================================================

#[axum::debug_handler]
pub async fn request_appointment(
    State(state): State<Arc<AppState>>,
    patient: PatientIdentity,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<ConfirmationResult>), AppError> {
    let booking_service = AppointmentBookingService::new(&state);

    match booking_service.request_appointment(patient.id(), request).await {
        Ok(result) if result.confirmation_status => Ok((StatusCode::CREATED, Json(result))),
        Ok(result) => Ok((StatusCode::CONFLICT, Json(result))),
        Err(AppointmentError::InvalidFields(fields)) => Err(AppError::InvalidFields(fields)),
        Err(e @ AppointmentError::DoctorNotFound(_)) => Err(e.into()),
        Err(e) => {
            error!("Error creating appointment request: {}", e);
            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ConfirmationResult::declined(messages::REQUEST_FAILED, None)),
            ))
        }
    }
}

#[axum::debug_handler]
pub async fn confirm_request(
    Json(input): Json<ConfirmAppointmentInput>,
) -> Json<ConfirmationResult> {
    Json(confirm_appointment(&input))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let booking_service = AppointmentBookingService::new(&state);

    let appointment = booking_service.get_appointment(&appointment_id).await?;

    Ok(Json(json!(appointment)))
}

// ==============================================================================
// LIFECYCLE
// ==============================================================================

#[axum::debug_handler]
pub async fn approve_appointment(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<String>,
) -> ActionResponse {
    let booking_service = AppointmentBookingService::new(&state);
    let result = booking_service.approve(&appointment_id).await;
    action_outcome(&appointment_id, result, messages::APPROVED, messages::APPROVE_FAILED)
}

#[axum::debug_handler]
pub async fn reject_appointment(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<String>,
) -> ActionResponse {
    let booking_service = AppointmentBookingService::new(&state);
    let result = booking_service.reject(&appointment_id).await;
    action_outcome(&appointment_id, result, messages::REJECTED, messages::REJECT_FAILED)
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<String>,
    Json(request): Json<CancelAppointmentRequest>,
) -> ActionResponse {
    let booking_service = AppointmentBookingService::new(&state);
    match booking_service.cancel(&appointment_id, request).await {
        Err(AppointmentError::MissingData(_)) => {
            ActionResponse::failed(StatusCode::BAD_REQUEST, messages::CANCEL_MISSING)
        }
        result => action_outcome(&appointment_id, result, messages::CANCELLED, messages::CANCEL_FAILED),
    }
}

#[axum::debug_handler]
pub async fn request_reschedule(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<String>,
) -> ActionResponse {
    let booking_service = AppointmentBookingService::new(&state);
    let result = booking_service.request_reschedule(&appointment_id).await;
    action_outcome(
        &appointment_id,
        result,
        messages::RESCHEDULE_REQUESTED,
        messages::RESCHEDULE_REQUEST_FAILED,
    )
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<String>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> ActionResponse {
    let booking_service = AppointmentBookingService::new(&state);
    let result = booking_service.reschedule(&appointment_id, request.new_date).await;
    action_outcome(&appointment_id, result, messages::RESCHEDULED, messages::RESCHEDULE_FAILED)
}

#[axum::debug_handler]
pub async fn reject_reschedule(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<String>,
) -> ActionResponse {
    let booking_service = AppointmentBookingService::new(&state);
    let result = booking_service.reject_reschedule(&appointment_id).await;
    action_outcome(
        &appointment_id,
        result,
        messages::RESCHEDULE_REJECTED,
        messages::RESCHEDULE_REJECT_FAILED,
    )
}

// ==============================================================================
// DOCTOR DASHBOARD
// ==============================================================================

#[axum::debug_handler]
pub async fn doctor_dashboard(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let board_service = DoctorBoardService::new(&state);

    let board = board_service.board(&doctor_id).await?;

    Ok(Json(json!(board)))
}

pub async fn doctor_dashboard_live(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let board_service = DoctorBoardService::new(&state);
    board_service.ensure_doctor(&doctor_id).await?;

    Ok(snapshot_events(board_service.board_feed(doctor_id)))
}
