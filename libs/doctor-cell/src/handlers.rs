use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};
use tracing::error;

use shared_database::AppState;
use shared_models::action::ActionResponse;
use shared_models::error::AppError;
use shared_utils::sse::snapshot_events;

use crate::models::{messages, CreateSlotRequest, DoctorError, DoctorProfile, SlotQuery};
use crate::services::{AvailabilityService, DoctorService};

// ==============================================================================
// DOCTORS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(&state);

    let doctors: Vec<DoctorProfile> = doctor_service
        .list_doctors()
        .await?
        .into_iter()
        .map(DoctorProfile::from)
        .collect();

    Ok(Json(json!({
        "doctors": doctors,
        "total": doctors.len()
    })))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(&state);

    let doctor = doctor_service.get_doctor(&doctor_id).await?;

    Ok(Json(json!(DoctorProfile::from(doctor))))
}

// ==============================================================================
// SLOTS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_doctor_slots(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<String>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<Value>, AppError> {
    let availability_service = AvailabilityService::new(&state);

    let slots = availability_service.list_slots(&doctor_id, query.day).await?;

    Ok(Json(json!({
        "doctorId": doctor_id,
        "day": query.day,
        "slots": slots,
        "total": slots.len()
    })))
}

#[axum::debug_handler]
pub async fn list_open_slots(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    let availability_service = AvailabilityService::new(&state);

    let slots = availability_service.list_open_slots().await?;

    Ok(Json(json!({
        "slots": slots,
        "total": slots.len()
    })))
}

#[axum::debug_handler]
pub async fn create_slot(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<String>,
    Json(request): Json<CreateSlotRequest>,
) -> ActionResponse {
    let availability_service = AvailabilityService::new(&state);

    match availability_service.create_slot(&doctor_id, request.date).await {
        Ok(_) => ActionResponse::ok(messages::SLOT_CREATED),
        Err(DoctorError::SlotAlreadyExists(_)) => {
            ActionResponse::failed(StatusCode::CONFLICT, messages::SLOT_EXISTS)
        }
        Err(DoctorError::NotFound(_)) => {
            ActionResponse::failed(StatusCode::NOT_FOUND, messages::DOCTOR_NOT_FOUND)
        }
        Err(DoctorError::MissingData(_)) => {
            ActionResponse::failed(StatusCode::BAD_REQUEST, messages::SLOT_CREATE_MISSING)
        }
        Err(DoctorError::Store(e)) => {
            error!("Error creating slot for doctor {}: {}", doctor_id, e);
            ActionResponse::failed(StatusCode::INTERNAL_SERVER_ERROR, messages::SLOT_CREATE_FAILED)
        }
    }
}

#[axum::debug_handler]
pub async fn delete_slot(
    State(state): State<Arc<AppState>>,
    Path(slot_id): Path<String>,
) -> ActionResponse {
    let availability_service = AvailabilityService::new(&state);

    match availability_service.delete_slot(&slot_id).await {
        Ok(_) => ActionResponse::ok(messages::SLOT_DELETED),
        Err(DoctorError::MissingData(_)) => {
            ActionResponse::failed(StatusCode::BAD_REQUEST, messages::SLOT_DELETE_MISSING)
        }
        Err(e) => {
            error!("Error deleting slot {}: {}", slot_id, e);
            ActionResponse::failed(StatusCode::INTERNAL_SERVER_ERROR, messages::SLOT_DELETE_FAILED)
        }
    }
}

/// Live slot list of one doctor as server-sent events.
pub async fn doctor_slots_live(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<String>,
    Query(query): Query<SlotQuery>,
) -> impl IntoResponse {
    let availability_service = AvailabilityService::new(&state);
    snapshot_events(availability_service.slot_feed(doctor_id, query.day))
}
