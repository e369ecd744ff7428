use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::{json, Value};

use shared_database::AppState;
use shared_models::error::AppError;
use shared_utils::extractor::PatientIdentity;
use shared_utils::sse::snapshot_events;

use crate::services::PatientService;

#[axum::debug_handler]
pub async fn get_patient_dashboard(
    State(state): State<Arc<AppState>>,
    patient: PatientIdentity,
) -> Result<Json<Value>, AppError> {
    let patient_service = PatientService::new(&state);

    let dashboard = patient_service.dashboard(patient.id()).await?;

    Ok(Json(json!(dashboard)))
}

pub async fn patient_appointments_live(
    State(state): State<Arc<AppState>>,
    patient: PatientIdentity,
) -> impl IntoResponse {
    let patient_service = PatientService::new(&state);
    snapshot_events(patient_service.appointments_feed(patient.0))
}
