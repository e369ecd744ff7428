use std::sync::Arc;

use axum::{routing::get, Router};

use shared_database::AppState;

use crate::handlers::*;

pub fn create_patient_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/dashboard", get(get_patient_dashboard))
        .route("/appointments/live", get(patient_appointments_live))
        .with_state(state)
}
