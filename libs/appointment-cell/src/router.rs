use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use shared_database::AppState;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", post(handlers::request_appointment))
        .route("/confirm", post(handlers::confirm_request))
        .route("/{appointment_id}", get(handlers::get_appointment))
        // doctor decisions
        .route("/{appointment_id}/approve", post(handlers::approve_appointment))
        .route("/{appointment_id}/reject", post(handlers::reject_appointment))
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))
        // rescheduling
        .route("/{appointment_id}/reschedule-request", post(handlers::request_reschedule))
        .route("/{appointment_id}/reschedule", post(handlers::reschedule_appointment))
        .route("/{appointment_id}/reschedule-reject", post(handlers::reject_reschedule))
        .with_state(state)
}

/// Mounted under `/doctor`.
pub fn doctor_dashboard_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/{doctor_id}/dashboard", get(handlers::doctor_dashboard))
        .route("/{doctor_id}/dashboard/live", get(handlers::doctor_dashboard_live))
        .with_state(state)
}
