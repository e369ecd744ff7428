use std::sync::Arc;

use axum::{
    routing::{delete, get},
    Router,
};

use shared_database::AppState;

use crate::handlers;

pub fn doctor_routes(state: Arc<AppState>) -> Router {
    let slot_routes = Router::new()
        .route("/slots", get(handlers::list_open_slots))
        .route("/slots/{slot_id}", delete(handlers::delete_slot));

    let doctor_routes = Router::new()
        .route("/", get(handlers::list_doctors))
        .route("/{doctor_id}", get(handlers::get_doctor))
        .route(
            "/{doctor_id}/slots",
            get(handlers::list_doctor_slots).post(handlers::create_slot),
        )
        .route("/{doctor_id}/slots/live", get(handlers::doctor_slots_live));

    Router::new()
        .merge(slot_routes)
        .merge(doctor_routes)
        .with_state(state)
}
