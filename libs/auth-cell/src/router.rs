use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use shared_database::AppState;

use crate::handlers;

pub fn auth_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/roles", get(handlers::list_roles))
        .route("/login", post(handlers::login))
        .with_state(state)
}
