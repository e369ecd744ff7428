use std::sync::Arc;

use axum::extract::{Json, State};
use serde_json::{json, Value};
use tracing::{debug, info};

use shared_database::AppState;
use shared_models::auth::{LoginRequest, LoginResponse, Role};

/// Roles offered on the login screen with the dashboard each one opens.
pub async fn list_roles() -> Json<Value> {
    let roles: Vec<Value> = Role::all()
        .iter()
        .map(|role| {
            json!({
                "role": role,
                "redirect": role.dashboard_path()
            })
        })
        .collect();

    Json(json!({ "roles": roles }))
}

/// Role selection without credentials. A patient is handed the configured
/// demo identity to send back as `x-patient-id`.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Json<LoginResponse> {
    debug!("Login as {:?}", request.role);

    let patient_id = match request.role {
        Role::Patient => Some(state.config.demo_patient_id.clone()),
        Role::Doctor => None,
    };

    info!("Entered the {:?} view", request.role);

    Json(LoginResponse {
        role: request.role,
        redirect: request.role.dashboard_path().to_string(),
        patient_id,
    })
}
