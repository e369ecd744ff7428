use axum::{extract::State, Json};

use auth_cell::handlers::{list_roles, login};
use shared_models::auth::{LoginRequest, Role};
use shared_utils::test_utils::TestConfig;

#[tokio::test]
async fn test_patient_login_gets_demo_identity() {
    let state = TestConfig::default().to_state();

    let Json(response) = login(State(state), Json(LoginRequest { role: Role::Patient })).await;

    assert_eq!(response.role, Role::Patient);
    assert_eq!(response.redirect, "/patient/dashboard");
    assert_eq!(response.patient_id.as_deref(), Some("patient123"));
}

#[tokio::test]
async fn test_doctor_login_has_no_patient_id() {
    let state = TestConfig::default().to_state();

    let Json(response) = login(State(state), Json(LoginRequest { role: Role::Doctor })).await;

    assert_eq!(response.redirect, "/doctors");
    assert!(response.patient_id.is_none());

    let json = serde_json::to_value(&response).unwrap();
    assert!(json.get("patientId").is_none());
}

#[tokio::test]
async fn test_roles_lists_both_views() {
    let Json(json) = list_roles().await;

    let roles = json["roles"].as_array().unwrap();
    assert_eq!(roles.len(), 2);
    assert_eq!(roles[0]["role"], "patient");
    assert_eq!(roles[1]["redirect"], "/doctors");
}
