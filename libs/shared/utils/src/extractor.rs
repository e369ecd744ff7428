use std::sync::Arc;

use axum::extract::FromRequestParts;
use http::request::Parts;
use tracing::debug;

use shared_database::AppState;
use shared_models::error::AppError;

pub const PATIENT_ID_HEADER: &str = "x-patient-id";

/// Patient the request acts for. There is no login, so this is the
/// `x-patient-id` header when present and the configured demo patient
/// otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientIdentity(pub String);

impl PatientIdentity {
    pub fn id(&self) -> &str {
        &self.0
    }
}

impl FromRequestParts<Arc<AppState>> for PatientIdentity {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(header) = parts.headers.get(PATIENT_ID_HEADER) else {
            return Ok(Self(state.config.demo_patient_id.clone()));
        };

        let patient_id = header
            .to_str()
            .map_err(|_| AppError::BadRequest("Invalid x-patient-id header".to_string()))?
            .trim();

        if patient_id.is_empty() {
            return Err(AppError::BadRequest("Empty x-patient-id header".to_string()));
        }

        debug!("Acting for patient {}", patient_id);
        Ok(Self(patient_id.to_string()))
    }
}
