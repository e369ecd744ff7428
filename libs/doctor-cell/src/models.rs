use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_database::StoreError;
use shared_models::error::AppError;
pub use shared_models::clinic::{AppointmentSlot, Doctor, DoctorIcon};

// ==============================================================================
// RESPONSES
// ==============================================================================

/// Doctor record plus the asset its icon tag resolves to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorProfile {
    #[serde(flatten)]
    pub doctor: Doctor,
    pub icon_asset: String,
}

impl From<Doctor> for DoctorProfile {
    fn from(doctor: Doctor) -> Self {
        let icon_asset = doctor.icon.asset_name().to_string();
        Self { doctor, icon_asset }
    }
}

// ==============================================================================
// SLOT REQUESTS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSlotRequest {
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlotQuery {
    /// Restrict to one UTC calendar day.
    pub day: Option<NaiveDate>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Error)]
pub enum DoctorError {
    #[error("Doctor {0} not found")]
    NotFound(String),

    #[error("Slot {0} already exists")]
    SlotAlreadyExists(String),

    #[error("Missing data: {0}")]
    MissingData(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// User-facing texts for slot administration.
pub mod messages {
    pub const SLOT_CREATED: &str = "Time slot created successfully.";
    pub const SLOT_EXISTS: &str = "This time slot already exists.";
    pub const SLOT_CREATE_FAILED: &str = "An error occurred while creating the time slot.";
    pub const SLOT_CREATE_MISSING: &str = "Missing data to create the time slot.";
    pub const SLOT_DELETED: &str = "Time slot deleted successfully.";
    pub const SLOT_DELETE_FAILED: &str = "An error occurred while deleting the time slot.";
    pub const SLOT_DELETE_MISSING: &str = "Missing time slot ID.";
    pub const DOCTOR_NOT_FOUND: &str = "The selected doctor does not exist.";
}

impl From<DoctorError> for AppError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::NotFound(_) => AppError::NotFound(messages::DOCTOR_NOT_FOUND.to_string()),
            DoctorError::SlotAlreadyExists(_) => AppError::Conflict(messages::SLOT_EXISTS.to_string()),
            DoctorError::MissingData(what) => AppError::BadRequest(format!("Missing {}", what)),
            DoctorError::Store(e) => AppError::Database(e.to_string()),
        }
    }
}
