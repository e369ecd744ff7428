use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_database::StoreError;
use shared_models::error::{AppError, FieldError};

pub use shared_models::clinic::{Appointment, AppointmentStatus, DoctorSnapshot, NewAppointment};

// ==============================================================================
// BOOKING
// ==============================================================================

/// Patient form submitted against one open slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookAppointmentRequest {
    pub patient_name: String,
    pub contact_number: String,
    #[serde(default)]
    pub requirements: Option<String>,
    pub slot_id: String,
}

/// Outcome of a booking request as shown to the patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationResult {
    pub confirmation_status: bool,
    pub reason: String,
    /// ISO time of another open slot of the same doctor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_alternative: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appointment_id: Option<String>,
}

impl ConfirmationResult {
    pub fn confirmed(reason: impl Into<String>, appointment_id: Option<String>) -> Self {
        Self {
            confirmation_status: true,
            reason: reason.into(),
            suggested_alternative: None,
            appointment_id,
        }
    }

    pub fn declined(reason: impl Into<String>, suggested_alternative: Option<String>) -> Self {
        Self {
            confirmation_status: false,
            reason: reason.into(),
            suggested_alternative,
            appointment_id: None,
        }
    }
}

/// Input of the confirmation check. Date and time are the display strings
/// the patient saw.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmAppointmentInput {
    pub patient_name: String,
    pub contact_number: String,
    pub appointment_date: String,
    pub appointment_time: String,
    pub doctor_name: String,
    #[serde(default)]
    pub requirements: Option<String>,
}

// ==============================================================================
// LIFECYCLE REQUESTS
// ==============================================================================

/// Where the freed slot goes if the appointment is already gone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelAppointmentRequest {
    pub doctor_id: String,
    pub appointment_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleAppointmentRequest {
    pub new_date: DateTime<Utc>,
}

// ==============================================================================
// DOCTOR DASHBOARD
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardEntry {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub in_conflict: bool,
}

/// One doctor's appointments grouped by status, each group sorted by date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorBoard {
    pub doctor_id: String,
    pub pending: Vec<BoardEntry>,
    pub approved: Vec<Appointment>,
    pub reschedule_requested: Vec<Appointment>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

/// Required identifier left blank in a lifecycle request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingField {
    AppointmentId,
    DoctorId,
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingField::AppointmentId => f.write_str("appointment id"),
            MissingField::DoctorId => f.write_str("doctor id"),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppointmentError {
    #[error("Appointment {0} not found")]
    NotFound(String),

    #[error("Slot {0} is no longer available")]
    SlotUnavailable(String),

    #[error("Doctor {0} not found")]
    DoctorNotFound(String),

    #[error("Appointment {id} cannot change while {status}")]
    InvalidStatus { id: String, status: AppointmentStatus },

    #[error("Invalid booking form")]
    InvalidFields(Vec<FieldError>),

    #[error("Missing data: {0}")]
    MissingData(MissingField),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for AppointmentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => AppointmentError::NotFound(what),
            StoreError::SlotUnavailable(slot_id) => AppointmentError::SlotUnavailable(slot_id),
            StoreError::StatusMismatch { id, actual, .. } => {
                AppointmentError::InvalidStatus { id, status: actual }
            }
            other => AppointmentError::Store(other),
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound(_) => AppError::NotFound(messages::NOT_FOUND.to_string()),
            AppointmentError::DoctorNotFound(_) => {
                AppError::NotFound("The selected doctor does not exist.".to_string())
            }
            AppointmentError::SlotUnavailable(_) => AppError::Conflict(messages::SLOT_TAKEN.to_string()),
            AppointmentError::InvalidStatus { .. } => {
                AppError::Conflict(messages::INVALID_STATUS.to_string())
            }
            AppointmentError::InvalidFields(fields) => AppError::InvalidFields(fields),
            AppointmentError::MissingData(what) => AppError::BadRequest(format!("Missing {}", what)),
            AppointmentError::Store(e) => AppError::Database(e.to_string()),
        }
    }
}

/// User-facing texts for booking and lifecycle actions.
pub mod messages {
    pub const REQUEST_SENT: &str = "Your request has been sent. The doctor will review it and you will be notified once it is approved.";
    pub const REQUEST_CONFIRMED: &str = "Your appointment has been confirmed.";
    pub const REQUEST_FAILED: &str = "An error occurred while processing your request. Please try again later.";
    pub const SLOT_TAKEN: &str = "This time slot is no longer available.";

    pub const APPROVED: &str = "The appointment has been approved.";
    pub const APPROVE_FAILED: &str = "An error occurred while approving the appointment.";
    pub const REJECTED: &str = "The request has been rejected.";
    pub const REJECT_FAILED: &str = "An error occurred while rejecting the request.";

    pub const CANCELLED: &str = "The appointment has been cancelled successfully.";
    pub const CANCEL_FAILED: &str = "An error occurred while cancelling the appointment.";
    pub const CANCEL_MISSING: &str = "Missing data for cancellation.";

    pub const RESCHEDULE_REQUESTED: &str = "Your request to postpone the appointment has been sent to the doctor.";
    pub const RESCHEDULE_REQUEST_FAILED: &str = "An error occurred while sending your request.";
    pub const RESCHEDULED: &str = "The appointment has been rescheduled successfully.";
    pub const RESCHEDULE_FAILED: &str = "An error occurred while rescheduling the appointment.";
    pub const RESCHEDULE_REJECTED: &str = "The reschedule request has been rejected and the appointment is approved again.";
    pub const RESCHEDULE_REJECT_FAILED: &str = "An error occurred while rejecting the reschedule request.";

    pub const MISSING_ID: &str = "Missing appointment ID.";
    pub const NOT_FOUND: &str = "The appointment no longer exists.";
    pub const INVALID_STATUS: &str = "The appointment cannot be changed in its current status.";
}
