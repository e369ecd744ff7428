use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_database::StoreError;
use shared_models::clinic::{Appointment, AppointmentSlot, AppointmentStatus, Doctor};
use shared_models::error::AppError;

/// An appointment of the patient joined with the full doctor record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookedAppointment {
    pub id: String,
    pub date: DateTime<Utc>,
    pub doctor_id: String,
    pub doctor: Doctor,
    pub status: AppointmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirements: Option<String>,
}

impl BookedAppointment {
    pub fn new(appointment: Appointment, doctor: Doctor) -> Self {
        Self {
            id: appointment.id,
            date: appointment.appointment_date,
            doctor_id: doctor.id.clone(),
            doctor,
            status: appointment.status,
            requirements: appointment.requirements,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientDashboard {
    pub patient_id: String,
    pub doctors: Vec<Doctor>,
    pub appointments: Vec<BookedAppointment>,
    /// Open slots minus those at a (doctor, time) the patient already holds.
    pub available_slots: Vec<AppointmentSlot>,
}

/// (doctor id, instant) pairs held by the patient.
pub fn held_times(appointments: &[BookedAppointment]) -> HashSet<(String, DateTime<Utc>)> {
    appointments
        .iter()
        .map(|booked| (booked.doctor_id.clone(), booked.date))
        .collect()
}

#[derive(Debug, Error)]
pub enum PatientError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<PatientError> for AppError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::Store(e) => AppError::Database(e.to_string()),
        }
    }
}
