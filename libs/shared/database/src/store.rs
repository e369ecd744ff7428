use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::broadcast;

use shared_models::clinic::{
    Appointment, AppointmentSlot, AppointmentStatus, Doctor, NewAppointment,
};

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("slot {0} is no longer available")]
    SlotUnavailable(String),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("appointment {id} is {actual}, expected one of {expected:?}")]
    StatusMismatch {
        id: String,
        actual: AppointmentStatus,
        expected: Vec<AppointmentStatus>,
    },

    #[error("store backend error: {0}")]
    Backend(String),

    #[error("could not decode {collection} document: {message}")]
    Decode {
        collection: &'static str,
        message: String,
    },
}

/// Result of a slot insert that never overwrites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotWrite {
    Created(AppointmentSlot),
    AlreadyExists(AppointmentSlot),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentFilter {
    pub doctor_id: Option<String>,
    pub patient_id: Option<String>,
    pub status: Option<AppointmentStatus>,
}

impl AppointmentFilter {
    pub fn for_doctor(doctor_id: &str) -> Self {
        Self {
            doctor_id: Some(doctor_id.to_string()),
            ..Self::default()
        }
    }

    pub fn for_patient(patient_id: &str) -> Self {
        Self {
            patient_id: Some(patient_id.to_string()),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: AppointmentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.doctor_id.as_deref().map_or(true, |id| appointment.doctor.id == id)
            && self.patient_id.as_deref().map_or(true, |id| appointment.patient_id == id)
            && self.status.map_or(true, |status| appointment.status == status)
    }
}

/// Target of a compare-and-swap status transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub status: AppointmentStatus,
    /// When set, the appointment moves to this time and any open slot of the
    /// same doctor at that time is consumed.
    pub appointment_date: Option<DateTime<Utc>>,
}

impl StatusUpdate {
    pub fn to(status: AppointmentStatus) -> Self {
        Self {
            status,
            appointment_date: None,
        }
    }

    pub fn moved_to(status: AppointmentStatus, date: DateTime<Utc>) -> Self {
        Self {
            status,
            appointment_date: Some(date),
        }
    }
}

/// Outcome of deleting an appointment and giving its time back as a slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Release {
    /// The deleted appointment, `None` if it was already gone.
    pub appointment: Option<Appointment>,
    pub slot: AppointmentSlot,
    /// False when no slot was written.
    pub slot_restored: bool,
}

/// Change notification fanned out to live subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    Doctors,
    Slots { doctor_id: String },
    Appointments { doctor_id: String, patient_id: String },
}

impl StoreChange {
    pub fn touches_doctor(&self, id: &str) -> bool {
        match self {
            StoreChange::Doctors => true,
            StoreChange::Slots { doctor_id } => doctor_id == id,
            StoreChange::Appointments { doctor_id, .. } => doctor_id == id,
        }
    }

    /// Whether the patient's appointment list (joined with doctors) changed.
    pub fn touches_patient(&self, id: &str) -> bool {
        match self {
            StoreChange::Doctors => true,
            StoreChange::Slots { .. } => false,
            StoreChange::Appointments { patient_id, .. } => patient_id == id,
        }
    }

    pub fn touches_slots_of(&self, id: &str) -> bool {
        match self {
            StoreChange::Slots { doctor_id } => doctor_id == id,
            // booking and cancelling move slots as well
            StoreChange::Appointments { doctor_id, .. } => doctor_id == id,
            StoreChange::Doctors => false,
        }
    }
}

/// Repository over the three clinic collections. Composite operations are
/// atomic: implementations must never leave a half-applied booking,
/// cancellation or reschedule behind.
#[async_trait]
pub trait ClinicStore: Send + Sync {
    async fn list_doctors(&self) -> Result<Vec<Doctor>, StoreError>;

    async fn get_doctor(&self, doctor_id: &str) -> Result<Option<Doctor>, StoreError>;

    /// Insert or replace a doctor record.
    async fn put_doctor(&self, doctor: Doctor) -> Result<(), StoreError>;

    /// Slots sorted by date, optionally for a single doctor.
    async fn list_slots(&self, doctor_id: Option<&str>) -> Result<Vec<AppointmentSlot>, StoreError>;

    async fn get_slot(&self, slot_id: &str) -> Result<Option<AppointmentSlot>, StoreError>;

    /// Inserts the slot unless one with the same id exists.
    async fn create_slot(&self, slot: AppointmentSlot) -> Result<SlotWrite, StoreError>;

    /// Returns whether a slot was removed.
    async fn delete_slot(&self, slot_id: &str) -> Result<bool, StoreError>;

    /// Appointments sorted by appointment date.
    async fn list_appointments(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, StoreError>;

    async fn get_appointment(&self, appointment_id: &str) -> Result<Option<Appointment>, StoreError>;

    /// Removes the slot and creates the appointment in one step. Fails with
    /// `SlotUnavailable` when the slot is gone.
    async fn book_slot(&self, slot_id: &str, booking: NewAppointment) -> Result<Appointment, StoreError>;

    /// Applies `update` only if the stored status is one of `expected`.
    async fn transition_appointment(
        &self,
        appointment_id: &str,
        expected: &[AppointmentStatus],
        update: StatusUpdate,
    ) -> Result<Appointment, StoreError>;

    /// Deletes the appointment if its stored status is one of `expected`,
    /// then recreates its slot. The stored appointment's doctor and date win
    /// over `fallback_slot`, which is only used when the appointment is
    /// already gone. The slot is left alone when it exists, when its doctor
    /// is unknown, or while another appointment still holds that time.
    async fn release_appointment(
        &self,
        appointment_id: &str,
        expected: &[AppointmentStatus],
        fallback_slot: AppointmentSlot,
    ) -> Result<Release, StoreError>;

    fn subscribe(&self) -> broadcast::Receiver<StoreChange>;
}
