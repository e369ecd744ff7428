use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use futures::Stream;
use tracing::{debug, error, info};

use shared_database::live::snapshot_stream;
use shared_database::{AppState, ClinicStore, SlotWrite, StoreError};

use crate::models::{AppointmentSlot, DoctorError};

/// Administration and lookup of bookable slots.
pub struct AvailabilityService {
    store: Arc<dyn ClinicStore>,
}

impl AvailabilityService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
        }
    }

    pub fn with_store(store: Arc<dyn ClinicStore>) -> Self {
        Self { store }
    }

    /// Opens a slot. Never overwrites an existing slot for the same doctor
    /// and time.
    pub async fn create_slot(
        &self,
        doctor_id: &str,
        date: DateTime<Utc>,
    ) -> Result<AppointmentSlot, DoctorError> {
        if doctor_id.trim().is_empty() {
            return Err(DoctorError::MissingData("doctor id"));
        }

        if self.store.get_doctor(doctor_id).await?.is_none() {
            return Err(DoctorError::NotFound(doctor_id.to_string()));
        }

        let slot = AppointmentSlot::new(doctor_id, date);
        debug!("Creating slot {}", slot.id);

        match self.store.create_slot(slot).await? {
            SlotWrite::Created(slot) => {
                info!("Slot {} created", slot.id);
                Ok(slot)
            }
            SlotWrite::AlreadyExists(existing) => {
                debug!("Slot {} already exists", existing.id);
                Err(DoctorError::SlotAlreadyExists(existing.id))
            }
        }
    }

    /// Removes a slot. Removing a missing slot is not an error.
    pub async fn delete_slot(&self, slot_id: &str) -> Result<bool, DoctorError> {
        if slot_id.trim().is_empty() {
            return Err(DoctorError::MissingData("slot id"));
        }

        let removed = self.store.delete_slot(slot_id).await.map_err(|e| {
            error!("Error deleting slot {}: {}", slot_id, e);
            e
        })?;

        if removed {
            info!("Slot {} deleted", slot_id);
        } else {
            debug!("Slot {} was already gone", slot_id);
        }
        Ok(removed)
    }

    pub async fn list_slots(
        &self,
        doctor_id: &str,
        day: Option<NaiveDate>,
    ) -> Result<Vec<AppointmentSlot>, DoctorError> {
        let slots = self.store.list_slots(Some(doctor_id)).await?;
        Ok(filter_day(slots, day))
    }

    pub async fn list_open_slots(&self) -> Result<Vec<AppointmentSlot>, DoctorError> {
        Ok(self.store.list_slots(None).await?)
    }

    /// Earliest open slot of the doctor strictly after `after`.
    pub async fn next_open_slot(
        &self,
        doctor_id: &str,
        after: DateTime<Utc>,
    ) -> Result<Option<AppointmentSlot>, DoctorError> {
        let slots = self.store.list_slots(Some(doctor_id)).await?;
        Ok(slots.into_iter().find(|slot| slot.date > after))
    }

    /// Full slot list of a doctor, re-sent after every change to it.
    pub fn slot_feed(
        &self,
        doctor_id: String,
        day: Option<NaiveDate>,
    ) -> impl Stream<Item = Result<Vec<AppointmentSlot>, StoreError>> + Send {
        let store = self.store.clone();
        let watched = doctor_id.clone();

        snapshot_stream(
            self.store.subscribe(),
            move |change| change.touches_slots_of(&watched),
            move || {
                let store = store.clone();
                let doctor_id = doctor_id.clone();
                async move {
                    let slots = store.list_slots(Some(&doctor_id)).await?;
                    Ok(filter_day(slots, day))
                }
            },
        )
    }
}

fn filter_day(slots: Vec<AppointmentSlot>, day: Option<NaiveDate>) -> Vec<AppointmentSlot> {
    match day {
        Some(day) => slots
            .into_iter()
            .filter(|slot| slot.date.date_naive() == day)
            .collect(),
        None => slots,
    }
}
