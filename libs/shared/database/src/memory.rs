use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;
use uuid::Uuid;

use shared_models::clinic::{
    normalize_instant, slot_id, Appointment, AppointmentSlot, AppointmentStatus, Doctor,
    NewAppointment,
};

use crate::store::{
    AppointmentFilter, ClinicStore, Release, SlotWrite, StatusUpdate, StoreChange, StoreError,
};

#[derive(Default)]
struct Collections {
    doctors: BTreeMap<String, Doctor>,
    slots: BTreeMap<String, AppointmentSlot>,
    appointments: HashMap<String, Appointment>,
}

/// Process-local store. One lock guards all collections so composite
/// operations are atomic.
pub struct InMemoryStore {
    inner: RwLock<Collections>,
    changes: broadcast::Sender<StoreChange>,
}

impl InMemoryStore {
    pub fn new(channel_capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(channel_capacity.max(1));
        Self {
            inner: RwLock::new(Collections::default()),
            changes,
        }
    }

    fn publish(&self, change: StoreChange) {
        // no subscribers is fine
        let _ = self.changes.send(change);
    }

    fn appointment_change(appointment: &Appointment) -> StoreChange {
        StoreChange::Appointments {
            doctor_id: appointment.doctor.id.clone(),
            patient_id: appointment.patient_id.clone(),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(shared_config::DEFAULT_LIVE_CHANNEL_CAPACITY)
    }
}

#[async_trait]
impl ClinicStore for InMemoryStore {
    async fn list_doctors(&self) -> Result<Vec<Doctor>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.doctors.values().cloned().collect())
    }

    async fn get_doctor(&self, doctor_id: &str) -> Result<Option<Doctor>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.doctors.get(doctor_id).cloned())
    }

    async fn put_doctor(&self, doctor: Doctor) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.doctors.insert(doctor.id.clone(), doctor);
        drop(inner);

        self.publish(StoreChange::Doctors);
        Ok(())
    }

    async fn list_slots(&self, doctor_id: Option<&str>) -> Result<Vec<AppointmentSlot>, StoreError> {
        let inner = self.inner.read().await;
        let mut slots: Vec<AppointmentSlot> = inner
            .slots
            .values()
            .filter(|slot| doctor_id.map_or(true, |id| slot.doctor_id == id))
            .cloned()
            .collect();
        slots.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        Ok(slots)
    }

    async fn get_slot(&self, slot_id: &str) -> Result<Option<AppointmentSlot>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.slots.get(slot_id).cloned())
    }

    async fn create_slot(&self, slot: AppointmentSlot) -> Result<SlotWrite, StoreError> {
        let mut inner = self.inner.write().await;
        if let Some(existing) = inner.slots.get(&slot.id) {
            return Ok(SlotWrite::AlreadyExists(existing.clone()));
        }
        inner.slots.insert(slot.id.clone(), slot.clone());
        drop(inner);

        self.publish(StoreChange::Slots {
            doctor_id: slot.doctor_id.clone(),
        });
        Ok(SlotWrite::Created(slot))
    }

    async fn delete_slot(&self, slot_id: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let removed = inner.slots.remove(slot_id);
        drop(inner);

        match removed {
            Some(slot) => {
                self.publish(StoreChange::Slots {
                    doctor_id: slot.doctor_id,
                });
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_appointments(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, StoreError> {
        let inner = self.inner.read().await;
        let mut appointments: Vec<Appointment> = inner
            .appointments
            .values()
            .filter(|appointment| filter.matches(appointment))
            .cloned()
            .collect();
        appointments.sort_by(|a, b| {
            a.appointment_date
                .cmp(&b.appointment_date)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(appointments)
    }

    async fn get_appointment(&self, appointment_id: &str) -> Result<Option<Appointment>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.appointments.get(appointment_id).cloned())
    }

    async fn book_slot(&self, slot_id: &str, booking: NewAppointment) -> Result<Appointment, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.slots.remove(slot_id).is_none() {
            return Err(StoreError::SlotUnavailable(slot_id.to_string()));
        }

        let appointment = booking.into_appointment(Uuid::new_v4().to_string(), Utc::now());
        inner
            .appointments
            .insert(appointment.id.clone(), appointment.clone());
        drop(inner);

        debug!("Slot {} booked as appointment {}", slot_id, appointment.id);
        self.publish(Self::appointment_change(&appointment));
        Ok(appointment)
    }

    async fn transition_appointment(
        &self,
        appointment_id: &str,
        expected: &[AppointmentStatus],
        update: StatusUpdate,
    ) -> Result<Appointment, StoreError> {
        let mut inner = self.inner.write().await;

        let current = inner
            .appointments
            .get(appointment_id)
            .ok_or_else(|| StoreError::NotFound(format!("appointment {}", appointment_id)))?;

        if !expected.contains(&current.status) {
            return Err(StoreError::StatusMismatch {
                id: appointment_id.to_string(),
                actual: current.status,
                expected: expected.to_vec(),
            });
        }

        let doctor_id = current.doctor.id.clone();
        if let Some(date) = update.appointment_date {
            inner.slots.remove(&slot_id(&doctor_id, date));
        }

        let appointment = inner
            .appointments
            .get_mut(appointment_id)
            .ok_or_else(|| StoreError::NotFound(format!("appointment {}", appointment_id)))?;
        appointment.status = update.status;
        if let Some(date) = update.appointment_date {
            appointment.appointment_date = normalize_instant(date);
        }
        let updated = appointment.clone();
        drop(inner);

        self.publish(Self::appointment_change(&updated));
        Ok(updated)
    }

    async fn release_appointment(
        &self,
        appointment_id: &str,
        expected: &[AppointmentStatus],
        fallback_slot: AppointmentSlot,
    ) -> Result<Release, StoreError> {
        let mut inner = self.inner.write().await;

        if let Some(current) = inner.appointments.get(appointment_id) {
            if !expected.contains(&current.status) {
                return Err(StoreError::StatusMismatch {
                    id: appointment_id.to_string(),
                    actual: current.status,
                    expected: expected.to_vec(),
                });
            }
        }

        let removed = inner.appointments.remove(appointment_id);
        let slot = match &removed {
            Some(appointment) => AppointmentSlot::new(&appointment.doctor.id, appointment.appointment_date),
            None => fallback_slot,
        };

        let occupied = inner
            .appointments
            .values()
            .any(|a| a.doctor.id == slot.doctor_id && a.appointment_date == slot.date);
        let reopenable = inner.doctors.contains_key(&slot.doctor_id)
            && !occupied
            && !inner.slots.contains_key(&slot.id);

        if reopenable {
            inner.slots.insert(slot.id.clone(), slot.clone());
        } else {
            debug!("Slot {} not reopened", slot.id);
        }
        let slot_restored = reopenable;
        drop(inner);

        if let Some(appointment) = &removed {
            self.publish(Self::appointment_change(appointment));
        }
        if slot_restored {
            self.publish(StoreChange::Slots {
                doctor_id: slot.doctor_id.clone(),
            });
        }

        Ok(Release {
            appointment: removed,
            slot,
            slot_restored,
        })
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{DateTime, TimeZone};
    use shared_models::clinic::{DoctorIcon, DoctorSnapshot};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 26, hour, 0, 0).unwrap()
    }

    fn booking(doctor_id: &str, date: DateTime<Utc>) -> NewAppointment {
        NewAppointment {
            patient_name: "Ana Lopez".to_string(),
            patient_id: "patient123".to_string(),
            contact_number: "600123456".to_string(),
            requirements: None,
            appointment_date: date,
            doctor: DoctorSnapshot {
                id: doctor_id.to_string(),
                name: "Dr. Test".to_string(),
                specialty: "General Medicine".to_string(),
            },
            status: AppointmentStatus::Pending,
        }
    }

    #[tokio::test]
    async fn test_create_slot_never_overwrites() {
        let store = InMemoryStore::default();
        let slot = AppointmentSlot::new("1", at(9));

        let first = store.create_slot(slot.clone()).await.unwrap();
        let second = store.create_slot(slot.clone()).await.unwrap();

        assert_eq!(first, SlotWrite::Created(slot.clone()));
        assert_eq!(second, SlotWrite::AlreadyExists(slot));
        assert_eq!(store.list_slots(Some("1")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_book_slot_consumes_slot_once() {
        let store = InMemoryStore::default();
        let slot = AppointmentSlot::new("1", at(9));
        store.create_slot(slot.clone()).await.unwrap();

        let appointment = store.book_slot(&slot.id, booking("1", at(9))).await.unwrap();
        assert_eq!(appointment.status, AppointmentStatus::Pending);
        assert!(store.get_slot(&slot.id).await.unwrap().is_none());

        let again = store.book_slot(&slot.id, booking("1", at(9))).await;
        assert_matches!(again, Err(StoreError::SlotUnavailable(id)) if id == slot.id);
    }

    #[tokio::test]
    async fn test_transition_is_compare_and_swap() {
        let store = InMemoryStore::default();
        let slot = AppointmentSlot::new("1", at(9));
        store.create_slot(slot.clone()).await.unwrap();
        let appointment = store.book_slot(&slot.id, booking("1", at(9))).await.unwrap();

        let approved = store
            .transition_appointment(
                &appointment.id,
                &[AppointmentStatus::Pending],
                StatusUpdate::to(AppointmentStatus::Approved),
            )
            .await
            .unwrap();
        assert_eq!(approved.status, AppointmentStatus::Approved);

        let stale = store
            .transition_appointment(
                &appointment.id,
                &[AppointmentStatus::Pending],
                StatusUpdate::to(AppointmentStatus::Approved),
            )
            .await;
        assert_matches!(stale, Err(StoreError::StatusMismatch { actual: AppointmentStatus::Approved, .. }));
    }

    #[tokio::test]
    async fn test_move_consumes_open_slot_at_new_time() {
        let store = InMemoryStore::default();
        let original = AppointmentSlot::new("1", at(9));
        let target = AppointmentSlot::new("1", at(11));
        store.create_slot(original.clone()).await.unwrap();
        store.create_slot(target.clone()).await.unwrap();
        let appointment = store.book_slot(&original.id, booking("1", at(9))).await.unwrap();

        let moved = store
            .transition_appointment(
                &appointment.id,
                &[AppointmentStatus::Pending],
                StatusUpdate::moved_to(AppointmentStatus::Approved, at(11)),
            )
            .await
            .unwrap();

        assert_eq!(moved.appointment_date, at(11));
        assert!(store.get_slot(&target.id).await.unwrap().is_none());
    }

    fn doctor(id: &str) -> Doctor {
        Doctor {
            id: id.to_string(),
            name: "Dr. Test".to_string(),
            specialty: "Orthopedics".to_string(),
            avatar_url: String::new(),
            icon: DoctorIcon::Bone,
        }
    }

    const ANY_LIVE: &[AppointmentStatus] = &[
        AppointmentStatus::Pending,
        AppointmentStatus::Approved,
        AppointmentStatus::RescheduleRequested,
    ];

    #[tokio::test]
    async fn test_release_restores_slot_idempotently() {
        let store = InMemoryStore::default();
        store.put_doctor(doctor("2")).await.unwrap();
        let slot = AppointmentSlot::new("2", at(10));
        store.create_slot(slot.clone()).await.unwrap();
        let appointment = store.book_slot(&slot.id, booking("2", at(10))).await.unwrap();

        let first = store.release_appointment(&appointment.id, ANY_LIVE, slot.clone()).await.unwrap();
        assert!(first.appointment.is_some());
        assert!(first.slot_restored);

        let second = store.release_appointment(&appointment.id, ANY_LIVE, slot.clone()).await.unwrap();
        assert!(second.appointment.is_none());
        assert!(!second.slot_restored);
        assert_eq!(store.list_slots(Some("2")).await.unwrap(), vec![slot]);
    }

    #[tokio::test]
    async fn test_release_checks_expected_status() {
        let store = InMemoryStore::default();
        store.put_doctor(doctor("1")).await.unwrap();
        let slot = AppointmentSlot::new("1", at(9));
        store.create_slot(slot.clone()).await.unwrap();
        let appointment = store.book_slot(&slot.id, booking("1", at(9))).await.unwrap();
        store
            .transition_appointment(
                &appointment.id,
                &[AppointmentStatus::Pending],
                StatusUpdate::to(AppointmentStatus::Approved),
            )
            .await
            .unwrap();

        let result = store
            .release_appointment(&appointment.id, &[AppointmentStatus::Pending], slot.clone())
            .await;

        assert_matches!(result, Err(StoreError::StatusMismatch { actual: AppointmentStatus::Approved, .. }));
        assert!(store.get_appointment(&appointment.id).await.unwrap().is_some());
        assert!(store.get_slot(&slot.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_release_of_missing_appointment_leaves_held_time_booked() {
        let store = InMemoryStore::default();
        store.put_doctor(doctor("2")).await.unwrap();
        let slot = AppointmentSlot::new("2", at(10));
        store.create_slot(slot.clone()).await.unwrap();
        store.book_slot(&slot.id, booking("2", at(10))).await.unwrap();

        let release = store.release_appointment("gone", ANY_LIVE, slot.clone()).await.unwrap();

        assert!(release.appointment.is_none());
        assert!(!release.slot_restored);
        assert!(store.get_slot(&slot.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_release_never_opens_slot_for_unknown_doctor() {
        let store = InMemoryStore::default();
        let slot = AppointmentSlot::new("999", at(10));

        let release = store.release_appointment("gone", ANY_LIVE, slot.clone()).await.unwrap();

        assert!(!release.slot_restored);
        assert!(store.list_slots(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_writes_are_broadcast() {
        let store = InMemoryStore::default();
        let mut changes = store.subscribe();

        store
            .put_doctor(Doctor {
                id: "1".to_string(),
                name: "Dr. Test".to_string(),
                specialty: "Cardiology".to_string(),
                avatar_url: String::new(),
                icon: DoctorIcon::HeartPulse,
            })
            .await
            .unwrap();
        store.create_slot(AppointmentSlot::new("1", at(9))).await.unwrap();

        assert_eq!(changes.recv().await.unwrap(), StoreChange::Doctors);
        assert_eq!(
            changes.recv().await.unwrap(),
            StoreChange::Slots { doctor_id: "1".to_string() }
        );
    }
}
