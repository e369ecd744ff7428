use std::collections::HashMap;
use std::sync::Arc;

use futures::Stream;
use tracing::{debug, warn};

use shared_database::live::snapshot_stream;
use shared_database::{AppState, AppointmentFilter, ClinicStore, StoreError};
use shared_models::clinic::{Appointment, Doctor};

use crate::models::{held_times, BookedAppointment, PatientDashboard, PatientError};

pub struct PatientService {
    store: Arc<dyn ClinicStore>,
}

impl PatientService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
        }
    }

    /// Doctors, the patient's appointments and the slots still open to them.
    pub async fn dashboard(&self, patient_id: &str) -> Result<PatientDashboard, PatientError> {
        debug!("Loading dashboard for patient {}", patient_id);

        let doctors = self.store.list_doctors().await?;
        let appointments = self
            .store
            .list_appointments(&AppointmentFilter::for_patient(patient_id))
            .await?;
        let appointments = join_doctors(appointments, &doctors);

        let held = held_times(&appointments);
        let available_slots = self
            .store
            .list_slots(None)
            .await?
            .into_iter()
            .filter(|slot| !held.contains(&(slot.doctor_id.clone(), slot.date)))
            .collect();

        Ok(PatientDashboard {
            patient_id: patient_id.to_string(),
            doctors,
            appointments,
            available_slots,
        })
    }

    /// The patient's appointment list, re-sent whenever one of them changes.
    pub fn appointments_feed(
        &self,
        patient_id: String,
    ) -> impl Stream<Item = Result<Vec<BookedAppointment>, StoreError>> + Send {
        let store = self.store.clone();
        let watched = patient_id.clone();

        snapshot_stream(
            self.store.subscribe(),
            move |change| change.touches_patient(&watched),
            move || {
                let store = store.clone();
                let patient_id = patient_id.clone();
                async move { load_appointments(store.as_ref(), &patient_id).await }
            },
        )
    }
}

async fn load_appointments(
    store: &dyn ClinicStore,
    patient_id: &str,
) -> Result<Vec<BookedAppointment>, StoreError> {
    let doctors = store.list_doctors().await?;
    let appointments = store
        .list_appointments(&AppointmentFilter::for_patient(patient_id))
        .await?;
    Ok(join_doctors(appointments, &doctors))
}

/// Appointments whose doctor is unknown are dropped. Input order (by date)
/// is kept.
fn join_doctors(appointments: Vec<Appointment>, doctors: &[Doctor]) -> Vec<BookedAppointment> {
    let by_id: HashMap<&str, &Doctor> = doctors.iter().map(|d| (d.id.as_str(), d)).collect();

    appointments
        .into_iter()
        .filter_map(|appointment| match by_id.get(appointment.doctor_id()) {
            Some(doctor) => {
                let doctor = (*doctor).clone();
                Some(BookedAppointment::new(appointment, doctor))
            }
            None => {
                warn!(
                    "Skipping appointment {} of unknown doctor {}",
                    appointment.id,
                    appointment.doctor_id()
                );
                None
            }
        })
        .collect()
}
