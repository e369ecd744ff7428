use std::sync::Arc;

use futures::Stream;
use tracing::debug;

use shared_database::live::snapshot_stream;
use shared_database::{AppState, AppointmentFilter, ClinicStore, StoreError};

use crate::models::{AppointmentError, AppointmentStatus, DoctorBoard};
use crate::services::conflict::flag_conflicts;

/// Read side of the doctor dashboard.
pub struct DoctorBoardService {
    store: Arc<dyn ClinicStore>,
}

impl DoctorBoardService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
        }
    }

    pub async fn ensure_doctor(&self, doctor_id: &str) -> Result<(), AppointmentError> {
        match self.store.get_doctor(doctor_id).await? {
            Some(_) => Ok(()),
            None => Err(AppointmentError::DoctorNotFound(doctor_id.to_string())),
        }
    }

    pub async fn board(&self, doctor_id: &str) -> Result<DoctorBoard, AppointmentError> {
        self.ensure_doctor(doctor_id).await?;
        Ok(load_board(self.store.as_ref(), doctor_id).await?)
    }

    /// The whole board, re-sent after every change touching this doctor.
    pub fn board_feed(
        &self,
        doctor_id: String,
    ) -> impl Stream<Item = Result<DoctorBoard, StoreError>> + Send {
        let store = self.store.clone();
        let watched = doctor_id.clone();

        snapshot_stream(
            self.store.subscribe(),
            move |change| change.touches_doctor(&watched),
            move || {
                let store = store.clone();
                let doctor_id = doctor_id.clone();
                async move { load_board(store.as_ref(), &doctor_id).await }
            },
        )
    }
}

async fn load_board(store: &dyn ClinicStore, doctor_id: &str) -> Result<DoctorBoard, StoreError> {
    debug!("Loading board of doctor {}", doctor_id);

    let appointments = store
        .list_appointments(&AppointmentFilter::for_doctor(doctor_id))
        .await?;

    let mut pending = Vec::new();
    let mut approved = Vec::new();
    let mut reschedule_requested = Vec::new();

    for appointment in appointments {
        match appointment.status {
            AppointmentStatus::Pending => pending.push(appointment),
            AppointmentStatus::Approved => approved.push(appointment),
            AppointmentStatus::RescheduleRequested => reschedule_requested.push(appointment),
            AppointmentStatus::Cancelled => {}
        }
    }

    let pending = flag_conflicts(pending, &approved);

    Ok(DoctorBoard {
        doctor_id: doctor_id.to_string(),
        pending,
        approved,
        reschedule_requested,
    })
}
