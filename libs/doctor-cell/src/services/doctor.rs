use std::sync::Arc;

use tracing::{debug, info};

use shared_database::{AppState, ClinicStore};

use crate::models::{Doctor, DoctorError, DoctorIcon};

const PLACEHOLDER_AVATAR: &str = "https://placehold.co/100x100.png";

/// Reference doctors written on first start when the collection is empty.
pub fn default_doctors() -> Vec<Doctor> {
    [
        ("1", "Dr. Sarah Johnson", "Cardiology", DoctorIcon::HeartPulse),
        ("2", "Dr. Mark Smith", "Orthopedics", DoctorIcon::Bone),
        ("3", "Dr. Emily White", "Neurology", DoctorIcon::Brain),
        ("4", "Dr. David Chen", "General Medicine", DoctorIcon::Stethoscope),
    ]
    .into_iter()
    .map(|(id, name, specialty, icon)| Doctor {
        id: id.to_string(),
        name: name.to_string(),
        specialty: specialty.to_string(),
        avatar_url: PLACEHOLDER_AVATAR.to_string(),
        icon,
    })
    .collect()
}

pub struct DoctorService {
    store: Arc<dyn ClinicStore>,
}

impl DoctorService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
        }
    }

    pub fn with_store(store: Arc<dyn ClinicStore>) -> Self {
        Self { store }
    }

    pub async fn list_doctors(&self) -> Result<Vec<Doctor>, DoctorError> {
        debug!("Listing doctors");
        Ok(self.store.list_doctors().await?)
    }

    pub async fn get_doctor(&self, doctor_id: &str) -> Result<Doctor, DoctorError> {
        debug!("Fetching doctor {}", doctor_id);
        self.store
            .get_doctor(doctor_id)
            .await?
            .ok_or_else(|| DoctorError::NotFound(doctor_id.to_string()))
    }

    /// Writes the reference doctors if none exist. Returns how many were
    /// written.
    pub async fn seed_if_empty(&self) -> Result<usize, DoctorError> {
        if !self.store.list_doctors().await?.is_empty() {
            debug!("Doctors already present, skipping seed");
            return Ok(0);
        }

        let doctors = default_doctors();
        let count = doctors.len();
        for doctor in doctors {
            self.store.put_doctor(doctor).await?;
        }

        info!("Seeded {} reference doctors", count);
        Ok(count)
    }
}
