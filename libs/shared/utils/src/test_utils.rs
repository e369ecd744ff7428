use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use shared_config::AppConfig;
use shared_database::{AppState, ClinicStore};
use shared_models::clinic::{AppointmentSlot, Doctor, DoctorIcon};

pub struct TestConfig {
    pub demo_patient_id: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub instant_confirmation: bool,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            demo_patient_id: "patient123".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            instant_confirmation: false,
        }
    }
}

impl TestConfig {
    pub fn instant() -> Self {
        Self {
            instant_confirmation: true,
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            demo_patient_id: self.demo_patient_id.clone(),
            instant_confirmation: self.instant_confirmation,
            seed_doctors: false,
            live_channel_capacity: 64,
            ..AppConfig::default()
        }
    }

    /// State over a fresh, empty in-memory store.
    pub fn to_state(&self) -> Arc<AppState> {
        Arc::new(AppState::in_memory(self.to_app_config()))
    }
}

/// `2024-10-{day}T{hour}:{minute}:00Z`
pub fn october(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 10, day, hour, minute, 0)
        .single()
        .unwrap_or_else(|| panic!("invalid test date 2024-10-{} {}:{}", day, hour, minute))
}

pub struct TestDoctors;

impl TestDoctors {
    pub fn cardiologist() -> Doctor {
        Doctor {
            id: "1".to_string(),
            name: "Dr. Sarah Johnson".to_string(),
            specialty: "Cardiology".to_string(),
            avatar_url: "https://placehold.co/100x100.png".to_string(),
            icon: DoctorIcon::HeartPulse,
        }
    }

    pub fn orthopedist() -> Doctor {
        Doctor {
            id: "2".to_string(),
            name: "Dr. Mark Smith".to_string(),
            specialty: "Orthopedics".to_string(),
            avatar_url: "https://placehold.co/100x100.png".to_string(),
            icon: DoctorIcon::Bone,
        }
    }

    pub fn all() -> Vec<Doctor> {
        vec![Self::cardiologist(), Self::orthopedist()]
    }
}

/// Puts the test doctors into the store.
pub async fn seed_doctors(store: &dyn ClinicStore) {
    for doctor in TestDoctors::all() {
        store
            .put_doctor(doctor)
            .await
            .unwrap_or_else(|e| panic!("failed to seed doctor: {}", e));
    }
}

/// Creates an open slot and returns it.
pub async fn seed_slot(store: &dyn ClinicStore, doctor_id: &str, date: DateTime<Utc>) -> AppointmentSlot {
    let slot = AppointmentSlot::new(doctor_id, date);
    store
        .create_slot(slot.clone())
        .await
        .unwrap_or_else(|e| panic!("failed to seed slot: {}", e));
    slot
}

/// In-memory store already holding the test doctors.
pub async fn seeded_state(config: &TestConfig) -> Arc<AppState> {
    let state = config.to_state();
    seed_doctors(state.store.as_ref()).await;
    state
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default().to_app_config();

        assert_eq!(config.demo_patient_id, "patient123");
        assert_eq!(config.supabase_anon_key, "test-anon-key");
        assert!(!config.seed_doctors);
        assert!(TestConfig::instant().to_app_config().instant_confirmation);
    }

    #[tokio::test]
    async fn test_seeded_state_has_doctors() {
        let state = seeded_state(&TestConfig::default()).await;
        let doctors = state.store.list_doctors().await.unwrap();
        assert_eq!(doctors.len(), 2);
    }
}
