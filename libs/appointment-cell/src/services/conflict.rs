use tracing::debug;

use crate::models::{Appointment, AppointmentStatus, BoardEntry};

/// The approved appointment occupying the same doctor and instant, if any.
pub fn conflicting_approved<'a>(
    appointment: &Appointment,
    approved: &'a [Appointment],
) -> Option<&'a Appointment> {
    approved.iter().find(|other| {
        other.id != appointment.id
            && other.status == AppointmentStatus::Approved
            && other.doctor.id == appointment.doctor.id
            && other.appointment_date == appointment.appointment_date
    })
}

/// True iff an approved appointment of the same doctor has exactly the same
/// date. Dates are millisecond-normalized, so equality is exact.
pub fn has_conflict(appointment: &Appointment, approved: &[Appointment]) -> bool {
    conflicting_approved(appointment, approved).is_some()
}

pub fn flag_conflicts(pending: Vec<Appointment>, approved: &[Appointment]) -> Vec<BoardEntry> {
    pending
        .into_iter()
        .map(|appointment| {
            let in_conflict = has_conflict(&appointment, approved);
            if in_conflict {
                debug!("Pending appointment {} collides with an approved one", appointment.id);
            }
            BoardEntry {
                appointment,
                in_conflict,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use shared_models::clinic::DoctorSnapshot;

    fn appointment(id: &str, doctor_id: &str, minute: u32, status: AppointmentStatus) -> Appointment {
        Appointment {
            id: id.to_string(),
            patient_name: "Ana Lopez".to_string(),
            patient_id: "patient123".to_string(),
            contact_number: "600123456".to_string(),
            requirements: None,
            appointment_date: Utc.with_ymd_and_hms(2024, 10, 26, 9, minute, 0).unwrap(),
            doctor: DoctorSnapshot {
                id: doctor_id.to_string(),
                name: "Dr. Sarah Johnson".to_string(),
                specialty: "Cardiology".to_string(),
            },
            status,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_same_doctor_same_instant_conflicts() {
        let approved = vec![appointment("a", "1", 0, AppointmentStatus::Approved)];
        let pending = appointment("b", "1", 0, AppointmentStatus::Pending);

        assert!(has_conflict(&pending, &approved));
        assert_eq!(conflicting_approved(&pending, &approved).map(|a| a.id.as_str()), Some("a"));
    }

    #[test]
    fn test_other_doctor_or_time_does_not_conflict() {
        let approved = vec![
            appointment("a", "2", 0, AppointmentStatus::Approved),
            appointment("b", "1", 30, AppointmentStatus::Approved),
        ];
        let pending = appointment("c", "1", 0, AppointmentStatus::Pending);

        assert!(!has_conflict(&pending, &approved));
    }

    #[test]
    fn test_one_millisecond_apart_does_not_conflict() {
        let mut later = appointment("a", "1", 0, AppointmentStatus::Approved);
        later.appointment_date = later.appointment_date + Duration::milliseconds(1);
        let pending = appointment("b", "1", 0, AppointmentStatus::Pending);

        assert!(!has_conflict(&pending, &[later]));
    }

    #[test]
    fn test_appointment_never_conflicts_with_itself() {
        let approved = appointment("a", "1", 0, AppointmentStatus::Approved);
        assert!(!has_conflict(&approved, std::slice::from_ref(&approved)));
    }

    #[test]
    fn test_flagged_entries_have_an_identical_approved_date() {
        let approved = vec![appointment("a", "1", 0, AppointmentStatus::Approved)];
        let pending = vec![
            appointment("b", "1", 0, AppointmentStatus::Pending),
            appointment("c", "1", 15, AppointmentStatus::Pending),
        ];

        let entries = flag_conflicts(pending, &approved);

        assert_eq!(entries.iter().filter(|e| e.in_conflict).count(), 1);
        for entry in entries.iter().filter(|e| e.in_conflict) {
            assert!(approved
                .iter()
                .any(|a| a.appointment_date == entry.appointment.appointment_date));
        }
    }
}
