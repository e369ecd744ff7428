use std::fmt;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

// ==============================================================================
// DOCTORS
// ==============================================================================

/// Icon tag stored on a doctor record. Closed set; unknown tags decode to
/// `Stethoscope`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DoctorIcon {
    HeartPulse,
    Bone,
    Brain,
    Stethoscope,
    Tooth,
}

impl DoctorIcon {
    pub fn tag(&self) -> &'static str {
        match self {
            DoctorIcon::HeartPulse => "HeartPulse",
            DoctorIcon::Bone => "Bone",
            DoctorIcon::Brain => "Brain",
            DoctorIcon::Stethoscope => "Stethoscope",
            DoctorIcon::Tooth => "ToothIcon",
        }
    }

    /// Asset name clients resolve to an actual glyph.
    pub fn asset_name(&self) -> &'static str {
        match self {
            DoctorIcon::HeartPulse => "heart-pulse",
            DoctorIcon::Bone => "bone",
            DoctorIcon::Brain => "brain",
            DoctorIcon::Stethoscope => "stethoscope",
            DoctorIcon::Tooth => "tooth",
        }
    }
}

impl From<String> for DoctorIcon {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "HeartPulse" => DoctorIcon::HeartPulse,
            "Bone" => DoctorIcon::Bone,
            "Brain" => DoctorIcon::Brain,
            "ToothIcon" | "Tooth" => DoctorIcon::Tooth,
            _ => DoctorIcon::Stethoscope,
        }
    }
}

impl From<DoctorIcon> for String {
    fn from(icon: DoctorIcon) -> Self {
        icon.tag().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: String,
    pub name: String,
    pub specialty: String,
    pub avatar_url: String,
    pub icon: DoctorIcon,
}

impl Doctor {
    pub fn snapshot(&self) -> DoctorSnapshot {
        DoctorSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            specialty: self.specialty.clone(),
        }
    }
}

/// Copy of the doctor fields embedded in an appointment at booking time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorSnapshot {
    pub id: String,
    pub name: String,
    pub specialty: String,
}

// ==============================================================================
// SLOTS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentSlot {
    pub id: String,
    pub doctor_id: String,
    pub date: DateTime<Utc>,
}

impl AppointmentSlot {
    pub fn new(doctor_id: &str, date: DateTime<Utc>) -> Self {
        let date = normalize_instant(date);
        Self {
            id: slot_id(doctor_id, date),
            doctor_id: doctor_id.to_string(),
            date,
        }
    }
}

/// Truncates to millisecond precision, the resolution of slot ids.
pub fn normalize_instant(date: DateTime<Utc>) -> DateTime<Utc> {
    date.trunc_subsecs(3)
}

/// `2024-10-26T09:00:00.000Z`
pub fn iso_millis(date: DateTime<Utc>) -> String {
    normalize_instant(date).to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn slot_id(doctor_id: &str, date: DateTime<Utc>) -> String {
    format!("{}_{}", doctor_id, iso_millis(date))
}

/// Splits a slot id back into doctor id and time. The time part never
/// contains `_`, so the last separator wins.
pub fn parse_slot_id(id: &str) -> Option<(String, DateTime<Utc>)> {
    let (doctor_id, date) = id.rsplit_once('_')?;
    if doctor_id.is_empty() {
        return None;
    }
    let date = DateTime::parse_from_rfc3339(date).ok()?.with_timezone(&Utc);
    Some((doctor_id.to_string(), normalize_instant(date)))
}

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentStatus {
    Pending,
    Approved,
    Cancelled,
    RescheduleRequested,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Approved => "approved",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::RescheduleRequested => "reschedule-requested",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub patient_name: String,
    pub patient_id: String,
    pub contact_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirements: Option<String>,
    pub appointment_date: DateTime<Utc>,
    pub doctor: DoctorSnapshot,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    pub fn doctor_id(&self) -> &str {
        &self.doctor.id
    }

    /// Id of the slot this appointment occupies (or occupied).
    pub fn slot_id(&self) -> String {
        slot_id(&self.doctor.id, self.appointment_date)
    }
}

/// Appointment fields supplied by a booking, before the store assigns an id
/// and creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAppointment {
    pub patient_name: String,
    pub patient_id: String,
    pub contact_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirements: Option<String>,
    pub appointment_date: DateTime<Utc>,
    pub doctor: DoctorSnapshot,
    pub status: AppointmentStatus,
}

impl NewAppointment {
    pub fn into_appointment(self, id: String, created_at: DateTime<Utc>) -> Appointment {
        Appointment {
            id,
            patient_name: self.patient_name,
            patient_id: self.patient_id,
            contact_number: self.contact_number,
            requirements: self.requirements,
            appointment_date: normalize_instant(self.appointment_date),
            doctor: self.doctor,
            status: self.status,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_slot_id_uses_millisecond_iso_format() {
        let date = Utc.with_ymd_and_hms(2024, 10, 26, 9, 0, 0).unwrap();
        assert_eq!(slot_id("1", date), "1_2024-10-26T09:00:00.000Z");
    }

    #[test]
    fn test_parse_slot_id_allows_underscores_in_doctor_id() {
        let date = Utc.with_ymd_and_hms(2024, 10, 26, 9, 0, 0).unwrap();
        assert_eq!(
            parse_slot_id("dr_house_2024-10-26T09:00:00.000Z"),
            Some(("dr_house".to_string(), date))
        );
        assert_eq!(parse_slot_id("_2024-10-26T09:00:00.000Z"), None);
        assert_eq!(parse_slot_id("1_tomorrow"), None);
    }

    #[test]
    fn test_slot_normalizes_sub_millisecond_precision() {
        let date = Utc.with_ymd_and_hms(2024, 10, 28, 10, 0, 0).unwrap()
            + chrono::Duration::microseconds(1_500);
        let slot = AppointmentSlot::new("2", date);

        assert_eq!(slot.id, "2_2024-10-28T10:00:00.001Z");
        assert_eq!(slot.date.timestamp_subsec_micros(), 1_000);
    }

    #[test]
    fn test_icon_tags_round_trip_and_unknown_falls_back() {
        let icon: DoctorIcon = serde_json::from_str("\"ToothIcon\"").unwrap();
        assert_eq!(icon, DoctorIcon::Tooth);
        assert_eq!(serde_json::to_string(&icon).unwrap(), "\"ToothIcon\"");

        let unknown: DoctorIcon = serde_json::from_str("\"Syringe\"").unwrap();
        assert_eq!(unknown, DoctorIcon::Stethoscope);
        assert_eq!(DoctorIcon::HeartPulse.asset_name(), "heart-pulse");
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&AppointmentStatus::RescheduleRequested).unwrap(),
            "\"reschedule-requested\""
        );
        let status: AppointmentStatus = serde_json::from_str("\"approved\"").unwrap();
        assert_eq!(status, AppointmentStatus::Approved);
    }

    #[test]
    fn test_appointment_document_is_camel_case() {
        let date = Utc.with_ymd_and_hms(2024, 10, 26, 9, 0, 0).unwrap();
        let appointment = NewAppointment {
            patient_name: "Ana".to_string(),
            patient_id: "patient123".to_string(),
            contact_number: "600123456".to_string(),
            requirements: None,
            appointment_date: date,
            doctor: DoctorSnapshot {
                id: "1".to_string(),
                name: "Dr. Sarah Johnson".to_string(),
                specialty: "Cardiology".to_string(),
            },
            status: AppointmentStatus::Pending,
        }
        .into_appointment("a-1".to_string(), date);

        let json = serde_json::to_value(&appointment).unwrap();
        assert_eq!(json["patientName"], "Ana");
        assert_eq!(json["doctor"]["specialty"], "Cardiology");
        assert!(json.get("requirements").is_none());
        assert_eq!(appointment.slot_id(), "1_2024-10-26T09:00:00.000Z");
    }
}
