use async_trait::async_trait;
use chrono::Utc;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method,
};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, error, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::clinic::{
    normalize_instant, Appointment, AppointmentSlot, AppointmentStatus, Doctor, NewAppointment,
};

use crate::store::{
    AppointmentFilter, ClinicStore, Release, SlotWrite, StatusUpdate, StoreChange, StoreError,
};

const DOCTORS: &str = "doctors";
const SLOTS: &str = "appointment_slots";
const APPOINTMENTS: &str = "appointments";

// Error messages raised by the RPC functions in sql/clinic.sql
const SLOT_UNAVAILABLE: &str = "slot_unavailable";
const APPOINTMENT_NOT_FOUND: &str = "appointment_not_found";
const STATUS_MISMATCH: &str = "status_mismatch";

#[derive(Debug, Error)]
pub enum SupabaseError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid value for header {0}")]
    InvalidHeader(&'static str),

    #[error("API error ({status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
        details: Option<String>,
    },
}

impl SupabaseError {
    /// Whether this is the error one of our database functions raised with
    /// `message`. Plain HTTP statuses are not enough: PostgREST answers 404
    /// for a missing function and 409 for unrelated constraint failures.
    fn is_raised(&self, expected_message: &str) -> bool {
        matches!(self, SupabaseError::Api { message, .. } if message == expected_message)
    }
}

impl From<SupabaseError> for StoreError {
    fn from(e: SupabaseError) -> Self {
        StoreError::Backend(e.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct PostgrestError {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
}

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
        }
    }

    fn get_headers(&self, extra: Option<HeaderMap>) -> Result<HeaderMap, SupabaseError> {
        let mut headers = HeaderMap::new();

        headers.insert(
            "apikey",
            HeaderValue::from_str(&self.anon_key).map_err(|_| SupabaseError::InvalidHeader("apikey"))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.anon_key))
                .map_err(|_| SupabaseError::InvalidHeader("authorization"))?,
        );

        if let Some(extra) = extra {
            headers.extend(extra);
        }

        Ok(headers)
    }

    pub async fn request<T>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T, SupabaseError>
    where
        T: DeserializeOwned,
    {
        self.request_with_headers(method, path, body, None).await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<T, SupabaseError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making request to {}", url);

        let headers = self.get_headers(extra_headers)?;

        let mut req = self.client.request(method, &url).headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("API error ({}): {}", status, error_text);

            let parsed = serde_json::from_str::<PostgrestError>(&error_text).ok();
            let (code, message, details) = match parsed {
                Some(p) => (p.code, p.message.unwrap_or_else(|| error_text.clone()), p.details),
                None => (None, error_text, None),
            };

            return Err(SupabaseError::Api {
                status: status.as_u16(),
                code,
                message,
                details,
            });
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    /// Calls a database function through `/rest/v1/rpc/{function}`.
    pub async fn rpc<T>(&self, function: &str, args: Value) -> Result<T, SupabaseError>
    where
        T: DeserializeOwned,
    {
        let path = format!("/rest/v1/rpc/{}", function);
        self.request(Method::POST, &path, Some(args)).await
    }
}

fn prefer(value: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Prefer", HeaderValue::from_static(value));
    headers
}

fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Maps the errors raised by the status-checking functions.
fn lifecycle_error(e: SupabaseError, appointment_id: &str, expected: &[AppointmentStatus]) -> StoreError {
    if e.is_raised(APPOINTMENT_NOT_FOUND) {
        return StoreError::NotFound(format!("appointment {}", appointment_id));
    }
    match e {
        SupabaseError::Api { message, details, .. } if message == STATUS_MISMATCH => {
            match details.and_then(|d| serde_json::from_value::<AppointmentStatus>(Value::String(d)).ok()) {
                Some(actual) => StoreError::StatusMismatch {
                    id: appointment_id.to_string(),
                    actual,
                    expected: expected.to_vec(),
                },
                None => StoreError::Backend("status mismatch without current status".to_string()),
            }
        }
        other => other.into(),
    }
}

/// Decodes a listing, skipping rows that do not match the document shape.
fn decode_rows<T: DeserializeOwned>(collection: &'static str, rows: Vec<Value>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match serde_json::from_value::<T>(row) {
            Ok(doc) => Some(doc),
            Err(e) => {
                warn!("Skipping malformed {} document: {}", collection, e);
                None
            }
        })
        .collect()
}

fn decode_one<T: DeserializeOwned>(collection: &'static str, row: Value) -> Result<T, StoreError> {
    serde_json::from_value(row).map_err(|e| StoreError::Decode {
        collection,
        message: e.to_string(),
    })
}

fn first_row<T: DeserializeOwned>(collection: &'static str, rows: Vec<Value>) -> Result<Option<T>, StoreError> {
    rows.into_iter()
        .next()
        .map(|row| decode_one(collection, row))
        .transpose()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReleaseRow {
    appointment: Option<Appointment>,
    slot: AppointmentSlot,
    slot_restored: bool,
}

/// Clinic collections kept in a hosted Postgres behind PostgREST. Composite
/// operations run as database functions so each is one transaction.
///
/// Change notifications only cover writes made through this process.
pub struct SupabaseStore {
    supabase: SupabaseClient,
    changes: broadcast::Sender<StoreChange>,
}

impl SupabaseStore {
    pub fn new(config: &AppConfig) -> Self {
        let (changes, _) = broadcast::channel(config.live_channel_capacity.max(1));
        Self {
            supabase: SupabaseClient::new(config),
            changes,
        }
    }

    fn publish(&self, change: StoreChange) {
        let _ = self.changes.send(change);
    }

    fn publish_appointment(&self, appointment: &Appointment) {
        self.publish(StoreChange::Appointments {
            doctor_id: appointment.doctor.id.clone(),
            patient_id: appointment.patient_id.clone(),
        });
    }

    async fn fetch_rows(&self, path: &str) -> Result<Vec<Value>, StoreError> {
        let rows: Vec<Value> = self.supabase.request(Method::GET, path, None).await?;
        Ok(rows)
    }
}

#[async_trait]
impl ClinicStore for SupabaseStore {
    async fn list_doctors(&self) -> Result<Vec<Doctor>, StoreError> {
        let path = format!("/rest/v1/{}?select=*&order=id.asc", DOCTORS);
        let rows = self.fetch_rows(&path).await?;
        Ok(decode_rows(DOCTORS, rows))
    }

    async fn get_doctor(&self, doctor_id: &str) -> Result<Option<Doctor>, StoreError> {
        let path = format!("/rest/v1/{}?id=eq.{}&select=*", DOCTORS, encode(doctor_id));
        let rows = self.fetch_rows(&path).await?;
        first_row(DOCTORS, rows)
    }

    async fn put_doctor(&self, doctor: Doctor) -> Result<(), StoreError> {
        let body = serde_json::to_value(&doctor).map_err(|e| StoreError::Backend(e.to_string()))?;
        let _: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                &format!("/rest/v1/{}", DOCTORS),
                Some(body),
                Some(prefer("resolution=merge-duplicates,return=representation")),
            )
            .await?;

        self.publish(StoreChange::Doctors);
        Ok(())
    }

    async fn list_slots(&self, doctor_id: Option<&str>) -> Result<Vec<AppointmentSlot>, StoreError> {
        let mut path = format!("/rest/v1/{}?select=*&order=date.asc", SLOTS);
        if let Some(doctor_id) = doctor_id {
            path.push_str(&format!("&doctorId=eq.{}", encode(doctor_id)));
        }
        let rows = self.fetch_rows(&path).await?;
        Ok(decode_rows(SLOTS, rows))
    }

    async fn get_slot(&self, slot_id: &str) -> Result<Option<AppointmentSlot>, StoreError> {
        let path = format!("/rest/v1/{}?id=eq.{}&select=*", SLOTS, encode(slot_id));
        let rows = self.fetch_rows(&path).await?;
        first_row(SLOTS, rows)
    }

    async fn create_slot(&self, slot: AppointmentSlot) -> Result<SlotWrite, StoreError> {
        let body = serde_json::to_value(&slot).map_err(|e| StoreError::Backend(e.to_string()))?;
        let result: Result<Vec<Value>, SupabaseError> = self
            .supabase
            .request_with_headers(
                Method::POST,
                &format!("/rest/v1/{}", SLOTS),
                Some(body),
                Some(prefer("return=representation")),
            )
            .await;

        match result {
            Ok(rows) => {
                let created = first_row(SLOTS, rows)?.unwrap_or(slot);
                self.publish(StoreChange::Slots {
                    doctor_id: created.doctor_id.clone(),
                });
                Ok(SlotWrite::Created(created))
            }
            Err(SupabaseError::Api { status: 409, .. }) => {
                debug!("Slot {} already exists", slot.id);
                let existing = self.get_slot(&slot.id).await?.unwrap_or(slot);
                Ok(SlotWrite::AlreadyExists(existing))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_slot(&self, slot_id: &str) -> Result<bool, StoreError> {
        let rows: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::DELETE,
                &format!("/rest/v1/{}?id=eq.{}", SLOTS, encode(slot_id)),
                None,
                Some(prefer("return=representation")),
            )
            .await?;

        match first_row::<AppointmentSlot>(SLOTS, rows)? {
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
        let mut path = format!(
            "/rest/v1/{}?select=*&order=appointmentDate.asc,createdAt.asc",
            APPOINTMENTS
        );
        if let Some(doctor_id) = &filter.doctor_id {
            path.push_str(&format!("&doctor->>id=eq.{}", encode(doctor_id)));
        }
        if let Some(patient_id) = &filter.patient_id {
            path.push_str(&format!("&patientId=eq.{}", encode(patient_id)));
        }
        if let Some(status) = filter.status {
            path.push_str(&format!("&status=eq.{}", status.as_str()));
        }

        let rows = self.fetch_rows(&path).await?;
        Ok(decode_rows(APPOINTMENTS, rows))
    }

    async fn get_appointment(&self, appointment_id: &str) -> Result<Option<Appointment>, StoreError> {
        let path = format!("/rest/v1/{}?id=eq.{}&select=*", APPOINTMENTS, encode(appointment_id));
        let rows = self.fetch_rows(&path).await?;
        first_row(APPOINTMENTS, rows)
    }

    async fn book_slot(&self, slot_id: &str, booking: NewAppointment) -> Result<Appointment, StoreError> {
        let appointment = booking.into_appointment(Uuid::new_v4().to_string(), Utc::now());
        let args = json!({
            "p_slot_id": slot_id,
            "p_appointment": appointment,
        });

        let row: Value = self
            .supabase
            .rpc("book_slot", args)
            .await
            .map_err(|e| {
                if e.is_raised(SLOT_UNAVAILABLE) {
                    StoreError::SlotUnavailable(slot_id.to_string())
                } else {
                    e.into()
                }
            })?;

        let stored: Appointment = decode_one(APPOINTMENTS, row)?;
        self.publish_appointment(&stored);
        Ok(stored)
    }

    async fn transition_appointment(
        &self,
        appointment_id: &str,
        expected: &[AppointmentStatus],
        update: StatusUpdate,
    ) -> Result<Appointment, StoreError> {
        let args = json!({
            "p_appointment_id": appointment_id,
            "p_expected": expected.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
            "p_status": update.status.as_str(),
            "p_date": update.appointment_date.map(normalize_instant),
        });

        let row: Value = self
            .supabase
            .rpc("transition_appointment", args)
            .await
            .map_err(|e| lifecycle_error(e, appointment_id, expected))?;

        let updated: Appointment = decode_one(APPOINTMENTS, row)?;
        self.publish_appointment(&updated);
        Ok(updated)
    }

    async fn release_appointment(
        &self,
        appointment_id: &str,
        expected: &[AppointmentStatus],
        fallback_slot: AppointmentSlot,
    ) -> Result<Release, StoreError> {
        let args = json!({
            "p_appointment_id": appointment_id,
            "p_expected": expected.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
            "p_doctor_id": fallback_slot.doctor_id,
            "p_date": fallback_slot.date,
        });

        let row: Value = self
            .supabase
            .rpc("release_appointment", args)
            .await
            .map_err(|e| lifecycle_error(e, appointment_id, expected))?;
        let release: ReleaseRow = decode_one(APPOINTMENTS, row)?;

        if let Some(appointment) = &release.appointment {
            self.publish_appointment(appointment);
        }
        if release.slot_restored {
            self.publish(StoreChange::Slots {
                doctor_id: release.slot.doctor_id.clone(),
            });
        }

        Ok(Release {
            appointment: release.appointment,
            slot: release.slot,
            slot_restored: release.slot_restored,
        })
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}
