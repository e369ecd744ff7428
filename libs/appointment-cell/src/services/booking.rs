use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use doctor_cell::AvailabilityService;
use shared_database::{AppState, AppointmentFilter, ClinicStore, Release, StatusUpdate, StoreError};
use shared_models::clinic::{iso_millis, normalize_instant, parse_slot_id, AppointmentSlot};

use crate::models::{
    messages, Appointment, AppointmentError, AppointmentStatus, BookAppointmentRequest,
    CancelAppointmentRequest, ConfirmationResult, MissingField, NewAppointment,
};
use crate::services::conflict::conflicting_approved;
use crate::services::lifecycle::{AppointmentLifecycleService, LifecycleAction};
use crate::services::validation::BookingValidator;

pub struct AppointmentBookingService {
    store: Arc<dyn ClinicStore>,
    availability_service: AvailabilityService,
    lifecycle_service: AppointmentLifecycleService,
    validator: BookingValidator,
    instant_confirmation: bool,
}

impl AppointmentBookingService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
            availability_service: AvailabilityService::new(state),
            lifecycle_service: AppointmentLifecycleService::new(),
            validator: BookingValidator::new(),
            instant_confirmation: state.config.instant_confirmation,
        }
    }

    // ==========================================================================
    // BOOKING
    // ==========================================================================

    /// Validates the form and turns the slot into an appointment. The slot
    /// is reserved in the same store operation that creates the appointment,
    /// so a slot can only be booked once.
    pub async fn request_appointment(
        &self,
        patient_id: &str,
        request: BookAppointmentRequest,
    ) -> Result<ConfirmationResult, AppointmentError> {
        debug!("Booking request for slot {} by patient {}", request.slot_id, patient_id);

        let booking = self
            .validator
            .validate(&request)
            .map_err(AppointmentError::InvalidFields)?;

        let Some(slot) = self.store.get_slot(&booking.slot_id).await? else {
            return Ok(self.slot_unavailable(&booking.slot_id).await);
        };

        let doctor = self
            .store
            .get_doctor(&slot.doctor_id)
            .await?
            .ok_or_else(|| AppointmentError::DoctorNotFound(slot.doctor_id.clone()))?;

        let status = if self.instant_confirmation {
            AppointmentStatus::Approved
        } else {
            AppointmentStatus::Pending
        };

        let new_appointment = NewAppointment {
            patient_name: booking.patient_name,
            patient_id: patient_id.to_string(),
            contact_number: booking.contact_number,
            requirements: booking.requirements,
            appointment_date: slot.date,
            doctor: doctor.snapshot(),
            status,
        };

        match self.store.book_slot(&slot.id, new_appointment).await {
            Ok(appointment) => {
                info!(
                    "Appointment {} requested with {} at {} ({})",
                    appointment.id,
                    doctor.name,
                    iso_millis(appointment.appointment_date),
                    appointment.status
                );
                let reason = match appointment.status {
                    AppointmentStatus::Approved => messages::REQUEST_CONFIRMED,
                    _ => messages::REQUEST_SENT,
                };
                Ok(ConfirmationResult::confirmed(reason, Some(appointment.id)))
            }
            Err(StoreError::SlotUnavailable(slot_id)) => Ok(self.slot_unavailable(&slot_id).await),
            Err(e) => {
                error!("Error creating appointment request for slot {}: {}", slot.id, e);
                Err(e.into())
            }
        }
    }

    /// Declined result, pointing at the doctor's next open slot when there is
    /// one.
    async fn slot_unavailable(&self, slot_id: &str) -> ConfirmationResult {
        warn!("Slot {} is no longer available", slot_id);

        let suggestion = match parse_slot_id(slot_id) {
            Some((doctor_id, date)) => {
                match self.availability_service.next_open_slot(&doctor_id, date).await {
                    Ok(next) => next.map(|slot| iso_millis(slot.date)),
                    Err(e) => {
                        warn!("Could not look up an alternative to {}: {}", slot_id, e);
                        None
                    }
                }
            }
            None => None,
        };

        ConfirmationResult::declined(messages::SLOT_TAKEN, suggestion)
    }

    pub async fn get_appointment(&self, appointment_id: &str) -> Result<Appointment, AppointmentError> {
        self.store
            .get_appointment(appointment_id)
            .await?
            .ok_or_else(|| AppointmentError::NotFound(appointment_id.to_string()))
    }

    // ==========================================================================
    // DOCTOR DECISIONS
    // ==========================================================================

    /// Pending -> approved. The date never changes; approving on top of an
    /// already approved appointment is allowed and only logged.
    pub async fn approve(&self, appointment_id: &str) -> Result<Appointment, AppointmentError> {
        let appointment = self.apply(appointment_id, LifecycleAction::Approve, None).await?;
        self.warn_on_conflict(&appointment).await;
        Ok(appointment)
    }

    /// Declines a pending request and frees its slot. Fails with
    /// `InvalidStatus` if the request was decided in the meantime.
    pub async fn reject(&self, appointment_id: &str) -> Result<Release, AppointmentError> {
        let appointment = self.get_appointment(appointment_id).await?;
        let slot = AppointmentSlot::new(appointment.doctor_id(), appointment.appointment_date);
        self.release(appointment_id, LifecycleAction::Reject, slot).await
    }

    /// Deletes the appointment and reopens its slot. `request` only names
    /// the slot when the appointment is already gone; the slot is then
    /// ensured unless another appointment holds that time, and the call
    /// reports not found.
    pub async fn cancel(
        &self,
        appointment_id: &str,
        request: CancelAppointmentRequest,
    ) -> Result<Release, AppointmentError> {
        if request.doctor_id.trim().is_empty() {
            return Err(AppointmentError::MissingData(MissingField::DoctorId));
        }
        let fallback = AppointmentSlot::new(&request.doctor_id, request.appointment_date);
        self.release(appointment_id, LifecycleAction::Cancel, fallback).await
    }

    // ==========================================================================
    // RESCHEDULING
    // ==========================================================================

    pub async fn request_reschedule(&self, appointment_id: &str) -> Result<Appointment, AppointmentError> {
        self.apply(appointment_id, LifecycleAction::RequestReschedule, None)
            .await
    }

    /// Moves the appointment and approves it. An open slot at the new time is
    /// consumed; the old time is not given back.
    pub async fn reschedule(
        &self,
        appointment_id: &str,
        new_date: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self
            .apply(
                appointment_id,
                LifecycleAction::Reschedule,
                Some(normalize_instant(new_date)),
            )
            .await?;
        self.warn_on_conflict(&appointment).await;
        Ok(appointment)
    }

    /// Back to approved with the original date.
    pub async fn reject_reschedule(&self, appointment_id: &str) -> Result<Appointment, AppointmentError> {
        self.apply(appointment_id, LifecycleAction::RejectReschedule, None)
            .await
    }

    // ==========================================================================
    // HELPERS
    // ==========================================================================

    async fn apply(
        &self,
        appointment_id: &str,
        action: LifecycleAction,
        new_date: Option<DateTime<Utc>>,
    ) -> Result<Appointment, AppointmentError> {
        if appointment_id.trim().is_empty() {
            return Err(AppointmentError::MissingData(MissingField::AppointmentId));
        }
        debug!("Applying {} to appointment {}", action, appointment_id);

        let update = match new_date {
            Some(date) => StatusUpdate::moved_to(action.target(), date),
            None => StatusUpdate::to(action.target()),
        };

        let appointment = self
            .store
            .transition_appointment(
                appointment_id,
                &self.lifecycle_service.expected_statuses(action),
                update,
            )
            .await
            .map_err(|e| {
                warn!("Could not {} appointment {}: {}", action, appointment_id, e);
                AppointmentError::from(e)
            })?;

        info!(
            "Appointment {} is now {} at {}",
            appointment.id,
            appointment.status,
            iso_millis(appointment.appointment_date)
        );
        Ok(appointment)
    }

    async fn release(
        &self,
        appointment_id: &str,
        action: LifecycleAction,
        fallback: AppointmentSlot,
    ) -> Result<Release, AppointmentError> {
        if appointment_id.trim().is_empty() {
            return Err(AppointmentError::MissingData(MissingField::AppointmentId));
        }
        debug!("Applying {} to appointment {}", action, appointment_id);

        let release = self
            .store
            .release_appointment(
                appointment_id,
                &self.lifecycle_service.expected_statuses(action),
                fallback,
            )
            .await
            .map_err(|e| {
                warn!("Could not {} appointment {}: {}", action, appointment_id, e);
                AppointmentError::from(e)
            })?;

        match &release.appointment {
            Some(appointment) => {
                info!(
                    "Appointment {} removed ({}), slot {} {}",
                    appointment.id,
                    action,
                    release.slot.id,
                    if release.slot_restored { "reopened" } else { "left as is" }
                );
                Ok(release)
            }
            None => {
                warn!(
                    "Appointment {} was already gone, slot {} {}",
                    appointment_id,
                    release.slot.id,
                    if release.slot_restored { "reopened" } else { "left as is" }
                );
                Err(AppointmentError::NotFound(appointment_id.to_string()))
            }
        }
    }

    async fn warn_on_conflict(&self, appointment: &Appointment) {
        let filter = AppointmentFilter::for_doctor(appointment.doctor_id())
            .with_status(AppointmentStatus::Approved);

        match self.store.list_appointments(&filter).await {
            Ok(approved) => {
                if let Some(other) = conflicting_approved(appointment, &approved) {
                    warn!(
                        "Appointment {} overlaps approved appointment {} at {}",
                        appointment.id,
                        other.id,
                        iso_millis(appointment.appointment_date)
                    );
                }
            }
            Err(e) => warn!("Conflict check for {} failed: {}", appointment.id, e),
        }
    }
}
