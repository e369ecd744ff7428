use tracing::debug;

use crate::models::{messages, ConfirmAppointmentInput, ConfirmationResult};

/// Placeholder for an automated confirmation check. Every request is
/// accepted for doctor review.
pub fn confirm_appointment(input: &ConfirmAppointmentInput) -> ConfirmationResult {
    debug!(
        "Confirming request of {} with {} on {} {}",
        input.patient_name, input.doctor_name, input.appointment_date, input.appointment_time
    );
    ConfirmationResult::confirmed(messages::REQUEST_SENT, None)
}
