use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use shared_models::error::FieldError;

use crate::models::BookAppointmentRequest;

const MIN_NAME_LEN: usize = 2;
const MIN_CONTACT_LEN: usize = 9;

static CONTACT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?[0-9][0-9\s\-\.\(\)]*$").expect("contact pattern compiles")
});

pub const NAME_TOO_SHORT: &str = "Name must be at least 2 characters.";
pub const INVALID_CONTACT: &str = "Please enter a valid contact number.";
pub const MISSING_SLOT: &str = "Please select a time slot.";

/// Booking form after trimming, with blank requirements dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidBooking {
    pub patient_name: String,
    pub contact_number: String,
    pub requirements: Option<String>,
    pub slot_id: String,
}

pub struct BookingValidator;

impl BookingValidator {
    pub fn new() -> Self {
        Self
    }

    /// Collects every rejected field rather than stopping at the first.
    pub fn validate(&self, request: &BookAppointmentRequest) -> Result<ValidBooking, Vec<FieldError>> {
        let mut errors = Vec::new();

        let patient_name = request.patient_name.trim();
        if patient_name.chars().count() < MIN_NAME_LEN {
            errors.push(FieldError::new("patientName", NAME_TOO_SHORT));
        }

        let contact_number = request.contact_number.trim();
        if !self.is_valid_contact(contact_number) {
            errors.push(FieldError::new("contactNumber", INVALID_CONTACT));
        }

        let slot_id = request.slot_id.trim();
        if slot_id.is_empty() {
            errors.push(FieldError::new("slotId", MISSING_SLOT));
        }

        if !errors.is_empty() {
            debug!("Booking form rejected: {:?}", errors);
            return Err(errors);
        }

        let requirements = request
            .requirements
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);

        Ok(ValidBooking {
            patient_name: patient_name.to_string(),
            contact_number: contact_number.to_string(),
            requirements,
            slot_id: slot_id.to_string(),
        })
    }

    fn is_valid_contact(&self, contact: &str) -> bool {
        if contact.chars().count() < MIN_CONTACT_LEN {
            return false;
        }
        CONTACT_PATTERN.is_match(contact)
    }
}

impl Default for BookingValidator {
    fn default() -> Self {
        Self::new()
    }
}
