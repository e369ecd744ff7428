use std::fmt;

use tracing::{debug, warn};

use crate::models::AppointmentStatus;

/// Something a patient or doctor does to an existing appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    Approve,
    Reject,
    Cancel,
    RequestReschedule,
    Reschedule,
    RejectReschedule,
}

impl LifecycleAction {
    pub fn all() -> [LifecycleAction; 6] {
        [
            LifecycleAction::Approve,
            LifecycleAction::Reject,
            LifecycleAction::Cancel,
            LifecycleAction::RequestReschedule,
            LifecycleAction::Reschedule,
            LifecycleAction::RejectReschedule,
        ]
    }

    /// Statuses the appointment must be in for the action to apply.
    pub fn allowed_from(&self) -> &'static [AppointmentStatus] {
        use AppointmentStatus::*;
        match self {
            LifecycleAction::Approve => &[Pending],
            LifecycleAction::Reject => &[Pending],
            LifecycleAction::Cancel => &[Pending, Approved, RescheduleRequested],
            LifecycleAction::RequestReschedule => &[Approved],
            LifecycleAction::Reschedule => &[Approved, RescheduleRequested],
            LifecycleAction::RejectReschedule => &[RescheduleRequested],
        }
    }

    pub fn target(&self) -> AppointmentStatus {
        match self {
            LifecycleAction::Approve
            | LifecycleAction::Reschedule
            | LifecycleAction::RejectReschedule => AppointmentStatus::Approved,
            LifecycleAction::Reject | LifecycleAction::Cancel => AppointmentStatus::Cancelled,
            LifecycleAction::RequestReschedule => AppointmentStatus::RescheduleRequested,
        }
    }
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleAction::Approve => "approve",
            LifecycleAction::Reject => "reject",
            LifecycleAction::Cancel => "cancel",
            LifecycleAction::RequestReschedule => "request reschedule",
            LifecycleAction::Reschedule => "reschedule",
            LifecycleAction::RejectReschedule => "reject reschedule",
        };
        f.write_str(name)
    }
}

pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: &AppointmentStatus,
        new_status: &AppointmentStatus,
    ) -> bool {
        let allowed = self.get_valid_transitions(current_status).contains(new_status);
        if !allowed {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
        }
        allowed
    }

    /// Get all valid next statuses for a given current status
    pub fn get_valid_transitions(&self, current_status: &AppointmentStatus) -> &'static [AppointmentStatus] {
        use AppointmentStatus::*;
        match current_status {
            Pending => &[Approved, Cancelled],
            // approved -> approved is a reschedule to a new date
            Approved => &[RescheduleRequested, Approved, Cancelled],
            RescheduleRequested => &[Approved, Cancelled],
            Cancelled => &[],
        }
    }

    /// Statuses the stored appointment must still be in for `action` to
    /// apply. Handed to the store, which checks them atomically.
    pub fn expected_statuses(&self, action: LifecycleAction) -> Vec<AppointmentStatus> {
        let statuses: Vec<_> = action
            .allowed_from()
            .iter()
            .copied()
            .filter(|from| self.validate_status_transition(from, &action.target()))
            .collect();
        debug!("{} applies from {:?}", action, statuses);
        statuses
    }
}

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}
