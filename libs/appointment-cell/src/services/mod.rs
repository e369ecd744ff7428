pub mod board;
pub mod booking;
pub mod confirmation;
pub mod conflict;
pub mod lifecycle;
pub mod validation;

pub use board::DoctorBoardService;
pub use booking::AppointmentBookingService;
pub use confirmation::confirm_appointment;
pub use lifecycle::{AppointmentLifecycleService, LifecycleAction};
