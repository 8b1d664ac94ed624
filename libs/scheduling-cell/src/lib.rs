pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

// Re-export the engine's core types for external use
pub use models::{
    Appointment, AppointmentRequest, DayOff, RescheduleHistory, RescheduleStatus,
    ResolvedScheduleConfig, SchedulingDefaults, SchedulingError, Service, StaffMember,
    WorkingHours,
};
pub use services::*;
