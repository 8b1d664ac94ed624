pub mod booking;
pub mod conflict;
pub mod directory;
pub mod reschedule;
pub mod slots;
pub mod staff_config;
pub mod staffing;

pub use booking::BookingService;
pub use conflict::ConflictFilterService;
pub use directory::DirectoryService;
pub use reschedule::RescheduleService;
pub use slots::SlotService;
pub use staff_config::DefaultsHandle;
pub use staffing::StaffingService;
