// libs/scheduling-cell/src/models.rs
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use shared_database::DbError;
use shared_models::AppError;

/// Day-of-week numbering used across the scheduling tables:
/// 0 = Sunday .. 6 = Saturday.
pub const SUNDAY: i32 = 0;
pub const SATURDAY: i32 = 6;

/// A pending reschedule hold stops reserving its old slot this many
/// seconds after creation. Expiry is evaluated lazily at read time.
pub const RESCHEDULE_HOLD_VALIDITY_SECS: i64 = 300;

// ==============================================================================
// SCHEDULING CONFIGURATION
// ==============================================================================

/// Process-wide scheduling defaults, loaded once from the
/// `scheduling_config` singleton row and refreshable on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingDefaults {
    pub slot_duration: Option<i32>,
    pub lead_time: Option<NaiveTime>,
    pub finish_time: Option<NaiveTime>,
    pub appointment_buffer_minutes: Option<i32>,
    pub default_reschedule_limit: i32,
}

impl Default for SchedulingDefaults {
    fn default() -> Self {
        Self {
            slot_duration: None,
            lead_time: None,
            finish_time: None,
            appointment_buffer_minutes: None,
            default_reschedule_limit: 3,
        }
    }
}

/// Effective per-staff scheduling parameters after falling back to the
/// process-wide defaults field by field.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedScheduleConfig {
    pub slot_duration: i32,
    pub lead_time: Option<NaiveTime>,
    pub finish_time: Option<NaiveTime>,
    pub buffer_minutes: i32,
}

// ==============================================================================
// CORE SCHEDULING MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub duration_minutes: i32,
    pub reschedule_limit: Option<i32>,
    pub allow_rescheduling: bool,
}

impl Service {
    pub fn duration(&self) -> Duration {
        Duration::minutes(self.duration_minutes as i64)
    }

    /// Reschedule ceiling for this service: zero when rescheduling is
    /// disallowed, otherwise the service limit, with services that leave
    /// the limit unset opting into the global default.
    pub fn effective_reschedule_limit(&self, defaults: &SchedulingDefaults) -> i32 {
        if !self.allow_rescheduling {
            return 0;
        }
        self.reschedule_limit
            .unwrap_or(defaults.default_reschedule_limit)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffMember {
    pub id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    pub slot_duration: Option<i32>,
    pub lead_time: Option<NaiveTime>,
    pub finish_time: Option<NaiveTime>,
    pub appointment_buffer_minutes: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingHours {
    pub id: Uuid,
    pub staff_member_id: Uuid,
    pub day_of_week: i32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayOff {
    pub id: Uuid,
    pub staff_member_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub description: Option<String>,
}

impl DayOff {
    /// The range is inclusive on both ends.
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentRequest {
    pub id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub service_id: Uuid,
    pub staff_member_id: Option<Uuid>,
    pub reschedule_attempts: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AppointmentRequest {
    pub fn can_be_rescheduled(&self, effective_limit: i32) -> bool {
        self.reschedule_attempts < effective_limit
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub appointment_request_id: Uuid,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: Option<String>,
    pub client_address: Option<String>,
    pub want_reminder: bool,
    pub additional_info: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RescheduleStatus {
    Pending,
    Confirmed,
}

impl fmt::Display for RescheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RescheduleStatus::Pending => write!(f, "pending"),
            RescheduleStatus::Confirmed => write!(f, "confirmed"),
        }
    }
}

/// Append-only snapshot of an appointment request's previous timing,
/// taken before the request itself is mutated. While `pending` and
/// younger than the validity window it acts as a hold on the old slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleHistory {
    pub id: Uuid,
    pub appointment_request_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub staff_member_id: Option<Uuid>,
    pub reason_for_rescheduling: Option<String>,
    pub reschedule_status: RescheduleStatus,
    pub created_at: DateTime<Utc>,
}

impl RescheduleHistory {
    pub fn still_valid(&self) -> bool {
        self.still_valid_at(Utc::now())
    }

    pub fn still_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.reschedule_status == RescheduleStatus::Pending
            && (now - self.created_at).num_seconds() < RESCHEDULE_HOLD_VALIDITY_SECS
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub service_id: Uuid,
    pub staff_member_id: Option<Uuid>,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: Option<String>,
    pub client_address: Option<String>,
    pub want_reminder: Option<bool>,
    pub additional_info: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub appointment_id: Uuid,
    pub reason_for_rescheduling: Option<String>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub staff_member_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWorkingHoursRequest {
    pub day_of_week: i32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDayOffRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableSlotsResponse {
    pub date: NaiveDate,
    pub staff_member: String,
    pub available_slots: Vec<String>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum SchedulingError {
    #[error("Start time must be before end time")]
    InvalidTimeOrdering,

    #[error("Start date must be before end date")]
    InvalidDateOrdering,

    #[error("Date cannot be in the past")]
    PastDate,

    #[error("Duration cannot exceed the service duration")]
    DurationExceedsService,

    #[error("{staff_name} does not work on this day")]
    NotWorkingDay { staff_name: String },

    #[error("The appointment start time is outside of {staff_name}'s working hours")]
    OutsideWorkingHours { staff_name: String },

    #[error("{staff_name} already has an appointment at this time")]
    DoubleBooking { staff_name: String },

    #[error("{staff_name} has a day off on this date")]
    DayOffConflict { staff_name: String },

    #[error("This appointment can no longer be rescheduled")]
    RescheduleLimitExceeded,

    #[error("Day of week must be between 0 (Sunday) and 6 (Saturday)")]
    InvalidDayOfWeek,

    #[error("Working hours already exist for this day")]
    DuplicateWorkingHours,

    #[error("A day off in this date range already exists")]
    OverlappingDayOff,

    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid scheduling configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<DbError> for SchedulingError {
    fn from(err: DbError) -> Self {
        SchedulingError::Database(err.to_string())
    }
}

impl From<SchedulingError> for AppError {
    fn from(err: SchedulingError) -> Self {
        match &err {
            SchedulingError::NotFound(_) => AppError::NotFound(err.to_string()),
            SchedulingError::Database(msg) => AppError::Database(msg.clone()),
            SchedulingError::InvalidConfiguration(_) => AppError::Internal(err.to_string()),
            // Every validation-class failure is a rejected operation, not
            // a crash: surface as HTTP 400.
            _ => AppError::BadRequest(err.to_string()),
        }
    }
}
