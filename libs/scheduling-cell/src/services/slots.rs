use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use reqwest::Method;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{
    DayOff, ResolvedScheduleConfig, SchedulingDefaults, SchedulingError, StaffMember,
    WorkingHours, SATURDAY, SUNDAY,
};
use crate::services::conflict::ConflictFilterService;
use crate::services::staff_config;

pub struct SlotService {
    supabase: SupabaseClient,
    conflict: ConflictFilterService,
}

impl SlotService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            conflict: ConflictFilterService::new(config),
        }
    }

    /// Compute the bookable start times for a staff member on a date:
    /// raw slot generation from the effective window, then conflict
    /// filtering against bookings and live reschedule holds.
    pub async fn available_slots(
        &self,
        staff: &StaffMember,
        date: NaiveDate,
        defaults: &SchedulingDefaults,
        auth_token: &str,
    ) -> Result<Vec<NaiveTime>, SchedulingError> {
        debug!("Calculating available slots for staff {} on {}", staff.id, date);

        let days_off = self.days_off_for_staff(staff.id, auth_token).await?;
        if days_off.iter().any(|day_off| day_off.covers(date)) {
            debug!("Staff {} has a day off covering {}", staff.id, date);
            return Ok(vec![]);
        }

        let working_hours = self.working_hours_for_staff(staff.id, auth_token).await?;
        let weekday = weekday_num(date);
        if is_non_working_day(&working_hours, weekday) {
            return Ok(vec![]);
        }
        let Some(hours) = working_hours.iter().find(|w| w.day_of_week == weekday) else {
            return Ok(vec![]);
        };

        let resolved = staff_config::resolve(staff, defaults);
        if resolved.slot_duration <= 0 {
            return Err(SchedulingError::InvalidConfiguration(format!(
                "slot duration must be positive, got {}",
                resolved.slot_duration
            )));
        }

        let candidates = generate_slots(hours, &resolved, date, Utc::now());
        self.conflict
            .exclude(candidates, staff.id, date, resolved.slot_duration, auth_token)
            .await
    }

    async fn working_hours_for_staff(
        &self,
        staff_member_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<WorkingHours>, SchedulingError> {
        let path = format!(
            "/rest/v1/working_hours?staff_member_id=eq.{}&order=day_of_week.asc",
            staff_member_id
        );
        let hours = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;
        Ok(hours)
    }

    async fn days_off_for_staff(
        &self,
        staff_member_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<DayOff>, SchedulingError> {
        let path = format!(
            "/rest/v1/days_off?staff_member_id=eq.{}&order=start_date.asc",
            staff_member_id
        );
        let days_off = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;
        Ok(days_off)
    }
}

/// Weekday number in the scheduling convention: 0 = Sunday .. 6 = Saturday.
pub fn weekday_num(date: NaiveDate) -> i32 {
    match date.weekday() {
        Weekday::Sun => 0,
        Weekday::Mon => 1,
        Weekday::Tue => 2,
        Weekday::Wed => 3,
        Weekday::Thu => 4,
        Weekday::Fri => 5,
        Weekday::Sat => 6,
    }
}

/// Weekend work is derived from the working-hours rows rather than a
/// cached flag: a weekend day counts as worked only when hours exist
/// for it.
pub fn is_non_working_day(working_hours: &[WorkingHours], day_of_week: i32) -> bool {
    (day_of_week == SUNDAY || day_of_week == SATURDAY)
        && !working_hours.iter().any(|w| w.day_of_week == day_of_week)
}

/// Raw ordered slot sequence for one day. The effective window is the
/// intersection of the working hours with the resolved lead/finish
/// times; the buffer pushes today's first slot away from the current
/// wall-clock time and does not apply to future days.
pub fn generate_slots(
    hours: &WorkingHours,
    resolved: &ResolvedScheduleConfig,
    date: NaiveDate,
    now: DateTime<Utc>,
) -> Vec<NaiveTime> {
    let mut window_start = hours.start_time;
    if let Some(lead_time) = resolved.lead_time {
        window_start = window_start.max(lead_time);
    }

    let mut window_end = hours.end_time;
    if let Some(finish_time) = resolved.finish_time {
        window_end = window_end.min(finish_time);
    }

    if date == now.date_naive() {
        let (earliest, wrapped) = now
            .time()
            .overflowing_add_signed(Duration::minutes(resolved.buffer_minutes as i64));
        if wrapped != 0 {
            // Buffer runs past midnight: nothing left of today.
            return vec![];
        }
        window_start = window_start.max(earliest);
    }

    calculate_slots(
        window_start,
        window_end,
        Duration::minutes(resolved.slot_duration as i64),
    )
}

/// Step through the window in slot_duration increments. A start time is
/// emitted only when the whole slot fits: start + duration <= window end.
pub fn calculate_slots(
    window_start: NaiveTime,
    window_end: NaiveTime,
    slot_duration: Duration,
) -> Vec<NaiveTime> {
    let mut slots = Vec::new();
    let mut current = window_start;

    while current < window_end {
        let (slot_end, wrapped) = current.overflowing_add_signed(slot_duration);
        if wrapped != 0 || slot_end > window_end {
            break;
        }
        slots.push(current);
        current = slot_end;
    }

    slots
}
