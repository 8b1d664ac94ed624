use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{DbError, SupabaseClient};

use crate::models::{
    CreateDayOffRequest, CreateWorkingHoursRequest, DayOff, SchedulingError, StaffMember,
    WorkingHours,
};

/// Management of the rows the slot engine reads: working hours and days
/// off. Weekend availability is derived from working-hours rows at read
/// time, so adding or removing a day-6/day-0 row needs no flag upkeep.
pub struct StaffingService {
    supabase: SupabaseClient,
}

impl StaffingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_working_hours(
        &self,
        staff: &StaffMember,
        request: CreateWorkingHoursRequest,
        auth_token: &str,
    ) -> Result<WorkingHours, SchedulingError> {
        if request.day_of_week < 0 || request.day_of_week > 6 {
            return Err(SchedulingError::InvalidDayOfWeek);
        }
        if request.start_time >= request.end_time {
            return Err(SchedulingError::InvalidTimeOrdering);
        }

        // At most one row per (staff, day_of_week).
        let existing_path = format!(
            "/rest/v1/working_hours?staff_member_id=eq.{}&day_of_week=eq.{}",
            staff.id, request.day_of_week
        );
        let existing: Vec<Value> = self
            .supabase
            .request(Method::GET, &existing_path, Some(auth_token), None)
            .await?;
        if !existing.is_empty() {
            return Err(SchedulingError::DuplicateWorkingHours);
        }

        debug!(
            "Creating working hours for staff {} on day {}",
            staff.id, request.day_of_week
        );

        let body = json!({
            "id": Uuid::new_v4(),
            "staff_member_id": staff.id,
            "day_of_week": request.day_of_week,
            "start_time": request.start_time.format("%H:%M:%S").to_string(),
            "end_time": request.end_time.format("%H:%M:%S").to_string(),
        });

        let rows: Result<Vec<WorkingHours>, DbError> = self
            .supabase
            .insert_returning("working_hours", Some(auth_token), body)
            .await;
        match rows {
            Ok(rows) => rows
                .into_iter()
                .next()
                .ok_or_else(|| SchedulingError::Database("Working hours insert returned no rows".to_string())),
            Err(DbError::Conflict(_)) => Err(SchedulingError::DuplicateWorkingHours),
            Err(other) => Err(other.into()),
        }
    }

    pub async fn delete_working_hours(
        &self,
        working_hours_id: Uuid,
        staff: &StaffMember,
        auth_token: &str,
    ) -> Result<(), SchedulingError> {
        let path = format!(
            "/rest/v1/working_hours?id=eq.{}&staff_member_id=eq.{}",
            working_hours_id, staff.id
        );
        let deleted = self.delete_returning(&path, auth_token).await?;
        if deleted.is_empty() {
            return Err(SchedulingError::NotFound("Working hours".to_string()));
        }
        Ok(())
    }

    pub async fn create_day_off(
        &self,
        staff: &StaffMember,
        request: CreateDayOffRequest,
        auth_token: &str,
    ) -> Result<DayOff, SchedulingError> {
        if request.start_date > request.end_date {
            return Err(SchedulingError::InvalidDateOrdering);
        }

        let overlap_path = format!(
            "/rest/v1/days_off?staff_member_id=eq.{}&start_date=lte.{}&end_date=gte.{}",
            staff.id, request.end_date, request.start_date
        );
        let overlapping: Vec<Value> = self
            .supabase
            .request(Method::GET, &overlap_path, Some(auth_token), None)
            .await?;
        if !overlapping.is_empty() {
            return Err(SchedulingError::OverlappingDayOff);
        }

        debug!(
            "Creating day off for staff {} from {} to {}",
            staff.id, request.start_date, request.end_date
        );

        let body = json!({
            "id": Uuid::new_v4(),
            "staff_member_id": staff.id,
            "start_date": request.start_date,
            "end_date": request.end_date,
            "description": request.description,
        });

        let rows: Vec<DayOff> = self
            .supabase
            .insert_returning("days_off", Some(auth_token), body)
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| SchedulingError::Database("Day off insert returned no rows".to_string()))
    }

    pub async fn delete_day_off(
        &self,
        day_off_id: Uuid,
        staff: &StaffMember,
        auth_token: &str,
    ) -> Result<(), SchedulingError> {
        let path = format!(
            "/rest/v1/days_off?id=eq.{}&staff_member_id=eq.{}",
            day_off_id, staff.id
        );
        let deleted = self.delete_returning(&path, auth_token).await?;
        if deleted.is_empty() {
            return Err(SchedulingError::NotFound("Day off".to_string()));
        }
        Ok(())
    }

    async fn delete_returning(
        &self,
        path: &str,
        auth_token: &str,
    ) -> Result<Vec<Value>, SchedulingError> {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let rows = self
            .supabase
            .request_with_headers(Method::DELETE, path, Some(auth_token), None, Some(headers))
            .await?;
        Ok(rows)
    }
}
