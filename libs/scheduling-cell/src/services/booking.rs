use chrono::{NaiveDate, NaiveTime, Utc};
use reqwest::Method;
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{DbError, SupabaseClient};

use crate::models::{
    Appointment, AppointmentRequest, CreateAppointmentRequest, DayOff, SchedulingError, Service,
    StaffMember, WorkingHours,
};
use crate::services::conflict::intervals_overlap;
use crate::services::directory::DirectoryService;
use crate::services::slots::weekday_num;

pub struct BookingService {
    supabase: SupabaseClient,
    directory: DirectoryService,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            directory: DirectoryService::new(config),
        }
    }

    /// Validate a proposed appointment slot against the staff member's
    /// schedule. Pure predicate: checked in order, short-circuiting on
    /// the first failure, no side effects. Reused before confirming a
    /// reschedule, with `excluding_request_id` set so the appointment
    /// being moved does not conflict with itself.
    pub async fn validate_slot(
        &self,
        date: NaiveDate,
        start_time: NaiveTime,
        staff: &StaffMember,
        service: &Service,
        excluding_request_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<(), SchedulingError> {
        let weekday = weekday_num(date);

        let hours_path = format!(
            "/rest/v1/working_hours?staff_member_id=eq.{}&day_of_week=eq.{}",
            staff.id, weekday
        );
        let hours: Vec<WorkingHours> = self
            .supabase
            .request(Method::GET, &hours_path, Some(auth_token), None)
            .await?;
        let Some(hours) = hours.into_iter().next() else {
            return Err(SchedulingError::NotWorkingDay {
                staff_name: staff.full_name.clone(),
            });
        };

        // Inclusive bounds: a start exactly at either edge is accepted.
        if start_time < hours.start_time || start_time > hours.end_time {
            return Err(SchedulingError::OutsideWorkingHours {
                staff_name: staff.full_name.clone(),
            });
        }

        let (end_time, wrapped) = start_time.overflowing_add_signed(service.duration());
        if wrapped != 0 {
            return Err(SchedulingError::InvalidTimeOrdering);
        }

        let mut requests_path = format!(
            "/rest/v1/appointment_requests?staff_member_id=eq.{}&date=eq.{}",
            staff.id, date
        );
        if let Some(excluded) = excluding_request_id {
            requests_path.push_str(&format!("&id=neq.{}", excluded));
        }
        let existing: Vec<AppointmentRequest> = self
            .supabase
            .request(Method::GET, &requests_path, Some(auth_token), None)
            .await?;
        if existing
            .iter()
            .any(|r| intervals_overlap(start_time, end_time, r.start_time, r.end_time))
        {
            return Err(SchedulingError::DoubleBooking {
                staff_name: staff.full_name.clone(),
            });
        }

        let days_off_path = format!(
            "/rest/v1/days_off?staff_member_id=eq.{}&start_date=lte.{}&end_date=gte.{}",
            staff.id, date, date
        );
        let days_off: Vec<DayOff> = self
            .supabase
            .request(Method::GET, &days_off_path, Some(auth_token), None)
            .await?;
        if !days_off.is_empty() {
            return Err(SchedulingError::DayOffConflict {
                staff_name: staff.full_name.clone(),
            });
        }

        Ok(())
    }

    /// Create an appointment request plus its one-to-one appointment.
    /// Validation runs before any write; a storage-level unique
    /// violation on (staff, date, start_time) that slips past the
    /// validator in a race comes back as a double booking.
    pub async fn create_appointment(
        &self,
        request: CreateAppointmentRequest,
        auth_token: &str,
    ) -> Result<(AppointmentRequest, Appointment), SchedulingError> {
        let service = self
            .directory
            .get_service(request.service_id, auth_token)
            .await?;

        let staff = match request.staff_member_id {
            Some(id) => self.directory.get_staff_member(id, auth_token).await?,
            None => self.directory.staff_member_for_caller(auth_token).await?,
        };

        let (end_time, wrapped) = request.start_time.overflowing_add_signed(service.duration());
        if wrapped != 0 {
            return Err(SchedulingError::InvalidTimeOrdering);
        }

        check_request_invariants(
            request.date,
            request.start_time,
            end_time,
            &service,
            Utc::now().date_naive(),
        )?;
        self.validate_slot(
            request.date,
            request.start_time,
            &staff,
            &service,
            None,
            auth_token,
        )
        .await?;

        debug!(
            "Booking {} for staff {} on {} at {}",
            service.name, staff.id, request.date, request.start_time
        );

        let appointment_request = self
            .insert_appointment_request(&request, end_time, staff.id, auth_token)
            .await
            .map_err(|e| match e {
                // Lost the race: another caller confirmed the same slot
                // between validation and write.
                DbError::Conflict(_) => {
                    warn!(
                        "Unique constraint rejected booking for staff {} on {} at {}",
                        staff.id, request.date, request.start_time
                    );
                    SchedulingError::DoubleBooking {
                        staff_name: staff.full_name.clone(),
                    }
                }
                other => other.into(),
            })?;

        let appointment = self
            .insert_appointment(&request, appointment_request.id, auth_token)
            .await?;

        Ok((appointment_request, appointment))
    }

    async fn insert_appointment_request(
        &self,
        request: &CreateAppointmentRequest,
        end_time: NaiveTime,
        staff_member_id: Uuid,
        auth_token: &str,
    ) -> Result<AppointmentRequest, DbError> {
        let now = Utc::now();
        let body = json!({
            "id": Uuid::new_v4(),
            "date": request.date,
            "start_time": request.start_time.format("%H:%M:%S").to_string(),
            "end_time": end_time.format("%H:%M:%S").to_string(),
            "service_id": request.service_id,
            "staff_member_id": staff_member_id,
            "reschedule_attempts": 0,
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339(),
        });

        let rows: Vec<AppointmentRequest> = self
            .supabase
            .insert_returning("appointment_requests", Some(auth_token), body)
            .await?;
        rows.into_iter().next().ok_or(DbError::Api {
            status: 500,
            message: "Appointment request insert returned no rows".to_string(),
        })
    }

    async fn insert_appointment(
        &self,
        request: &CreateAppointmentRequest,
        appointment_request_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let now = Utc::now();
        let body = json!({
            "id": Uuid::new_v4(),
            "appointment_request_id": appointment_request_id,
            "client_name": request.client_name,
            "client_email": request.client_email,
            "client_phone": request.client_phone,
            "client_address": request.client_address,
            "want_reminder": request.want_reminder.unwrap_or(false),
            "additional_info": request.additional_info,
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339(),
        });

        let rows: Vec<Appointment> = self
            .supabase
            .insert_returning("appointments", Some(auth_token), body)
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| SchedulingError::Database("Appointment insert returned no rows".to_string()))
    }
}

/// Data-layer invariants enforced whenever an appointment request is
/// created or re-timed.
pub fn check_request_invariants(
    date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
    service: &Service,
    today: NaiveDate,
) -> Result<(), SchedulingError> {
    if start_time >= end_time {
        return Err(SchedulingError::InvalidTimeOrdering);
    }
    if date < today {
        return Err(SchedulingError::PastDate);
    }
    if end_time - start_time > service.duration() {
        return Err(SchedulingError::DurationExceedsService);
    }
    Ok(())
}
