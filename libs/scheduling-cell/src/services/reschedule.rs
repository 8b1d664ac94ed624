use chrono::{NaiveTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{DbError, SupabaseClient};

use crate::models::{
    AppointmentRequest, RescheduleAppointmentRequest, RescheduleHistory, SchedulingDefaults,
    SchedulingError,
};
use crate::services::booking::{check_request_invariants, BookingService};
use crate::services::directory::DirectoryService;

pub struct RescheduleService {
    supabase: SupabaseClient,
    directory: DirectoryService,
    booking: BookingService,
}

impl RescheduleService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            directory: DirectoryService::new(config),
            booking: BookingService::new(config),
        }
    }

    /// Drive one reschedule through its life cycle: check the attempt
    /// ceiling, snapshot the current timing into a pending hold, validate
    /// the new slot, then overwrite the request and bump the attempt
    /// counter. The hold is created before any mutation; when validation
    /// of the new slot fails it stays pending and simply expires.
    pub async fn reschedule(
        &self,
        request: RescheduleAppointmentRequest,
        defaults: &SchedulingDefaults,
        auth_token: &str,
    ) -> Result<RescheduleHistory, SchedulingError> {
        let appointment = self
            .directory
            .get_appointment(request.appointment_id, auth_token)
            .await?;
        let appointment_request = self
            .directory
            .get_appointment_request(appointment.appointment_request_id, auth_token)
            .await?;
        let service = self
            .directory
            .get_service(appointment_request.service_id, auth_token)
            .await?;

        let effective_limit = service.effective_reschedule_limit(defaults);
        if !appointment_request.can_be_rescheduled(effective_limit) {
            debug!(
                "Appointment request {} exhausted its reschedule limit ({}/{})",
                appointment_request.id, appointment_request.reschedule_attempts, effective_limit
            );
            return Err(SchedulingError::RescheduleLimitExceeded);
        }

        let staff_member_id = request
            .staff_member_id
            .or(appointment_request.staff_member_id)
            .ok_or_else(|| SchedulingError::NotFound("Staff member".to_string()))?;
        let staff = self
            .directory
            .get_staff_member(staff_member_id, auth_token)
            .await?;

        // Snapshot before mutating anything; this row is also the hold
        // that keeps the old slot reserved while the reschedule is live.
        let hold = self
            .create_hold(&appointment_request, request.reason_for_rescheduling.clone(), auth_token)
            .await?;

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
        self.booking
            .validate_slot(
                request.date,
                request.start_time,
                &staff,
                &service,
                Some(appointment_request.id),
                auth_token,
            )
            .await?;

        self.apply_reschedule(
            &appointment_request,
            &request,
            end_time,
            staff.id,
            &staff.full_name,
            auth_token,
        )
        .await?;

        let confirmed = self.confirm_hold(hold.id, auth_token).await?;

        info!(
            "Appointment request {} rescheduled to {} {} (attempt {})",
            appointment_request.id,
            request.date,
            request.start_time,
            appointment_request.reschedule_attempts + 1
        );

        Ok(confirmed)
    }

    async fn create_hold(
        &self,
        appointment_request: &AppointmentRequest,
        reason: Option<String>,
        auth_token: &str,
    ) -> Result<RescheduleHistory, SchedulingError> {
        let body = json!({
            "id": Uuid::new_v4(),
            "appointment_request_id": appointment_request.id,
            "date": appointment_request.date,
            "start_time": appointment_request.start_time.format("%H:%M:%S").to_string(),
            "end_time": appointment_request.end_time.format("%H:%M:%S").to_string(),
            "staff_member_id": appointment_request.staff_member_id,
            "reason_for_rescheduling": reason,
            "reschedule_status": "pending",
            "created_at": Utc::now().to_rfc3339(),
        });

        let rows: Vec<RescheduleHistory> = self
            .supabase
            .insert_returning("reschedule_history", Some(auth_token), body)
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| SchedulingError::Database("Reschedule hold insert returned no rows".to_string()))
    }

    async fn apply_reschedule(
        &self,
        appointment_request: &AppointmentRequest,
        request: &RescheduleAppointmentRequest,
        end_time: NaiveTime,
        staff_member_id: Uuid,
        staff_name: &str,
        auth_token: &str,
    ) -> Result<(), SchedulingError> {
        let path = format!(
            "/rest/v1/appointment_requests?id=eq.{}",
            appointment_request.id
        );
        let body = json!({
            "date": request.date,
            "start_time": request.start_time.format("%H:%M:%S").to_string(),
            "end_time": end_time.format("%H:%M:%S").to_string(),
            "staff_member_id": staff_member_id,
            "reschedule_attempts": appointment_request.reschedule_attempts + 1,
            "updated_at": Utc::now().to_rfc3339(),
        });

        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let result: Result<Vec<AppointmentRequest>, DbError> = self
            .supabase
            .request_with_headers(Method::PATCH, &path, Some(auth_token), Some(body), Some(headers))
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(DbError::Conflict(_)) => {
                warn!(
                    "Unique constraint rejected reschedule of request {} to {} {}",
                    appointment_request.id, request.date, request.start_time
                );
                Err(SchedulingError::DoubleBooking {
                    staff_name: staff_name.to_string(),
                })
            }
            Err(other) => Err(other.into()),
        }
    }

    async fn confirm_hold(
        &self,
        hold_id: Uuid,
        auth_token: &str,
    ) -> Result<RescheduleHistory, SchedulingError> {
        let path = format!("/rest/v1/reschedule_history?id=eq.{}", hold_id);
        let body = json!({ "reschedule_status": "confirmed" });

        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let rows: Vec<RescheduleHistory> = self
            .supabase
            .request_with_headers(Method::PATCH, &path, Some(auth_token), Some(body), Some(headers))
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| SchedulingError::Database("Reschedule hold update returned no rows".to_string()))
    }
}
