use reqwest::Method;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{Appointment, AppointmentRequest, SchedulingError, Service, StaffMember};

/// Lookups against the collaborator-owned tables (services, staff,
/// appointments). Read-only; every miss is a typed NotFound.
pub struct DirectoryService {
    supabase: SupabaseClient,
}

impl DirectoryService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn get_service(
        &self,
        service_id: Uuid,
        auth_token: &str,
    ) -> Result<Service, SchedulingError> {
        let path = format!("/rest/v1/services?id=eq.{}", service_id);
        let rows: Vec<Service> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| SchedulingError::NotFound("Service".to_string()))
    }

    pub async fn get_staff_member(
        &self,
        staff_member_id: Uuid,
        auth_token: &str,
    ) -> Result<StaffMember, SchedulingError> {
        let path = format!("/rest/v1/staff_members?id=eq.{}", staff_member_id);
        let rows: Vec<StaffMember> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| SchedulingError::NotFound("Staff member".to_string()))
    }

    /// Staff member owned by the caller, resolved through the auth token.
    /// Used when a booking omits an explicit staff member.
    pub async fn staff_member_for_caller(
        &self,
        auth_token: &str,
    ) -> Result<StaffMember, SchedulingError> {
        let user_id = self
            .supabase
            .current_user_id(auth_token)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;
        debug!("Resolving staff member for user {}", user_id);

        let path = format!("/rest/v1/staff_members?user_id=eq.{}", user_id);
        let rows: Vec<StaffMember> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| SchedulingError::NotFound("Staff member".to_string()))
    }

    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let rows: Vec<Appointment> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| SchedulingError::NotFound("Appointment".to_string()))
    }

    pub async fn get_appointment_request(
        &self,
        request_id: Uuid,
        auth_token: &str,
    ) -> Result<AppointmentRequest, SchedulingError> {
        let path = format!("/rest/v1/appointment_requests?id=eq.{}", request_id);
        let rows: Vec<AppointmentRequest> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| SchedulingError::NotFound("Appointment request".to_string()))
    }
}
