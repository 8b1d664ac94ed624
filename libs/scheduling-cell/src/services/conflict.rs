use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use reqwest::Method;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{AppointmentRequest, RescheduleHistory, SchedulingError};

pub struct ConflictFilterService {
    supabase: SupabaseClient,
}

impl ConflictFilterService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Remove candidate slots that overlap a booked appointment request
    /// or a live reschedule hold for the same staff member and date.
    /// Read-only; hold expiry is evaluated here by timestamp comparison,
    /// there is no background sweep.
    pub async fn exclude(
        &self,
        candidates: Vec<NaiveTime>,
        staff_member_id: Uuid,
        date: NaiveDate,
        slot_duration: i32,
        auth_token: &str,
    ) -> Result<Vec<NaiveTime>, SchedulingError> {
        if candidates.is_empty() {
            return Ok(candidates);
        }

        let booked = self
            .booked_requests(staff_member_id, date, auth_token)
            .await?;
        let holds = self.pending_holds(staff_member_id, date, auth_token).await?;

        let now = Utc::now();
        let live_holds: Vec<&RescheduleHistory> =
            holds.iter().filter(|h| h.still_valid_at(now)).collect();

        debug!(
            "Filtering {} candidates against {} bookings and {} live holds for staff {} on {}",
            candidates.len(),
            booked.len(),
            live_holds.len(),
            staff_member_id,
            date
        );

        let duration = Duration::minutes(slot_duration as i64);
        let filtered = candidates
            .into_iter()
            .filter(|&slot| {
                let (slot_end, wrapped) = slot.overflowing_add_signed(duration);
                if wrapped != 0 {
                    return false;
                }
                let blocked = booked
                    .iter()
                    .any(|b| intervals_overlap(slot, slot_end, b.start_time, b.end_time))
                    || live_holds
                        .iter()
                        .any(|h| intervals_overlap(slot, slot_end, h.start_time, h.end_time));
                !blocked
            })
            .collect();

        Ok(filtered)
    }

    async fn booked_requests(
        &self,
        staff_member_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<AppointmentRequest>, SchedulingError> {
        let path = format!(
            "/rest/v1/appointment_requests?staff_member_id=eq.{}&date=eq.{}&order=start_time.asc",
            staff_member_id, date
        );
        let requests = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;
        Ok(requests)
    }

    async fn pending_holds(
        &self,
        staff_member_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<RescheduleHistory>, SchedulingError> {
        let path = format!(
            "/rest/v1/reschedule_history?staff_member_id=eq.{}&date=eq.{}&reschedule_status=eq.pending",
            staff_member_id, date
        );
        let holds = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;
        Ok(holds)
    }
}

/// True interval overlap over half-open ranges: [a_start, a_end) and
/// [b_start, b_end) overlap iff a_start < b_end && b_start < a_end.
/// Adjacent intervals sharing only an endpoint do not overlap.
pub fn intervals_overlap(
    a_start: NaiveTime,
    a_end: NaiveTime,
    b_start: NaiveTime,
    b_end: NaiveTime,
) -> bool {
    a_start < b_end && b_start < a_end
}
