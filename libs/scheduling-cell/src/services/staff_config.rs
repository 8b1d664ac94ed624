use std::sync::Arc;

use reqwest::Method;
use tokio::sync::RwLock;
use tracing::debug;

use shared_database::SupabaseClient;

use crate::models::{ResolvedScheduleConfig, SchedulingDefaults, SchedulingError, StaffMember};

/// Shared handle to the process-wide scheduling defaults. Loaded once at
/// startup and refreshed on demand; slot queries only ever read it.
pub type DefaultsHandle = Arc<RwLock<SchedulingDefaults>>;

/// Resolve the effective scheduling parameters for a staff member. Each
/// field independently falls back to the process-wide defaults; fields
/// absent on both sides resolve to their zero value.
pub fn resolve(staff: &StaffMember, defaults: &SchedulingDefaults) -> ResolvedScheduleConfig {
    ResolvedScheduleConfig {
        slot_duration: staff.slot_duration.or(defaults.slot_duration).unwrap_or(0),
        lead_time: staff.lead_time.or(defaults.lead_time),
        finish_time: staff.finish_time.or(defaults.finish_time),
        buffer_minutes: staff
            .appointment_buffer_minutes
            .or(defaults.appointment_buffer_minutes)
            .unwrap_or(0),
    }
}

/// Read the `scheduling_config` singleton row. A missing row is not an
/// error; it yields the zero-value defaults.
pub async fn load_defaults(supabase: &SupabaseClient) -> Result<SchedulingDefaults, SchedulingError> {
    let rows: Vec<SchedulingDefaults> = supabase
        .request(Method::GET, "/rest/v1/scheduling_config?id=eq.1", None, None)
        .await?;

    let defaults = rows.into_iter().next().unwrap_or_default();
    debug!("Loaded scheduling defaults: {:?}", defaults);
    Ok(defaults)
}
