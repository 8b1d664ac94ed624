use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use chrono::NaiveDate;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::error::AppError;

use crate::models::{
    AvailableSlotsResponse, CreateAppointmentRequest, CreateDayOffRequest,
    CreateWorkingHoursRequest, RescheduleAppointmentRequest,
};
use crate::services::{
    staff_config, BookingService, DefaultsHandle, DirectoryService, RescheduleService,
    SlotService, StaffingService,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub defaults: DefaultsHandle,
}

#[derive(Debug, Deserialize)]
pub struct AvailableSlotsQuery {
    pub staff_member_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
}

#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<AvailableSlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let (Some(staff_member_id), Some(date)) = (query.staff_member_id, query.date) else {
        return Err(AppError::BadRequest(
            "staff_member_id and date are required".to_string(),
        ));
    };
    let token = auth.token();

    let directory = DirectoryService::new(&state.config);
    let staff = directory.get_staff_member(staff_member_id, token).await?;

    let defaults = state.defaults.read().await.clone();
    let slot_service = SlotService::new(&state.config);
    let slots = slot_service
        .available_slots(&staff, date, &defaults, token)
        .await?;

    let response = AvailableSlotsResponse {
        date,
        staff_member: staff.full_name,
        available_slots: slots
            .into_iter()
            .map(|slot| slot.format("%H:%M").to_string())
            .collect(),
    };

    Ok(Json(json!(response)))
}

#[axum::debug_handler]
pub async fn create_appointment_request(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let booking = BookingService::new(&state.config);
    let (appointment_request, appointment) =
        booking.create_appointment(request, auth.token()).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "appointment_request": appointment_request,
            "appointment": appointment,
        })),
    ))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let defaults = state.defaults.read().await.clone();
    let reschedule_service = RescheduleService::new(&state.config);
    let hold = reschedule_service
        .reschedule(request, &defaults, auth.token())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "message": "Reschedule request recorded",
            "reschedule_id": hold.id,
        })),
    ))
}

#[axum::debug_handler]
pub async fn create_working_hours(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<CreateWorkingHoursRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let token = auth.token();
    let directory = DirectoryService::new(&state.config);
    let staff = directory.staff_member_for_caller(token).await?;

    let staffing = StaffingService::new(&state.config);
    let working_hours = staffing.create_working_hours(&staff, request, token).await?;

    Ok((StatusCode::CREATED, Json(json!(working_hours))))
}

#[axum::debug_handler]
pub async fn delete_working_hours(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(working_hours_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let directory = DirectoryService::new(&state.config);
    let staff = directory.staff_member_for_caller(token).await?;

    let staffing = StaffingService::new(&state.config);
    staffing
        .delete_working_hours(working_hours_id, &staff, token)
        .await?;

    Ok(Json(json!({ "status": "deleted" })))
}

#[axum::debug_handler]
pub async fn create_day_off(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<CreateDayOffRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let token = auth.token();
    let directory = DirectoryService::new(&state.config);
    let staff = directory.staff_member_for_caller(token).await?;

    let staffing = StaffingService::new(&state.config);
    let day_off = staffing.create_day_off(&staff, request, token).await?;

    Ok((StatusCode::CREATED, Json(json!(day_off))))
}

#[axum::debug_handler]
pub async fn delete_day_off(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(day_off_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let directory = DirectoryService::new(&state.config);
    let staff = directory.staff_member_for_caller(token).await?;

    let staffing = StaffingService::new(&state.config);
    staffing.delete_day_off(day_off_id, &staff, token).await?;

    Ok(Json(json!({ "status": "deleted" })))
}

/// Re-read the scheduling_config singleton into the process-wide
/// defaults.
#[axum::debug_handler]
pub async fn refresh_defaults(
    State(state): State<AppState>,
    TypedHeader(_auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let supabase = SupabaseClient::new(&state.config);
    let defaults = staff_config::load_defaults(&supabase).await?;

    let mut current = state.defaults.write().await;
    *current = defaults.clone();

    Ok(Json(json!(defaults)))
}
