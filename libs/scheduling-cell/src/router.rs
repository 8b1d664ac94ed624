use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::handlers::{self, AppState};

pub fn scheduling_routes(state: AppState) -> Router {
    Router::new()
        // Slot queries
        .route("/available-slots", get(handlers::get_available_slots))
        // Booking and rescheduling
        .route(
            "/appointment-requests",
            post(handlers::create_appointment_request),
        )
        .route("/reschedule", post(handlers::reschedule_appointment))
        // Schedule management feeding the slot engine
        .route("/working-hours", post(handlers::create_working_hours))
        .route(
            "/working-hours/{working_hours_id}",
            delete(handlers::delete_working_hours),
        )
        .route("/days-off", post(handlers::create_day_off))
        .route("/days-off/{day_off_id}", delete(handlers::delete_day_off))
        // Process-wide defaults
        .route("/config/refresh", post(handlers::refresh_defaults))
        .with_state(state)
}
