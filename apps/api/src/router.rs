use axum::{routing::get, Router};

use scheduling_cell::handlers::AppState;
use scheduling_cell::router::scheduling_routes;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic scheduling API is running!" }))
        .nest("/scheduling", scheduling_routes(state))
}
