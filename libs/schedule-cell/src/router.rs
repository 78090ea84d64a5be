use std::sync::Arc;

use axum::{routing::get, Router};

use shared_config::AppConfig;

use crate::handlers;
use crate::services::ScheduleService;

pub fn schedule_routes(state: Arc<AppConfig>) -> Router {
    schedule_routes_with_service(Arc::new(ScheduleService::new(&state)))
}

pub fn schedule_routes_with_service(service: Arc<ScheduleService>) -> Router {
    Router::new()
        .route("/{doctor_id}/schedule", get(handlers::get_doctor_schedule))
        .route("/{doctor_id}/candidate-slots", get(handlers::get_candidate_slots))
        .with_state(service)
}
