// libs/schedule-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;

use crate::handlers;
use crate::services::ScheduleService;

pub fn schedule_routes(state: Arc<AppConfig>) -> Router {
    schedule_routes_with_service(Arc::new(ScheduleService::new(&state)))
}

pub fn schedule_routes_with_service(service: Arc<ScheduleService>) -> Router {
    Router::new()
        // Roster and settings
        .route("/doctors", get(handlers::list_doctors))
        .route(
            "/settings",
            get(handlers::get_settings).put(handlers::update_settings),
        )
        // Per-doctor schedule
        .route("/doctors/{doctor_id}/generate", post(handlers::generate_schedule))
        .route("/doctors/{doctor_id}/slots", get(handlers::get_doctor_slots))
        .route("/doctors/{doctor_id}/week", get(handlers::get_weekly_grid))
        // Slot mutations
        .route("/slots/book", post(handlers::book_slot))
        .route("/slots/cancel", post(handlers::cancel_booking))
        .route("/slots/toggle", post(handlers::toggle_slot))
        // Transfers
        .route(
            "/transfer",
            get(handlers::get_pending_transfer).delete(handlers::cancel_transfer),
        )
        .route("/transfer/begin", post(handlers::begin_transfer))
        .route("/transfer/complete", post(handlers::complete_transfer))
        .with_state(service)
}
