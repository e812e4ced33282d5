// libs/schedule-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};

use shared_models::error::AppError;

use crate::models::{
    BookSlotRequest, CompleteTransferRequest, GridFilter, ScheduleError, SlotKey,
    UpdateSettingsRequest,
};
use crate::services::ScheduleService;

impl From<ScheduleError> for AppError {
    fn from(error: ScheduleError) -> Self {
        let message = error.to_string();
        match error {
            ScheduleError::DoctorNotSelected
            | ScheduleError::OutsideWorkingHours(_)
            | ScheduleError::ValidationError(_) => AppError::ValidationError(message),
            ScheduleError::DoctorNotFound(_) | ScheduleError::SlotNotFound(_) => {
                AppError::NotFound(message)
            }
            ScheduleError::InvalidTransition { .. } => AppError::Conflict(message),
            ScheduleError::Busy => AppError::Unavailable(message),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WeekQuery {
    pub working: Option<bool>,
    pub non_working: Option<bool>,
    pub today: Option<NaiveDate>,
}

impl WeekQuery {
    fn filter(&self) -> GridFilter {
        let defaults = GridFilter::default();
        GridFilter {
            show_working_hours: self.working.unwrap_or(defaults.show_working_hours),
            show_non_working_hours: self.non_working.unwrap_or(defaults.show_non_working_hours),
        }
    }
}

// ==============================================================================
// DOCTORS & SETTINGS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_doctors(State(service): State<Arc<ScheduleService>>) -> Json<Value> {
    let doctors = service.doctors();

    Json(json!({
        "doctors": doctors,
        "total": doctors.len()
    }))
}

#[axum::debug_handler]
pub async fn get_settings(State(service): State<Arc<ScheduleService>>) -> Json<Value> {
    Json(json!(service.settings().await))
}

#[axum::debug_handler]
pub async fn update_settings(
    State(service): State<Arc<ScheduleService>>,
    Json(request): Json<UpdateSettingsRequest>,
) -> Result<Json<Value>, AppError> {
    let settings = service.update_settings(request).await?;
    Ok(Json(json!(settings)))
}

// ==============================================================================
// SCHEDULE
// ==============================================================================

#[axum::debug_handler]
pub async fn generate_schedule(
    State(service): State<Arc<ScheduleService>>,
    Path(doctor_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let report = service.generate_schedule(&doctor_id).await?;
    Ok(Json(json!(report)))
}

#[axum::debug_handler]
pub async fn get_doctor_slots(
    State(service): State<Arc<ScheduleService>>,
    Path(doctor_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let slots = service.doctor_slots(&doctor_id).await?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "slots": slots,
        "total": slots.len()
    })))
}

#[axum::debug_handler]
pub async fn get_weekly_grid(
    State(service): State<Arc<ScheduleService>>,
    Path(doctor_id): Path<String>,
    Query(query): Query<WeekQuery>,
) -> Result<Json<Value>, AppError> {
    let grid = service
        .weekly_grid(&doctor_id, query.filter(), query.today)
        .await?;
    Ok(Json(json!(grid)))
}

// ==============================================================================
// SLOT MUTATIONS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_slot(
    State(service): State<Arc<ScheduleService>>,
    Json(request): Json<BookSlotRequest>,
) -> Result<Json<Value>, AppError> {
    let slot = service
        .book_slot(&request.slot, &request.patient_name, &request.patient_phone)
        .await?;
    Ok(Json(json!(slot)))
}

#[axum::debug_handler]
pub async fn cancel_booking(
    State(service): State<Arc<ScheduleService>>,
    Json(key): Json<SlotKey>,
) -> Result<Json<Value>, AppError> {
    let slot = service.cancel_booking(&key).await?;
    Ok(Json(json!(slot)))
}

#[axum::debug_handler]
pub async fn toggle_slot(
    State(service): State<Arc<ScheduleService>>,
    Json(key): Json<SlotKey>,
) -> Result<Json<Value>, AppError> {
    let slot = service.toggle_slot(&key).await?;
    Ok(Json(json!(slot)))
}

// ==============================================================================
// TRANSFERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_pending_transfer(State(service): State<Arc<ScheduleService>>) -> Json<Value> {
    Json(json!({
        "pending_transfer": service.pending_transfer().await
    }))
}

#[axum::debug_handler]
pub async fn begin_transfer(
    State(service): State<Arc<ScheduleService>>,
    Json(key): Json<SlotKey>,
) -> Result<Json<Value>, AppError> {
    let pending = service.begin_transfer(&key).await?;
    Ok(Json(json!(pending)))
}

#[axum::debug_handler]
pub async fn cancel_transfer(State(service): State<Arc<ScheduleService>>) -> Json<Value> {
    let cleared = service.cancel_transfer().await;

    Json(json!({
        "cancelled": cleared.is_some(),
        "transfer": cleared
    }))
}

#[axum::debug_handler]
pub async fn complete_transfer(
    State(service): State<Arc<ScheduleService>>,
    Json(request): Json<CompleteTransferRequest>,
) -> Result<Json<Value>, AppError> {
    let outcome = service.complete_transfer(&request.from, &request.to).await?;
    Ok(Json(json!(outcome)))
}
