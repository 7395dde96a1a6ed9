// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::{json, Value};

use shared_models::error::AppError;

use crate::models::{
    AppointmentError, AttendAppointmentRequest, AvailabilityResponse, BookAppointmentRequest,
    CancelAppointmentRequest, ErrorKind, ReferPatientRequest, ReferralOutcome, RescheduleAppointmentRequest,
    slot_duration,
};
use crate::services::booking::SchedulingEngine;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub at: NaiveDateTime,
}

// ==============================================================================
// ERROR MAPPING
// ==============================================================================

pub fn map_appointment_error(e: AppointmentError) -> AppError {
    let message = e.to_string();
    match e.kind() {
        ErrorKind::Validation => AppError::ValidationError(message),
        ErrorKind::Conflict | ErrorKind::StateTransition => AppError::Conflict(message),
        ErrorKind::NotFound => AppError::NotFound(message),
        ErrorKind::Unauthorized => AppError::Auth(message),
        ErrorKind::Persistence => AppError::Persistence(message),
    }
}

// ==============================================================================
// BOOKING HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(engine): State<Arc<SchedulingEngine>>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = engine
        .book_appointment(request)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment booked successfully"
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(engine): State<Arc<SchedulingEngine>>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let appointment = engine
        .get_appointment(&appointment_id)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn list_appointments(State(engine): State<Arc<SchedulingEngine>>) -> Json<Value> {
    let appointments = engine.all_appointments().await;
    Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    }))
}

// ==============================================================================
// LIFECYCLE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn confirm_appointment(
    State(engine): State<Arc<SchedulingEngine>>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let appointment = engine
        .confirm_appointment(&appointment_id)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment confirmed"
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(engine): State<Arc<SchedulingEngine>>,
    Path(appointment_id): Path<String>,
    Json(request): Json<CancelAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = engine
        .cancel_appointment(&appointment_id, &request.patient_id)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment cancelled successfully"
    })))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(engine): State<Arc<SchedulingEngine>>,
    Path(appointment_id): Path<String>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = engine
        .reschedule_appointment(&appointment_id, request.new_start_time)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment rescheduled successfully"
    })))
}

#[axum::debug_handler]
pub async fn start_appointment(
    State(engine): State<Arc<SchedulingEngine>>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let appointment = engine
        .begin_attention(&appointment_id)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment in attention"
    })))
}

#[axum::debug_handler]
pub async fn attend_appointment(
    State(engine): State<Arc<SchedulingEngine>>,
    Path(appointment_id): Path<String>,
    Json(request): Json<AttendAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = engine
        .attend_appointment(&appointment_id, request)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment completed"
    })))
}

/// Referral outcomes other than success are still 200: they are answers, not failures.
#[axum::debug_handler]
pub async fn refer_patient(
    State(engine): State<Arc<SchedulingEngine>>,
    Path(appointment_id): Path<String>,
    Json(request): Json<ReferPatientRequest>,
) -> Result<Json<Value>, AppError> {
    let outcome = engine
        .refer_patient(&appointment_id, request)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": matches!(outcome, ReferralOutcome::Referred { .. }),
        "message": outcome.message(),
        "result": outcome
    })))
}

// ==============================================================================
// LISTING HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_patient_appointments(
    State(engine): State<Arc<SchedulingEngine>>,
    Path(patient_id): Path<String>,
) -> Json<Value> {
    let appointments = engine.patient_appointments(&patient_id).await;
    Json(json!({
        "patient_id": patient_id,
        "appointments": appointments,
        "total": appointments.len()
    }))
}

#[axum::debug_handler]
pub async fn get_clinical_history(
    State(engine): State<Arc<SchedulingEngine>>,
    Path(patient_id): Path<String>,
) -> Json<Value> {
    let history = engine.clinical_history(&patient_id).await;
    Json(json!({
        "patient_id": patient_id,
        "history": history,
        "total": history.len()
    }))
}

#[axum::debug_handler]
pub async fn get_doctor_agenda(
    State(engine): State<Arc<SchedulingEngine>>,
    Path(doctor_id): Path<String>,
) -> Json<Value> {
    let agenda = engine.doctor_agenda(&doctor_id).await;
    Json(json!({
        "doctor_id": doctor_id,
        "appointments": agenda,
        "total": agenda.len()
    }))
}

#[axum::debug_handler]
pub async fn get_room_schedule(
    State(engine): State<Arc<SchedulingEngine>>,
    Path(room_number): Path<String>,
) -> Json<Value> {
    let schedule = engine.room_schedule(&room_number).await;
    Json(json!({
        "room_number": room_number,
        "appointments": schedule,
        "total": schedule.len()
    }))
}

// ==============================================================================
// AVAILABILITY HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn check_doctor_availability(
    State(engine): State<Arc<SchedulingEngine>>,
    Path(doctor_id): Path<String>,
    Query(query): Query<AvailabilityQuery>,
) -> Json<AvailabilityResponse> {
    let available = engine.is_doctor_available(&doctor_id, query.at).await;
    Json(AvailabilityResponse {
        resource_id: doctor_id,
        start_time: query.at,
        end_time: query.at + slot_duration(),
        available,
    })
}

#[axum::debug_handler]
pub async fn check_room_availability(
    State(engine): State<Arc<SchedulingEngine>>,
    Path(room_number): Path<String>,
    Query(query): Query<AvailabilityQuery>,
) -> Json<AvailabilityResponse> {
    let available = engine.is_room_available(&room_number, query.at).await;
    Json(AvailabilityResponse {
        resource_id: room_number,
        start_time: query.at,
        end_time: query.at + slot_duration(),
        available,
    })
}
