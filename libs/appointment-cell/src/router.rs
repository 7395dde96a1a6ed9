// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::handlers;
use crate::services::booking::SchedulingEngine;

pub fn appointment_routes(engine: Arc<SchedulingEngine>) -> Router {
    Router::new()
        // Core appointment management
        .route("/", post(handlers::book_appointment).get(handlers::list_appointments))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}/confirm", post(handlers::confirm_appointment))
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .route("/{appointment_id}/reschedule", patch(handlers::reschedule_appointment))
        .route("/{appointment_id}/start", post(handlers::start_appointment))
        .route("/{appointment_id}/attend", post(handlers::attend_appointment))
        .route("/{appointment_id}/refer", post(handlers::refer_patient))

        // Appointment listings
        .route("/patients/{patient_id}", get(handlers::get_patient_appointments))
        .route("/patients/{patient_id}/history", get(handlers::get_clinical_history))
        .route("/doctors/{doctor_id}/agenda", get(handlers::get_doctor_agenda))
        .route("/rooms/{room_number}/schedule", get(handlers::get_room_schedule))

        // Availability
        .route("/doctors/{doctor_id}/availability", get(handlers::check_doctor_availability))
        .route("/rooms/{room_number}/availability", get(handlers::check_room_availability))

        .with_state(engine)
}
