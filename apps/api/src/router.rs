use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::appointment_routes;
use appointment_cell::SchedulingEngine;

pub fn create_router(engine: Arc<SchedulingEngine>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic Scheduler API is running!" }))
        .nest("/api/appointments", appointment_routes(engine))
}
