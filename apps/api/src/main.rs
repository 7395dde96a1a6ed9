use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::{self, TraceLayer};
use tracing::{Level, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use appointment_cell::{CsvAppointmentStore, RoomAssignmentPolicy, SchedulingEngine};
use directory_cell::seed::sample_clinic;
use directory_cell::{DirectoryStorage, InMemoryDirectory};
use shared_config::AppConfig;
use shared_utils::SystemClock;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Clinic Scheduler API server");

    // Load configuration
    let config = AppConfig::from_env();

    // Open the directory of patients, doctors and rooms
    let directory = InMemoryDirectory::open(DirectoryStorage::new(config.directory_dir()))
        .await
        .context("failed to open directory storage")?;
    if directory.is_empty().await && config.seed_sample_data {
        info!("Directory is empty, seeding sample clinic");
        directory
            .seed(sample_clinic())
            .await
            .context("failed to seed sample clinic")?;
    }

    // Recover appointments written by previous runs
    let store = CsvAppointmentStore::new(config.appointments_file());
    let engine = SchedulingEngine::new(Arc::new(directory), Arc::new(store), Arc::new(SystemClock))
        .with_room_policy(RoomAssignmentPolicy::from_flag(config.auto_assign_doctor_room));
    let report = engine
        .load()
        .await
        .context("failed to load appointments")?;
    info!("Appointment registry ready, {} appointments", report.loaded);

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the application router
    let app = router::create_router(Arc::new(engine))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new()
                    .level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new()
                    .level(Level::INFO)),
        )
        .layer(cors);

    // Run the server
    let listener = TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address))?;
    info!("Listening on {}", config.bind_address);

    axum::serve(listener, app)
        .await
        .context("server error")?;

    Ok(())
}
