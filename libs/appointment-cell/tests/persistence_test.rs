mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::Duration;
use tempfile::TempDir;

use appointment_cell::{
    AppointmentError, AppointmentStatus, AppointmentStore, AttendAppointmentRequest, CsvAppointmentStore, SchedulingEngine,
};
use directory_cell::{Directory, InMemoryDirectory};
use shared_utils::test_utils::{datetime, fixed_clock, TestConfig};

use common::{booking, clinic};

fn csv_engine(dir: &TempDir) -> (SchedulingEngine, Arc<CsvAppointmentStore>) {
    let config = TestConfig::with_data_dir(dir.path());
    let store = Arc::new(CsvAppointmentStore::new(config.appointments_file()));
    let directory: Arc<dyn Directory> = Arc::new(InMemoryDirectory::from_snapshot(clinic()));

    let engine = SchedulingEngine::new(
        directory,
        Arc::clone(&store) as Arc<dyn AppointmentStore>,
        fixed_clock(2025, 11, 30, 8, 0),
    );
    (engine, store)
}

#[tokio::test]
async fn test_missing_file_loads_empty_registry() {
    let dir = TempDir::new().unwrap();
    let (engine, _) = csv_engine(&dir);

    let report = engine.load().await.unwrap();
    assert_eq!(report.loaded, 0);
    assert_eq!(report.next_sequence, 1);
}

#[tokio::test]
async fn test_restart_restores_appointments_and_clinical_fields() {
    let dir = TempDir::new().unwrap();
    let (engine, store) = csv_engine(&dir);

    let attended = engine
        .book_appointment(booking("P1", "D1", "R1", datetime(2025, 12, 1, 10, 0)))
        .await
        .unwrap();
    let attended = engine
        .attend_appointment(
            &attended.id,
            AttendAppointmentRequest {
                diagnosis: "Tension headache; mild".to_string(),
                treatment: "Ibuprofen".to_string(),
                observations: "Return if it persists\nafter a week".to_string(),
            },
        )
        .await
        .unwrap();
    let pending = engine
        .book_appointment(booking("P2", "D2", "R2", datetime(2025, 12, 1, 10, 0)))
        .await
        .unwrap();

    let contents = std::fs::read_to_string(store.path()).unwrap();
    assert_eq!(contents.lines().count(), 2);

    let (restarted, _) = csv_engine(&dir);
    let report = restarted.load().await.unwrap();
    assert_eq!(report.loaded, 2);

    assert_eq!(restarted.get_appointment(&attended.id).await.unwrap(), attended);
    assert_eq!(restarted.get_appointment(&pending.id).await.unwrap(), pending);
    assert_eq!(restarted.doctor_agenda("D1").await, vec![attended]);
}

#[tokio::test]
async fn test_sub_minute_times_survive_a_restart() {
    let dir = TempDir::new().unwrap();
    let (engine, _) = csv_engine(&dir);

    let booked = engine
        .book_appointment(booking(
            "P1",
            "D1",
            "R1",
            datetime(2025, 12, 1, 10, 0) + Duration::seconds(45) + Duration::nanoseconds(120),
        ))
        .await
        .unwrap();
    assert_eq!(booked.scheduled_at, datetime(2025, 12, 1, 10, 0));

    let moved = engine
        .book_appointment(booking("P2", "D2", "R2", datetime(2025, 12, 1, 10, 0)))
        .await
        .unwrap();
    let moved = engine
        .reschedule_appointment(&moved.id, datetime(2025, 12, 1, 11, 30) + Duration::seconds(59))
        .await
        .unwrap();
    assert_eq!(moved.scheduled_at, datetime(2025, 12, 1, 11, 30));

    let (restarted, _) = csv_engine(&dir);
    restarted.load().await.unwrap();
    assert_eq!(restarted.get_appointment(&booked.id).await.unwrap(), booked);
    assert_eq!(restarted.get_appointment(&moved.id).await.unwrap(), moved);
}

#[tokio::test]
async fn test_counter_resumes_after_highest_persisted_id() {
    let dir = TempDir::new().unwrap();
    let config = TestConfig::with_data_dir(dir.path());
    std::fs::write(
        config.appointments_file(),
        "CITA-A0000041;P1;D1;R1;Checkup;01/12/2025 09:00;COMPLETED\n\
         CITA-A0000007;P2;D2;R2;Checkup;01/12/2025 09:00;PENDING\n",
    )
    .unwrap();

    let (engine, _) = csv_engine(&dir);
    let report = engine.load().await.unwrap();
    assert_eq!(report.next_sequence, 42);

    let booked = engine
        .book_appointment(booking("P1", "D1", "R1", datetime(2025, 12, 2, 9, 0)))
        .await
        .unwrap();
    assert_eq!(booked.id, "CITA-A0000042");
}

#[tokio::test]
async fn test_bad_records_are_skipped_without_blocking_others() {
    let dir = TempDir::new().unwrap();
    let config = TestConfig::with_data_dir(dir.path());
    std::fs::write(
        config.appointments_file(),
        "CITA-A0000001;P1;D1;R1;Checkup;01/12/2025 09:00;PENDING\n\
         this line is not an appointment\n\
         CITA-A0000002;P404;D1;R1;Checkup;01/12/2025 10:00;PENDING\n\
         CITA-A0000003;P2;D1;R9;Checkup;01/12/2025 11:00;PENDING\n\
         \n\
         CITA-A0000004;P2;D2;R2;Legacy line without state;01/12/2025 12:00\n",
    )
    .unwrap();

    let (engine, _) = csv_engine(&dir);
    let report = engine.load().await.unwrap();

    assert_eq!(report.loaded, 2);
    assert_eq!(report.skipped_malformed, 1);
    assert_eq!(report.skipped_unresolved, 2);
    assert_eq!(report.next_sequence, 5);

    let legacy = engine.get_appointment("CITA-A0000004").await.unwrap();
    assert_eq!(legacy.status, AppointmentStatus::Pending);
    assert!(engine.get_appointment("CITA-A0000002").await.is_err());
}

#[tokio::test]
async fn test_undecodable_bytes_skip_only_their_line() {
    let dir = TempDir::new().unwrap();
    let config = TestConfig::with_data_dir(dir.path());
    let mut contents = b"CITA-A0000001;P1;D1;R1;Checkup;01/12/2025 09:00;PENDING\n".to_vec();
    contents.extend_from_slice(b"CITA-A0000002;P2;D2;R2;Caf\xff;01/12/2025 10:00;PENDING\n");
    contents.extend_from_slice(b"CITA-A0000003;P2;D2;R2;Checkup;01/12/2025 11:00;CONFIRMED\n");
    std::fs::write(config.appointments_file(), contents).unwrap();

    let (engine, _) = csv_engine(&dir);
    let report = engine.load().await.unwrap();

    assert_eq!(report.loaded, 2);
    assert_eq!(report.skipped_malformed, 1);
    assert!(engine.get_appointment("CITA-A0000001").await.is_ok());
    assert!(engine.get_appointment("CITA-A0000003").await.is_ok());
}

#[tokio::test]
async fn test_exhausted_id_sequence_rejects_booking_without_panicking() {
    let dir = TempDir::new().unwrap();
    let config = TestConfig::with_data_dir(dir.path());
    std::fs::write(
        config.appointments_file(),
        format!("CITA-A{};P1;D1;R1;Checkup;01/12/2025 09:00;PENDING\n", u64::MAX),
    )
    .unwrap();

    let (engine, _) = csv_engine(&dir);
    let report = engine.load().await.unwrap();
    assert_eq!(report.loaded, 1);

    assert_matches!(
        engine
            .book_appointment(booking("P2", "D2", "R2", datetime(2025, 12, 2, 9, 0)))
            .await,
        Err(AppointmentError::PersistenceError(_))
    );
    assert_eq!(engine.all_appointments().await.len(), 1);
}

#[tokio::test]
async fn test_loaded_appointments_still_block_their_slots() {
    let dir = TempDir::new().unwrap();
    let config = TestConfig::with_data_dir(dir.path());
    std::fs::write(
        config.appointments_file(),
        "CITA-A0000001;P1;D1;R1;Checkup;01/12/2025 09:00;CONFIRMED\n\
         CITA-A0000002;P2;D2;R2;Checkup;01/12/2025 09:00;CANCELLED\n",
    )
    .unwrap();

    let (engine, _) = csv_engine(&dir);
    engine.load().await.unwrap();

    assert!(engine
        .book_appointment(booking("P2", "D1", "R2", datetime(2025, 12, 1, 9, 15)))
        .await
        .is_err());
    assert!(engine
        .book_appointment(booking("P1", "D2", "R2", datetime(2025, 12, 1, 9, 0)))
        .await
        .is_ok());
}
