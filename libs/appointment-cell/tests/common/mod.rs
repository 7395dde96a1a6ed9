#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;

use appointment_cell::services::persistence::StoredAppointments;
use appointment_cell::{
    Appointment, AppointmentError, AppointmentStore, BookAppointmentRequest, InMemoryAppointmentStore,
    SchedulingEngine,
};
use directory_cell::{Directory, DirectorySnapshot, Doctor, InMemoryDirectory, Patient, Room, User};
use shared_utils::test_utils::{datetime, fixed_clock};
use shared_utils::{Clock, FixedClock};

/// 2025-11-30 08:00, the day before most fixture bookings.
pub fn test_now() -> NaiveDateTime {
    datetime(2025, 11, 30, 8, 0)
}

pub fn patient(id: &str) -> Patient {
    Patient {
        id: id.to_string(),
        first_name: "Patient".to_string(),
        last_name: id.to_string(),
        phone: "555-1000".to_string(),
        email: format!("{}@patients.example", id.to_lowercase()),
        birth_date: "01/01/1990".to_string(),
        clinical_record: format!("HC-{}", id),
        blood_type: "O+".to_string(),
        sex: "F".to_string(),
    }
}

pub fn doctor(id: &str, specialty: &str) -> Doctor {
    Doctor {
        id: id.to_string(),
        first_name: "Doctor".to_string(),
        last_name: id.to_string(),
        phone: "555-2000".to_string(),
        email: format!("{}@clinic.example", id.to_lowercase()),
        specialty: specialty.to_string(),
        assigned_room: None,
    }
}

pub fn room(number: &str) -> Room {
    Room {
        number: number.to_string(),
        available: true,
        location: "Main building".to_string(),
    }
}

/// Patients P1, P2; doctors D1 (General Medicine), D2 (Cardiology); rooms R1, R2.
pub fn clinic() -> DirectorySnapshot {
    DirectorySnapshot {
        users: vec![
            User::Patient(patient("P1")),
            User::Patient(patient("P2")),
            User::Doctor(doctor("D1", "General Medicine")),
            User::Doctor(doctor("D2", "Cardiology")),
        ],
        rooms: vec![room("R1"), room("R2")],
    }
}

pub struct TestEngine {
    pub engine: SchedulingEngine,
    pub directory: Arc<InMemoryDirectory>,
    pub store: Arc<InMemoryAppointmentStore>,
    pub clock: Arc<FixedClock>,
}

pub fn engine_with(snapshot: DirectorySnapshot, store: InMemoryAppointmentStore) -> TestEngine {
    let directory = Arc::new(InMemoryDirectory::from_snapshot(snapshot));
    let store = Arc::new(store);
    let clock = fixed_clock(2025, 11, 30, 8, 0);

    let engine = SchedulingEngine::new(
        Arc::clone(&directory) as Arc<dyn Directory>,
        Arc::clone(&store) as Arc<dyn AppointmentStore>,
        Arc::clone(&clock) as Arc<dyn Clock>,
    );

    TestEngine {
        engine,
        directory,
        store,
        clock,
    }
}

pub fn test_engine() -> TestEngine {
    engine_with(clinic(), InMemoryAppointmentStore::new())
}

/// Loads nothing and rejects every save, like a read-only or full disk.
#[derive(Default)]
pub struct FailingAppointmentStore;

#[async_trait]
impl AppointmentStore for FailingAppointmentStore {
    async fn load(&self) -> Result<StoredAppointments, AppointmentError> {
        Ok(StoredAppointments::default())
    }

    async fn save_all(&self, _appointments: &[Appointment]) -> Result<(), AppointmentError> {
        Err(AppointmentError::PersistenceError("disk is read-only".to_string()))
    }
}

pub fn failing_store_engine() -> SchedulingEngine {
    SchedulingEngine::new(
        Arc::new(InMemoryDirectory::from_snapshot(clinic())) as Arc<dyn Directory>,
        Arc::new(FailingAppointmentStore) as Arc<dyn AppointmentStore>,
        fixed_clock(2025, 11, 30, 8, 0) as Arc<dyn Clock>,
    )
}

pub fn booking(patient: &str, doctor: &str, room: &str, at: NaiveDateTime) -> BookAppointmentRequest {
    BookAppointmentRequest {
        patient_id: patient.to_string(),
        doctor_id: doctor.to_string(),
        room_number: room.to_string(),
        reason: "General checkup".to_string(),
        scheduled_at: at,
    }
}
