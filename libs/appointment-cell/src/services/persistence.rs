// libs/appointment-cell/src/services/persistence.rs
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use regex::Regex;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use directory_cell::{sanitize_field, Directory, FIELD_SEPARATOR};

use crate::models::{Appointment, AppointmentError, AppointmentStatus, LoadReport, APPOINTMENT_ID_PREFIX};

/// Timestamp layout of the appointment file, e.g. `01/12/2025 10:00`.
pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Records read back from a store before their references are checked.
#[derive(Debug, Clone, Default)]
pub struct StoredAppointments {
    pub appointments: Vec<Appointment>,
    pub skipped_malformed: usize,
}

/// Durable home of the appointment registry.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn load(&self) -> Result<StoredAppointments, AppointmentError>;

    /// Replace the stored contents with the given appointments, in order.
    async fn save_all(&self, appointments: &[Appointment]) -> Result<(), AppointmentError>;
}

// ==============================================================================
// LINE CODEC
// ==============================================================================

pub fn encode_appointment(appointment: &Appointment) -> String {
    let scheduled_at = appointment.scheduled_at.format(TIMESTAMP_FORMAT).to_string();
    let mut fields = vec![
        sanitize_field(&appointment.id),
        sanitize_field(&appointment.patient_id),
        sanitize_field(&appointment.doctor_id),
        sanitize_field(&appointment.room_number),
        sanitize_field(&appointment.reason),
        scheduled_at,
        appointment.status.as_str().to_string(),
    ];

    let has_clinical_fields = !(appointment.diagnosis.is_empty()
        && appointment.treatment.is_empty()
        && appointment.observations.is_empty());
    if has_clinical_fields {
        fields.push(sanitize_field(&appointment.diagnosis));
        fields.push(sanitize_field(&appointment.treatment));
        fields.push(sanitize_field(&appointment.observations));
    }

    fields.join(&FIELD_SEPARATOR.to_string())
}

/// Decode one line. A missing state loads as PENDING and missing clinical
/// fields load empty; anything else that does not parse is rejected.
pub fn decode_appointment(line: &str) -> Option<Appointment> {
    let fields: Vec<&str> = line.split(FIELD_SEPARATOR).map(str::trim).collect();

    let [id, patient_id, doctor_id, room_number, reason, scheduled_at, rest @ ..] = fields.as_slice() else {
        return None;
    };
    if id.is_empty() || patient_id.is_empty() || doctor_id.is_empty() || room_number.is_empty() {
        return None;
    }

    let scheduled_at = NaiveDateTime::parse_from_str(scheduled_at, TIMESTAMP_FORMAT).ok()?;
    let status = match rest.first() {
        Some(state) if !state.is_empty() => state.parse::<AppointmentStatus>().ok()?,
        _ => AppointmentStatus::Pending,
    };
    let clinical = |index: usize| rest.get(index).map(|value| value.to_string()).unwrap_or_default();

    Some(Appointment {
        id: id.to_string(),
        patient_id: patient_id.to_string(),
        doctor_id: doctor_id.to_string(),
        room_number: room_number.to_string(),
        reason: reason.to_string(),
        scheduled_at,
        status,
        diagnosis: clinical(1),
        treatment: clinical(2),
        observations: clinical(3),
    })
}

/// Next free sequence number: one past the highest id carrying the known prefix.
pub fn recover_next_sequence(appointments: &[Appointment]) -> Result<u64, AppointmentError> {
    let pattern = Regex::new(&format!(r"^{}(\d+)$", regex::escape(APPOINTMENT_ID_PREFIX)))
        .map_err(|e| AppointmentError::PersistenceError(format!("Invalid id pattern: {}", e)))?;

    let max_observed = appointments
        .iter()
        .filter_map(|appointment| pattern.captures(&appointment.id))
        .filter_map(|captures| captures.get(1))
        .filter_map(|digits| match digits.as_str().parse::<u64>() {
            Ok(sequence) => Some(sequence),
            Err(e) => {
                warn!("Ignoring unparseable id sequence {}: {}", digits.as_str(), e);
                None
            }
        })
        .max();

    Ok(max_observed.map_or(1, |max| max.saturating_add(1)))
}

/// Keep only records whose patient, doctor and room all resolve in the directory.
pub async fn resolve_references(
    stored: StoredAppointments,
    directory: &dyn Directory,
) -> Result<(Vec<Appointment>, LoadReport), AppointmentError> {
    let mut report = LoadReport {
        skipped_malformed: stored.skipped_malformed,
        ..Default::default()
    };
    // counter covers every id seen on disk, even skipped ones
    report.next_sequence = recover_next_sequence(&stored.appointments)?;
    let mut resolved = Vec::with_capacity(stored.appointments.len());

    for appointment in stored.appointments {
        let patient = directory.find_patient(&appointment.patient_id).await;
        let doctor = directory.find_doctor(&appointment.doctor_id).await;
        let room = directory.find_room(&appointment.room_number).await;

        if patient.is_none() || doctor.is_none() || room.is_none() {
            warn!(
                "Skipping appointment {}: unresolved references (patient {}: {}, doctor {}: {}, room {}: {})",
                appointment.id,
                appointment.patient_id,
                patient.is_some(),
                appointment.doctor_id,
                doctor.is_some(),
                appointment.room_number,
                room.is_some()
            );
            report.skipped_unresolved += 1;
            continue;
        }

        resolved.push(appointment);
    }

    report.loaded = resolved.len();
    Ok((resolved, report))
}

// ==============================================================================
// CSV FILE STORE
// ==============================================================================

pub struct CsvAppointmentStore {
    path: PathBuf,
}

impl CsvAppointmentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AppointmentStore for CsvAppointmentStore {
    async fn load(&self) -> Result<StoredAppointments, AppointmentError> {
        if !fs::try_exists(&self.path).await? {
            info!("No appointment file at {}, starting empty", self.path.display());
            return Ok(StoredAppointments::default());
        }

        let contents = fs::read(&self.path).await?;
        let mut stored = StoredAppointments::default();

        // decoded per line so one undecodable line costs only that record
        for (number, raw) in contents.split(|byte| *byte == b'\n').enumerate() {
            let line = match std::str::from_utf8(raw) {
                Ok(line) => line,
                Err(e) => {
                    warn!("Skipping appointment at line {}: not valid UTF-8 ({})", number + 1, e);
                    stored.skipped_malformed += 1;
                    continue;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match decode_appointment(line) {
                Some(appointment) => stored.appointments.push(appointment),
                None => {
                    warn!("Skipping malformed appointment at line {}: {}", number + 1, line);
                    stored.skipped_malformed += 1;
                }
            }
        }

        debug!(
            "Read {} appointments from {}",
            stored.appointments.len(),
            self.path.display()
        );
        Ok(stored)
    }

    async fn save_all(&self, appointments: &[Appointment]) -> Result<(), AppointmentError> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let mut contents = appointments
            .iter()
            .map(encode_appointment)
            .collect::<Vec<_>>()
            .join("\n");
        if !contents.is_empty() {
            contents.push('\n');
        }

        let tmp = self.path.with_extension("csv.tmp");
        fs::write(&tmp, contents).await?;
        fs::rename(&tmp, &self.path).await?;

        debug!("Saved {} appointments to {}", appointments.len(), self.path.display());
        Ok(())
    }
}

// ==============================================================================
// IN-MEMORY STORE
// ==============================================================================

/// Store without a backing file, for tests and ephemeral runs.
#[derive(Default)]
pub struct InMemoryAppointmentStore {
    appointments: Mutex<Vec<Appointment>>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_appointments(appointments: Vec<Appointment>) -> Self {
        Self {
            appointments: Mutex::new(appointments),
        }
    }

    pub async fn saved(&self) -> Vec<Appointment> {
        self.appointments.lock().await.clone()
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn load(&self) -> Result<StoredAppointments, AppointmentError> {
        Ok(StoredAppointments {
            appointments: self.appointments.lock().await.clone(),
            skipped_malformed: 0,
        })
    }

    async fn save_all(&self, appointments: &[Appointment]) -> Result<(), AppointmentError> {
        *self.appointments.lock().await = appointments.to_vec();
        Ok(())
    }
}
