// libs/appointment-cell/src/models.rs
use chrono::{Duration, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Every appointment occupies exactly this many minutes from its start.
pub const SLOT_MINUTES: i64 = 30;

/// Prefix of every generated appointment id; the rest is a zero-padded sequence.
pub const APPOINTMENT_ID_PREFIX: &str = "CITA-A";
pub const APPOINTMENT_ID_DIGITS: usize = 7;

pub fn slot_duration() -> Duration {
    Duration::minutes(SLOT_MINUTES)
}

/// Appointment times are kept to the minute, the resolution of the appointment file.
pub fn truncate_to_minute(at: NaiveDateTime) -> NaiveDateTime {
    at.with_second(0).and_then(|t| t.with_nanosecond(0)).unwrap_or(at)
}

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub room_number: String,
    pub reason: String,
    pub scheduled_at: NaiveDateTime,
    pub status: AppointmentStatus,
    pub diagnosis: String,
    pub treatment: String,
    pub observations: String,
}

impl Appointment {
    pub fn new(
        id: String,
        patient_id: String,
        doctor_id: String,
        room_number: String,
        reason: String,
        scheduled_at: NaiveDateTime,
    ) -> Self {
        Self {
            id,
            patient_id,
            doctor_id,
            room_number,
            reason,
            scheduled_at,
            status: AppointmentStatus::Pending,
            diagnosis: String::new(),
            treatment: String::new(),
            observations: String::new(),
        }
    }

    pub fn scheduled_end_time(&self) -> NaiveDateTime {
        self.scheduled_at + slot_duration()
    }

    /// Whether this appointment still holds its doctor and room.
    pub fn occupies_slot(&self) -> bool {
        self.status != AppointmentStatus::Cancelled
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    #[serde(rename = "EN_ATENCION", alias = "IN_PROGRESS")]
    InProgress,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Completed | AppointmentStatus::Cancelled)
    }

    /// The name written to the appointment file.
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "PENDING",
            AppointmentStatus::Confirmed => "CONFIRMED",
            AppointmentStatus::InProgress => "EN_ATENCION",
            AppointmentStatus::Completed => "COMPLETED",
            AppointmentStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = AppointmentError;

    /// Accepts the persisted names as well as the names older files used.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_uppercase().as_str() {
            "PENDING" | "PENDIENTE" => Ok(AppointmentStatus::Pending),
            "CONFIRMED" | "CONFIRMADA" => Ok(AppointmentStatus::Confirmed),
            "EN_ATENCION" | "IN_PROGRESS" => Ok(AppointmentStatus::InProgress),
            "COMPLETED" | "COMPLETADA" => Ok(AppointmentStatus::Completed),
            "CANCELLED" | "CANCELADA" => Ok(AppointmentStatus::Cancelled),
            other => Err(AppointmentError::ValidationError(format!(
                "Unknown appointment status: {}",
                other
            ))),
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub patient_id: String,
    pub doctor_id: String,
    pub room_number: String,
    pub reason: String,
    pub scheduled_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelAppointmentRequest {
    pub patient_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub new_start_time: NaiveDateTime,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttendAppointmentRequest {
    pub diagnosis: String,
    pub treatment: String,
    #[serde(default)]
    pub observations: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferPatientRequest {
    pub specialty: String,
    pub reason: String,
}

/// Result of a referral search. Only a missing source appointment is an error;
/// not finding a specialist or a slot are normal outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReferralOutcome {
    Referred {
        original_appointment_id: String,
        appointment: Appointment,
    },
    NoSpecialistAvailable {
        specialty: String,
    },
    NoSlotFound {
        specialty: String,
        doctor_id: String,
        horizon_days: i64,
    },
}

impl ReferralOutcome {
    pub fn message(&self) -> String {
        match self {
            ReferralOutcome::Referred { appointment, .. } => format!(
                "Referral appointment {} created for {}",
                appointment.id,
                appointment.scheduled_at.format("%d/%m/%Y %H:%M")
            ),
            ReferralOutcome::NoSpecialistAvailable { specialty } => {
                format!("No specialists available for {}", specialty)
            }
            ReferralOutcome::NoSlotFound { horizon_days, .. } => format!(
                "No slot with a specialist was found within the next {} days",
                horizon_days
            ),
        }
    }
}

// ==============================================================================
// CONFLICT DETECTION MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictCheckResponse {
    pub has_conflict: bool,
    pub conflicting_appointments: Vec<Appointment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub resource_id: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub available: bool,
}

// ==============================================================================
// PERSISTENCE MODELS
// ==============================================================================

/// Outcome of restoring the registry from storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    pub loaded: usize,
    pub skipped_malformed: usize,
    pub skipped_unresolved: usize,
    pub next_sequence: u64,
}

// ==============================================================================
// POLICY
// ==============================================================================

/// What booking does when the doctor has no default room yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomAssignmentPolicy {
    /// Record the booked room as the doctor's default after a successful booking.
    #[default]
    AssignWhenUnset,
    Never,
}

impl RoomAssignmentPolicy {
    pub fn from_flag(auto_assign: bool) -> Self {
        if auto_assign {
            RoomAssignmentPolicy::AssignWhenUnset
        } else {
            RoomAssignmentPolicy::Never
        }
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

/// The broad class of a failure, which decides how callers react to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Conflict,
    StateTransition,
    NotFound,
    Unauthorized,
    Persistence,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Patient not found: {0}")]
    PatientNotFound(String),

    #[error("Doctor not found: {0}")]
    DoctorNotFound(String),

    #[error("Room not found: {0}")]
    RoomNotFound(String),

    #[error("Invalid appointment time: {0}")]
    InvalidTime(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Doctor is not available at the requested time")]
    DoctorNotAvailable,

    #[error("Room is not available at the requested time")]
    RoomNotAvailable,

    #[error("Appointment cannot be modified in current status: {0}")]
    InvalidStatusTransition(AppointmentStatus),

    #[error("Appointment does not belong to patient {0}")]
    Unauthorized(String),

    #[error("Directory error: {0}")]
    DirectoryError(String),

    #[error("Persistence error: {0}")]
    PersistenceError(String),
}

impl AppointmentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppointmentError::InvalidTime(_) | AppointmentError::ValidationError(_) => ErrorKind::Validation,
            AppointmentError::DoctorNotAvailable | AppointmentError::RoomNotAvailable => ErrorKind::Conflict,
            AppointmentError::InvalidStatusTransition(_) => ErrorKind::StateTransition,
            AppointmentError::NotFound
            | AppointmentError::PatientNotFound(_)
            | AppointmentError::DoctorNotFound(_)
            | AppointmentError::RoomNotFound(_) => ErrorKind::NotFound,
            AppointmentError::Unauthorized(_) => ErrorKind::Unauthorized,
            AppointmentError::DirectoryError(_) | AppointmentError::PersistenceError(_) => ErrorKind::Persistence,
        }
    }
}

impl From<directory_cell::DirectoryError> for AppointmentError {
    fn from(err: directory_cell::DirectoryError) -> Self {
        AppointmentError::DirectoryError(err.to_string())
    }
}

impl From<std::io::Error> for AppointmentError {
    fn from(err: std::io::Error) -> Self {
        AppointmentError::PersistenceError(err.to_string())
    }
}
