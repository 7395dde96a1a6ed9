// libs/appointment-cell/src/services/conflict.rs
use chrono::NaiveDateTime;
use tracing::{debug, warn};

use crate::models::{slot_duration, Appointment, AppointmentStatus, ConflictCheckResponse};

/// The resource a slot check is made against.
#[derive(Debug, Clone, Copy)]
pub enum SlotResource<'a> {
    Doctor(&'a str),
    Room(&'a str),
}

impl SlotResource<'_> {
    fn holds(&self, appointment: &Appointment) -> bool {
        match self {
            SlotResource::Doctor(id) => appointment.doctor_id == *id,
            SlotResource::Room(number) => appointment.room_number == *number,
        }
    }
}

/// Decides whether a doctor or room is free for a 30 minute slot.
///
/// Stateless: it scans whatever appointments it is handed, so the caller
/// must hold the registry lock for the check to stay valid until insert.
pub struct ConflictDetectionService;

impl Default for ConflictDetectionService {
    fn default() -> Self {
        Self::new()
    }
}

impl ConflictDetectionService {
    pub fn new() -> Self {
        Self
    }

    /// Check for conflicts for a doctor at a specific start time
    pub fn check_doctor_conflicts<'a, I>(
        &self,
        appointments: I,
        doctor_id: &str,
        start_time: NaiveDateTime,
        exclude_appointment_id: Option<&str>,
    ) -> ConflictCheckResponse
    where
        I: IntoIterator<Item = &'a Appointment>,
    {
        self.check_conflicts(appointments, SlotResource::Doctor(doctor_id), start_time, exclude_appointment_id)
    }

    /// Check for conflicts for a room at a specific start time
    pub fn check_room_conflicts<'a, I>(
        &self,
        appointments: I,
        room_number: &str,
        start_time: NaiveDateTime,
        exclude_appointment_id: Option<&str>,
    ) -> ConflictCheckResponse
    where
        I: IntoIterator<Item = &'a Appointment>,
    {
        self.check_conflicts(appointments, SlotResource::Room(room_number), start_time, exclude_appointment_id)
    }

    pub fn check_conflicts<'a, I>(
        &self,
        appointments: I,
        resource: SlotResource<'_>,
        start_time: NaiveDateTime,
        exclude_appointment_id: Option<&str>,
    ) -> ConflictCheckResponse
    where
        I: IntoIterator<Item = &'a Appointment>,
    {
        let end_time = start_time + slot_duration();
        debug!("Checking conflicts for {:?} from {} to {}", resource, start_time, end_time);

        let conflicting_appointments: Vec<Appointment> = appointments
            .into_iter()
            .filter(|appointment| resource.holds(appointment))
            .filter(|appointment| Some(appointment.id.as_str()) != exclude_appointment_id)
            .filter(|appointment| self.is_active_appointment(&appointment.status))
            .filter(|appointment| {
                self.appointments_overlap(
                    start_time,
                    end_time,
                    appointment.scheduled_at,
                    appointment.scheduled_end_time(),
                )
            })
            .cloned()
            .collect();

        let has_conflict = !conflicting_appointments.is_empty();
        if has_conflict {
            warn!(
                "Conflict detected for {:?} at {} - {} conflicting appointments",
                resource,
                start_time,
                conflicting_appointments.len()
            );
        }

        ConflictCheckResponse {
            has_conflict,
            conflicting_appointments,
        }
    }

    pub fn is_doctor_free<'a, I>(&self, appointments: I, doctor_id: &str, start_time: NaiveDateTime) -> bool
    where
        I: IntoIterator<Item = &'a Appointment>,
    {
        !self.check_doctor_conflicts(appointments, doctor_id, start_time, None).has_conflict
    }

    pub fn is_room_free<'a, I>(&self, appointments: I, room_number: &str, start_time: NaiveDateTime) -> bool
    where
        I: IntoIterator<Item = &'a Appointment>,
    {
        !self.check_room_conflicts(appointments, room_number, start_time, None).has_conflict
    }

    /// Half-open overlap: a slot ending exactly when another starts is not a conflict.
    pub fn appointments_overlap(
        &self,
        start1: NaiveDateTime,
        end1: NaiveDateTime,
        start2: NaiveDateTime,
        end2: NaiveDateTime,
    ) -> bool {
        start1 < end2 && end1 > start2
    }

    /// Cancelled appointments release their slot; every other state holds it.
    pub fn is_active_appointment(&self, status: &AppointmentStatus) -> bool {
        !matches!(status, AppointmentStatus::Cancelled)
    }
}
