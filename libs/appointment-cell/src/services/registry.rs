// libs/appointment-cell/src/services/registry.rs
use std::collections::HashMap;

use chrono::NaiveDateTime;
use tracing::debug;

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, APPOINTMENT_ID_DIGITS, APPOINTMENT_ID_PREFIX,
};

/// In-memory owner of every appointment.
///
/// Appointments are kept in insertion order and never removed. The per-doctor
/// agenda is an index of ids into the same collection, so it cannot drift from
/// the appointments themselves.
#[derive(Debug, Default)]
pub struct AppointmentRegistry {
    appointments: Vec<Appointment>,
    by_id: HashMap<String, usize>,
    agendas: HashMap<String, Vec<String>>,
    next_sequence: u64,
}

impl AppointmentRegistry {
    pub fn new() -> Self {
        Self {
            next_sequence: 1,
            ..Default::default()
        }
    }

    /// Rebuild a registry from loaded records and recover the id counter.
    pub fn restore(appointments: Vec<Appointment>, next_sequence: u64) -> Self {
        let mut registry = Self::new();
        for appointment in appointments {
            registry.insert(appointment);
        }
        registry.next_sequence = next_sequence.max(1);
        debug!(
            "Registry restored with {} appointments, next sequence {}",
            registry.appointments.len(),
            registry.next_sequence
        );
        registry
    }

    /// Allocate the next appointment id. Sequence numbers are never reused,
    /// so once the counter reaches `u64::MAX` no further ids are issued.
    pub fn next_id(&mut self) -> Result<String, AppointmentError> {
        let following = self.next_sequence.checked_add(1).ok_or_else(|| {
            AppointmentError::PersistenceError(format!(
                "Appointment id sequence exhausted at {}",
                self.next_sequence
            ))
        })?;
        let id = format_appointment_id(self.next_sequence);
        self.next_sequence = following;
        Ok(id)
    }

    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    pub fn insert(&mut self, appointment: Appointment) {
        if let Some(&index) = self.by_id.get(&appointment.id) {
            self.appointments[index] = appointment;
            return;
        }

        let index = self.appointments.len();
        self.by_id.insert(appointment.id.clone(), index);
        self.add_to_agenda(&appointment.doctor_id, &appointment.id);
        self.appointments.push(appointment);
    }

    /// Idempotent: an id already on the doctor's agenda is not added twice.
    pub fn add_to_agenda(&mut self, doctor_id: &str, appointment_id: &str) {
        let agenda = self.agendas.entry(doctor_id.to_string()).or_default();
        if !agenda.iter().any(|id| id == appointment_id) {
            agenda.push(appointment_id.to_string());
        }
    }

    pub fn get(&self, id: &str) -> Option<&Appointment> {
        self.by_id.get(id).map(|&index| &self.appointments[index])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Appointment> {
        match self.by_id.get(id) {
            Some(&index) => self.appointments.get_mut(index),
            None => None,
        }
    }

    pub fn all(&self) -> &[Appointment] {
        &self.appointments
    }

    pub fn len(&self) -> usize {
        self.appointments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.appointments.is_empty()
    }

    pub fn agenda_ids(&self, doctor_id: &str) -> &[String] {
        self.agendas.get(doctor_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Non-cancelled appointments on a doctor's agenda, earliest first.
    pub fn doctor_agenda(&self, doctor_id: &str) -> Vec<Appointment> {
        let mut agenda: Vec<Appointment> = self
            .agenda_ids(doctor_id)
            .iter()
            .filter_map(|id| self.get(id))
            .filter(|appointment| appointment.occupies_slot())
            .cloned()
            .collect();
        agenda.sort_by_key(|appointment| appointment.scheduled_at);
        agenda
    }

    pub fn patient_appointments(&self, patient_id: &str) -> Vec<Appointment> {
        let mut appointments: Vec<Appointment> = self
            .appointments
            .iter()
            .filter(|appointment| appointment.patient_id == patient_id && appointment.occupies_slot())
            .cloned()
            .collect();
        appointments.sort_by_key(|appointment| appointment.scheduled_at);
        appointments
    }

    /// Completed appointments of a patient, most recent first.
    pub fn clinical_history(&self, patient_id: &str) -> Vec<Appointment> {
        let mut history: Vec<Appointment> = self
            .appointments
            .iter()
            .filter(|appointment| {
                appointment.patient_id == patient_id && appointment.status == AppointmentStatus::Completed
            })
            .cloned()
            .collect();
        history.sort_by(|a, b| b.scheduled_at.cmp(&a.scheduled_at));
        history
    }

    /// Upcoming appointments still expected to use the room.
    pub fn room_schedule(&self, room_number: &str, now: NaiveDateTime) -> Vec<Appointment> {
        let mut schedule: Vec<Appointment> = self
            .appointments
            .iter()
            .filter(|appointment| {
                appointment.room_number == room_number
                    && !appointment.is_terminal()
                    && appointment.scheduled_at > now
            })
            .cloned()
            .collect();
        schedule.sort_by_key(|appointment| appointment.scheduled_at);
        schedule
    }
}

pub fn format_appointment_id(sequence: u64) -> String {
    format!("{}{:0width$}", APPOINTMENT_ID_PREFIX, sequence, width = APPOINTMENT_ID_DIGITS)
}
