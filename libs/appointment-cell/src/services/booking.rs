// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::NaiveDateTime;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use directory_cell::{sanitize_field, Directory};
use shared_utils::Clock;

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, AttendAppointmentRequest, BookAppointmentRequest,
    LoadReport, ReferPatientRequest, ReferralOutcome, RoomAssignmentPolicy, truncate_to_minute,
};
use crate::services::conflict::ConflictDetectionService;
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::persistence::{resolve_references, AppointmentStore};
use crate::services::referral::{ReferralSearch, REFERRAL_HORIZON_DAYS};
use crate::services::registry::AppointmentRegistry;

/// Books, moves and closes appointments.
///
/// Every operation takes the registry lock once and holds it through the
/// availability check, the mutation and the write-through save, so two
/// requests can never both pass the check for the same slot.
pub struct SchedulingEngine {
    registry: Mutex<AppointmentRegistry>,
    directory: Arc<dyn Directory>,
    store: Arc<dyn AppointmentStore>,
    clock: Arc<dyn Clock>,
    room_policy: RoomAssignmentPolicy,
    conflict_service: ConflictDetectionService,
    lifecycle_service: AppointmentLifecycleService,
}

impl SchedulingEngine {
    pub fn new(directory: Arc<dyn Directory>, store: Arc<dyn AppointmentStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry: Mutex::new(AppointmentRegistry::new()),
            directory,
            store,
            clock,
            room_policy: RoomAssignmentPolicy::default(),
            conflict_service: ConflictDetectionService::new(),
            lifecycle_service: AppointmentLifecycleService::new(),
        }
    }

    pub fn with_room_policy(mut self, room_policy: RoomAssignmentPolicy) -> Self {
        self.room_policy = room_policy;
        self
    }

    pub fn directory(&self) -> Arc<dyn Directory> {
        Arc::clone(&self.directory)
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    /// Replace the registry with the stored appointments whose references
    /// still resolve, and recover the id counter.
    pub async fn load(&self) -> Result<LoadReport, AppointmentError> {
        let stored = self.store.load().await?;
        let (appointments, report) = resolve_references(stored, self.directory.as_ref()).await?;

        *self.registry.lock().await = AppointmentRegistry::restore(appointments, report.next_sequence);

        info!(
            "Loaded {} appointments ({} malformed, {} unresolved skipped), next sequence {}",
            report.loaded, report.skipped_malformed, report.skipped_unresolved, report.next_sequence
        );
        Ok(report)
    }

    // ==============================================================================
    // BOOKING
    // ==============================================================================

    pub async fn book_appointment(&self, request: BookAppointmentRequest) -> Result<Appointment, AppointmentError> {
        debug!(
            "Booking appointment for patient {} with doctor {} in room {} at {}",
            request.patient_id, request.doctor_id, request.room_number, request.scheduled_at
        );

        let scheduled_at = truncate_to_minute(request.scheduled_at);
        if scheduled_at < self.clock.now() {
            warn!("Rejected booking in the past: {}", scheduled_at);
            return Err(AppointmentError::InvalidTime(format!("{} is in the past", scheduled_at)));
        }

        let patient_id = required_id(&request.patient_id, "Patient id")?;
        let doctor_id = required_id(&request.doctor_id, "Doctor id")?;
        let room_number = required_id(&request.room_number, "Room number")?;

        if self.directory.find_patient(patient_id).await.is_none() {
            return Err(AppointmentError::PatientNotFound(patient_id.to_string()));
        }
        let doctor = self
            .directory
            .find_doctor(doctor_id)
            .await
            .ok_or_else(|| AppointmentError::DoctorNotFound(doctor_id.to_string()))?;
        if self.directory.find_room(room_number).await.is_none() {
            return Err(AppointmentError::RoomNotFound(room_number.to_string()));
        }

        let appointment = {
            let mut registry = self.registry.lock().await;
            self.ensure_slot_free(&registry, doctor_id, room_number, scheduled_at, None)?;

            let appointment = Appointment::new(
                registry.next_id()?,
                patient_id.to_string(),
                doctor_id.to_string(),
                room_number.to_string(),
                normalize_text(&request.reason),
                scheduled_at,
            );
            registry.insert(appointment.clone());
            self.persist(&registry).await;
            appointment
        };

        if self.room_policy == RoomAssignmentPolicy::AssignWhenUnset && !doctor.has_assigned_room() {
            match self.directory.assign_doctor_room(doctor_id, room_number).await {
                Ok(()) => info!("Room {} set as default for doctor {}", room_number, doctor_id),
                Err(e) => warn!("Failed to assign room {} to doctor {}: {}", room_number, doctor_id, e),
            }
        }

        info!(
            "Appointment {} booked for patient {} with doctor {} at {}",
            appointment.id, appointment.patient_id, appointment.doctor_id, appointment.scheduled_at
        );
        Ok(appointment)
    }

    // ==============================================================================
    // LIFECYCLE
    // ==============================================================================

    pub async fn confirm_appointment(&self, appointment_id: &str) -> Result<Appointment, AppointmentError> {
        self.transition(appointment_id, AppointmentStatus::Confirmed).await
    }

    /// Mark the visit as started, making the in-progress state visible until attend.
    pub async fn begin_attention(&self, appointment_id: &str) -> Result<Appointment, AppointmentError> {
        self.transition(appointment_id, AppointmentStatus::InProgress).await
    }

    pub async fn cancel_appointment(
        &self,
        appointment_id: &str,
        patient_id: &str,
    ) -> Result<Appointment, AppointmentError> {
        let mut registry = self.registry.lock().await;
        let appointment = registry.get_mut(appointment_id).ok_or(AppointmentError::NotFound)?;

        if appointment.patient_id != patient_id {
            warn!(
                "Patient {} attempted to cancel appointment {} owned by {}",
                patient_id, appointment_id, appointment.patient_id
            );
            return Err(AppointmentError::Unauthorized(patient_id.to_string()));
        }
        if !self.lifecycle_service.can_cancel(&appointment.status) {
            warn!("Cannot cancel appointment {} in status {}", appointment_id, appointment.status);
            return Err(AppointmentError::InvalidStatusTransition(appointment.status));
        }

        appointment.status = AppointmentStatus::Cancelled;
        let cancelled = appointment.clone();
        self.persist(&registry).await;

        info!("Appointment {} cancelled by patient {}", appointment_id, patient_id);
        Ok(cancelled)
    }

    pub async fn reschedule_appointment(
        &self,
        appointment_id: &str,
        new_start_time: NaiveDateTime,
    ) -> Result<Appointment, AppointmentError> {
        let mut registry = self.registry.lock().await;
        let current = registry.get(appointment_id).cloned().ok_or(AppointmentError::NotFound)?;

        self.lifecycle_service.can_reschedule(&current.status)?;
        let new_start_time = truncate_to_minute(new_start_time);
        if new_start_time < self.clock.now() {
            return Err(AppointmentError::InvalidTime(format!("{} is in the past", new_start_time)));
        }
        self.ensure_slot_free(
            &registry,
            &current.doctor_id,
            &current.room_number,
            new_start_time,
            Some(appointment_id),
        )?;

        let appointment = registry.get_mut(appointment_id).ok_or(AppointmentError::NotFound)?;
        appointment.scheduled_at = new_start_time;
        let rescheduled = appointment.clone();
        self.persist(&registry).await;

        info!(
            "Appointment {} rescheduled from {} to {}",
            appointment_id, current.scheduled_at, new_start_time
        );
        Ok(rescheduled)
    }

    /// Start and finish the visit in one step, recording the clinical notes.
    pub async fn attend_appointment(
        &self,
        appointment_id: &str,
        request: AttendAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let mut registry = self.registry.lock().await;
        let appointment = registry.get_mut(appointment_id).ok_or(AppointmentError::NotFound)?;

        self.lifecycle_service
            .validate_status_transition(&appointment.status, &AppointmentStatus::Completed)?;

        if appointment.status != AppointmentStatus::InProgress {
            debug!("Appointment {} goes through attention and completion at once", appointment_id);
        }
        appointment.diagnosis = normalize_text(&request.diagnosis);
        appointment.treatment = normalize_text(&request.treatment);
        appointment.observations = normalize_text(&request.observations);
        appointment.status = AppointmentStatus::Completed;

        let attended = appointment.clone();
        registry.add_to_agenda(&attended.doctor_id, &attended.id);
        self.persist(&registry).await;

        info!("Appointment {} attended by doctor {}", attended.id, attended.doctor_id);
        Ok(attended)
    }

    // ==============================================================================
    // REFERRAL
    // ==============================================================================

    /// Close an appointment and open a new one with the first specialist of
    /// the requested specialty, at the earliest slot where they and a room
    /// are both free.
    pub async fn refer_patient(
        &self,
        appointment_id: &str,
        request: ReferPatientRequest,
    ) -> Result<ReferralOutcome, AppointmentError> {
        let mut registry = self.registry.lock().await;
        let source = registry.get(appointment_id).cloned().ok_or(AppointmentError::NotFound)?;

        if source.is_terminal() {
            warn!("Cannot refer from appointment {} in status {}", appointment_id, source.status);
            return Err(AppointmentError::InvalidStatusTransition(source.status));
        }

        let specialist = self
            .directory
            .all_doctors()
            .await
            .into_iter()
            .find(|doctor| doctor.specialty_matches(&request.specialty));
        let Some(specialist) = specialist else {
            info!("No specialists available for {}", request.specialty);
            return Ok(ReferralOutcome::NoSpecialistAvailable {
                specialty: request.specialty,
            });
        };

        let rooms = self.directory.all_rooms().await;
        let slot = ReferralSearch::new(&self.conflict_service, &registry).find_slot(
            &specialist,
            &rooms,
            self.clock.now(),
        );
        let Some(slot) = slot else {
            info!(
                "No referral slot for appointment {} with doctor {} within {} days",
                appointment_id, specialist.id, REFERRAL_HORIZON_DAYS
            );
            return Ok(ReferralOutcome::NoSlotFound {
                specialty: request.specialty,
                doctor_id: specialist.id,
                horizon_days: REFERRAL_HORIZON_DAYS,
            });
        };

        let referral = Appointment::new(
            registry.next_id()?,
            source.patient_id.clone(),
            slot.doctor.id.clone(),
            slot.room.number.clone(),
            normalize_text(&request.reason),
            slot.scheduled_at,
        );
        registry.insert(referral.clone());
        if let Some(original) = registry.get_mut(appointment_id) {
            original.status = AppointmentStatus::Completed;
        }
        self.persist(&registry).await;

        info!(
            "Appointment {} referred to doctor {} as {} at {}",
            appointment_id, referral.doctor_id, referral.id, referral.scheduled_at
        );
        Ok(ReferralOutcome::Referred {
            original_appointment_id: source.id,
            appointment: referral,
        })
    }

    // ==============================================================================
    // QUERIES
    // ==============================================================================

    pub async fn get_appointment(&self, appointment_id: &str) -> Result<Appointment, AppointmentError> {
        self.registry
            .lock()
            .await
            .get(appointment_id)
            .cloned()
            .ok_or(AppointmentError::NotFound)
    }

    pub async fn all_appointments(&self) -> Vec<Appointment> {
        self.registry.lock().await.all().to_vec()
    }

    pub async fn patient_appointments(&self, patient_id: &str) -> Vec<Appointment> {
        self.registry.lock().await.patient_appointments(patient_id)
    }

    pub async fn clinical_history(&self, patient_id: &str) -> Vec<Appointment> {
        self.registry.lock().await.clinical_history(patient_id)
    }

    pub async fn doctor_agenda(&self, doctor_id: &str) -> Vec<Appointment> {
        self.registry.lock().await.doctor_agenda(doctor_id)
    }

    pub async fn room_schedule(&self, room_number: &str) -> Vec<Appointment> {
        let now = self.clock.now();
        self.registry.lock().await.room_schedule(room_number, now)
    }

    /// False when the doctor is unknown.
    pub async fn is_doctor_available(&self, doctor_id: &str, at: NaiveDateTime) -> bool {
        if self.directory.find_doctor(doctor_id).await.is_none() {
            return false;
        }
        let registry = self.registry.lock().await;
        self.conflict_service.is_doctor_free(registry.all(), doctor_id, at)
    }

    /// False when the room is unknown.
    pub async fn is_room_available(&self, room_number: &str, at: NaiveDateTime) -> bool {
        if self.directory.find_room(room_number).await.is_none() {
            return false;
        }
        let registry = self.registry.lock().await;
        self.conflict_service.is_room_free(registry.all(), room_number, at)
    }

    // ==============================================================================
    // HELPERS
    // ==============================================================================

    async fn transition(
        &self,
        appointment_id: &str,
        new_status: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        let mut registry = self.registry.lock().await;
        let appointment = registry.get_mut(appointment_id).ok_or(AppointmentError::NotFound)?;

        self.lifecycle_service
            .validate_status_transition(&appointment.status, &new_status)?;
        let previous = appointment.status;
        appointment.status = new_status;
        let updated = appointment.clone();
        self.persist(&registry).await;

        info!("Appointment {} moved from {} to {}", appointment_id, previous, new_status);
        Ok(updated)
    }

    fn ensure_slot_free(
        &self,
        registry: &AppointmentRegistry,
        doctor_id: &str,
        room_number: &str,
        start_time: NaiveDateTime,
        exclude_appointment_id: Option<&str>,
    ) -> Result<(), AppointmentError> {
        let doctor_check =
            self.conflict_service
                .check_doctor_conflicts(registry.all(), doctor_id, start_time, exclude_appointment_id);
        if doctor_check.has_conflict {
            return Err(AppointmentError::DoctorNotAvailable);
        }

        let room_check =
            self.conflict_service
                .check_room_conflicts(registry.all(), room_number, start_time, exclude_appointment_id);
        if room_check.has_conflict {
            return Err(AppointmentError::RoomNotAvailable);
        }

        Ok(())
    }

    /// Write-through after a mutation. A failed save is logged; the in-memory
    /// state stays authoritative and the next save rewrites the whole file.
    async fn persist(&self, registry: &AppointmentRegistry) {
        if let Err(e) = self.store.save_all(registry.all()).await {
            error!("Failed to persist {} appointments: {}", registry.len(), e);
        }
    }
}

fn required_id<'a>(value: &'a str, field: &str) -> Result<&'a str, AppointmentError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppointmentError::ValidationError(format!("{} cannot be empty", field)));
    }
    Ok(value)
}

fn normalize_text(value: &str) -> String {
    sanitize_field(value.trim()).trim().to_string()
}
