// libs/appointment-cell/src/services/referral.rs
use chrono::{Duration, NaiveDateTime, Timelike};
use tracing::debug;

use directory_cell::{Doctor, Room};

use crate::models::slot_duration;
use crate::services::conflict::ConflictDetectionService;
use crate::services::registry::AppointmentRegistry;

/// How far ahead of the first candidate slot the search may go.
pub const REFERRAL_HORIZON_DAYS: i64 = 30;

/// A doctor, a room and a start time that are free together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferralSlot {
    pub doctor: Doctor,
    pub room: Room,
    pub scheduled_at: NaiveDateTime,
}

/// Greedy first-fit search for a referral appointment.
///
/// Only the first specialist in directory order is tried. At each half-hour
/// step the first free room in directory order is taken; there is no attempt
/// to balance rooms or fall back to another specialist.
pub struct ReferralSearch<'a> {
    conflicts: &'a ConflictDetectionService,
    registry: &'a AppointmentRegistry,
}

impl<'a> ReferralSearch<'a> {
    pub fn new(conflicts: &'a ConflictDetectionService, registry: &'a AppointmentRegistry) -> Self {
        Self { conflicts, registry }
    }

    pub fn find_slot(&self, doctor: &Doctor, rooms: &[Room], now: NaiveDateTime) -> Option<ReferralSlot> {
        let start = referral_search_start(now);
        let limit = start + Duration::days(REFERRAL_HORIZON_DAYS);
        debug!(
            "Searching referral slot with doctor {} from {} to {}",
            doctor.id, start, limit
        );

        let mut candidate = start;
        while candidate <= limit {
            if self.doctor_is_free(&doctor.id, candidate) {
                if let Some(room) = self.first_free_room(rooms, candidate) {
                    return Some(ReferralSlot {
                        doctor: doctor.clone(),
                        room: room.clone(),
                        scheduled_at: candidate,
                    });
                }
            }
            candidate += slot_duration();
        }

        debug!("No referral slot with doctor {} before {}", doctor.id, limit);
        None
    }

    fn doctor_is_free(&self, doctor_id: &str, at: NaiveDateTime) -> bool {
        let agenda = self
            .registry
            .agenda_ids(doctor_id)
            .iter()
            .filter_map(|id| self.registry.get(id));
        self.conflicts.is_doctor_free(agenda, doctor_id, at)
    }

    fn first_free_room<'r>(&self, rooms: &'r [Room], at: NaiveDateTime) -> Option<&'r Room> {
        rooms
            .iter()
            .find(|room| self.conflicts.is_room_free(self.registry.all(), &room.number, at))
    }
}

/// One hour from now, floored to the half hour, seconds cleared.
pub fn referral_search_start(now: NaiveDateTime) -> NaiveDateTime {
    let proposal = now + Duration::hours(1);
    let minute = if proposal.minute() < 30 { 0 } else { 30 };
    proposal
        .with_minute(minute)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(proposal)
}
