pub mod booking;
pub mod conflict;
pub mod lifecycle;
pub mod persistence;
pub mod referral;
pub mod registry;

pub use booking::SchedulingEngine;
pub use conflict::ConflictDetectionService;
pub use lifecycle::AppointmentLifecycleService;
pub use persistence::{AppointmentStore, CsvAppointmentStore, InMemoryAppointmentStore};
pub use referral::{ReferralSearch, REFERRAL_HORIZON_DAYS};
pub use registry::AppointmentRegistry;
