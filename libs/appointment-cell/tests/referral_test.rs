mod common;

use assert_matches::assert_matches;
use chrono::Duration;

use appointment_cell::services::registry::format_appointment_id;
use appointment_cell::{
    Appointment, AppointmentError, AppointmentStatus, InMemoryAppointmentStore, ReferPatientRequest,
    ReferralOutcome, REFERRAL_HORIZON_DAYS,
};
use directory_cell::User;
use shared_utils::test_utils::datetime;

use common::{booking, clinic, doctor, engine_with, test_engine};

fn to(specialty: &str) -> ReferPatientRequest {
    ReferPatientRequest {
        specialty: specialty.to_string(),
        reason: "Irregular heartbeat".to_string(),
    }
}

#[tokio::test]
async fn test_referral_books_first_free_slot_and_completes_original() {
    let t = test_engine();
    let source = t
        .engine
        .book_appointment(booking("P1", "D1", "R1", datetime(2025, 12, 1, 10, 0)))
        .await
        .unwrap();

    // now is 08:00, so the search starts at 09:00
    let outcome = t.engine.refer_patient(&source.id, to("CARDIOLOGY")).await.unwrap();
    let ReferralOutcome::Referred { original_appointment_id, appointment } = outcome else {
        panic!("expected a referral");
    };

    assert_eq!(original_appointment_id, source.id);
    assert_eq!(appointment.patient_id, "P1");
    assert_eq!(appointment.doctor_id, "D2");
    assert_eq!(appointment.room_number, "R1");
    assert_eq!(appointment.scheduled_at, datetime(2025, 11, 30, 9, 0));
    assert_eq!(appointment.status, AppointmentStatus::Pending);
    assert_eq!(appointment.reason, "Irregular heartbeat");

    let original = t.engine.get_appointment(&source.id).await.unwrap();
    assert_eq!(original.status, AppointmentStatus::Completed);
    assert_eq!(t.engine.doctor_agenda("D2").await, vec![appointment]);
}

#[tokio::test]
async fn test_referral_skips_busy_doctor_and_rooms() {
    let t = test_engine();
    let source = t
        .engine
        .book_appointment(booking("P1", "D1", "R1", datetime(2025, 11, 30, 9, 0)))
        .await
        .unwrap();
    // specialist busy at 09:00, R1 taken at 09:30
    t.engine
        .book_appointment(booking("P2", "D2", "R2", datetime(2025, 11, 30, 9, 0)))
        .await
        .unwrap();
    t.engine
        .book_appointment(booking("P2", "D1", "R1", datetime(2025, 11, 30, 9, 30)))
        .await
        .unwrap();

    let outcome = t.engine.refer_patient(&source.id, to("cardiology")).await.unwrap();
    assert_matches!(
        outcome,
        ReferralOutcome::Referred { ref appointment, .. }
            if appointment.scheduled_at == datetime(2025, 11, 30, 9, 30) && appointment.room_number == "R2"
    );
}

#[tokio::test]
async fn test_search_start_is_floored_to_the_half_hour() {
    let t = test_engine();
    t.clock.set(datetime(2025, 11, 30, 8, 47) + Duration::seconds(31));
    let source = t
        .engine
        .book_appointment(booking("P1", "D1", "R1", datetime(2025, 12, 1, 10, 0)))
        .await
        .unwrap();

    let outcome = t.engine.refer_patient(&source.id, to("Cardiology")).await.unwrap();
    assert_matches!(
        outcome,
        ReferralOutcome::Referred { ref appointment, .. }
            if appointment.scheduled_at == datetime(2025, 11, 30, 9, 30)
    );
}

#[tokio::test]
async fn test_no_specialist_leaves_original_untouched() {
    let t = test_engine();
    let source = t
        .engine
        .book_appointment(booking("P1", "D1", "R1", datetime(2025, 12, 1, 10, 0)))
        .await
        .unwrap();

    let outcome = t.engine.refer_patient(&source.id, to("Dermatology")).await.unwrap();
    assert_eq!(
        outcome,
        ReferralOutcome::NoSpecialistAvailable {
            specialty: "Dermatology".to_string()
        }
    );
    assert_eq!(t.engine.get_appointment(&source.id).await.unwrap(), source);
    assert_eq!(t.engine.all_appointments().await.len(), 1);
}

#[tokio::test]
async fn test_fully_booked_specialist_yields_no_slot() {
    // D2 holds every half hour from 09:00 today through the end of the horizon
    let search_start = datetime(2025, 11, 30, 9, 0);
    let steps = REFERRAL_HORIZON_DAYS * 48 + 1;
    let mut stored: Vec<Appointment> = (0..steps)
        .map(|step| {
            Appointment::new(
                format_appointment_id(step as u64 + 1),
                "P2".to_string(),
                "D2".to_string(),
                "R2".to_string(),
                "Follow-up".to_string(),
                search_start + Duration::minutes(30 * step),
            )
        })
        .collect();
    let source = Appointment::new(
        format_appointment_id(steps as u64 + 1),
        "P1".to_string(),
        "D1".to_string(),
        "R1".to_string(),
        "Chest pain".to_string(),
        datetime(2025, 12, 1, 10, 0),
    );
    stored.push(source.clone());

    let t = engine_with(clinic(), InMemoryAppointmentStore::with_appointments(stored));
    let report = t.engine.load().await.unwrap();
    assert_eq!(report.loaded, steps as usize + 1);

    let outcome = t.engine.refer_patient(&source.id, to("Cardiology")).await.unwrap();
    assert_eq!(
        outcome,
        ReferralOutcome::NoSlotFound {
            specialty: "Cardiology".to_string(),
            doctor_id: "D2".to_string(),
            horizon_days: REFERRAL_HORIZON_DAYS,
        }
    );
    assert_eq!(t.engine.get_appointment(&source.id).await.unwrap(), source);
    assert_eq!(t.engine.all_appointments().await.len(), steps as usize + 1);
}

#[tokio::test]
async fn test_only_first_matching_specialist_is_tried() {
    // D2 is fully booked for the horizon, D3 is free but never considered
    let mut snapshot = clinic();
    snapshot.users.push(User::Doctor(doctor("D3", "cardiology")));

    let search_start = datetime(2025, 11, 30, 9, 0);
    let steps = REFERRAL_HORIZON_DAYS * 48 + 1;
    let mut stored: Vec<Appointment> = (0..steps)
        .map(|step| {
            Appointment::new(
                format_appointment_id(step as u64 + 1),
                "P2".to_string(),
                "D2".to_string(),
                "R2".to_string(),
                "Follow-up".to_string(),
                search_start + Duration::minutes(30 * step),
            )
        })
        .collect();
    let source = Appointment::new(
        "CITA-A5000000".to_string(),
        "P1".to_string(),
        "D1".to_string(),
        "R1".to_string(),
        "Chest pain".to_string(),
        datetime(2025, 12, 1, 10, 0),
    );
    stored.push(source.clone());

    let t = engine_with(snapshot, InMemoryAppointmentStore::with_appointments(stored));
    t.engine.load().await.unwrap();

    let outcome = t.engine.refer_patient(&source.id, to("Cardiology")).await.unwrap();
    assert_matches!(outcome, ReferralOutcome::NoSlotFound { ref doctor_id, .. } if doctor_id == "D2");
}

#[tokio::test]
async fn test_referral_needs_an_open_source_appointment() {
    let t = test_engine();
    assert_matches!(
        t.engine.refer_patient("CITA-A0000404", to("Cardiology")).await,
        Err(AppointmentError::NotFound)
    );

    let source = t
        .engine
        .book_appointment(booking("P1", "D1", "R1", datetime(2025, 12, 1, 10, 0)))
        .await
        .unwrap();
    t.engine.cancel_appointment(&source.id, "P1").await.unwrap();

    assert_matches!(
        t.engine.refer_patient(&source.id, to("Cardiology")).await,
        Err(AppointmentError::InvalidStatusTransition(AppointmentStatus::Cancelled))
    );
    assert_eq!(t.engine.all_appointments().await.len(), 1);
}

#[tokio::test]
async fn test_referral_ids_continue_the_sequence() {
    let t = test_engine();
    let source = t
        .engine
        .book_appointment(booking("P1", "D1", "R1", datetime(2025, 12, 1, 10, 0)))
        .await
        .unwrap();

    let outcome = t.engine.refer_patient(&source.id, to("Cardiology")).await.unwrap();
    assert_matches!(outcome, ReferralOutcome::Referred { ref appointment, .. } if appointment.id == "CITA-A0000002");
}
