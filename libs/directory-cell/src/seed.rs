// libs/directory-cell/src/seed.rs
use crate::models::{Doctor, DirectorySnapshot, Patient, Receptionist, Room, User};

/// The sample clinic loaded on a fresh install.
pub fn sample_clinic() -> DirectorySnapshot {
    let rooms = vec![
        room("1", "North wing, floor 2"),
        room("2", "South wing, floor 1"),
        room("3", "South wing, floor 2"),
        room("4", "North wing, floor 1"),
        room("5", "South wing, floor 2"),
    ];

    let mut users = vec![User::Receptionist(Receptionist {
        id: "R123456".to_string(),
        first_name: "Gustavo".to_string(),
        last_name: "Olivos".to_string(),
        phone: "3046659511".to_string(),
        email: "golivos@clinic.example".to_string(),
        shift: "day".to_string(),
    })];

    users.extend(
        [
            ("M001", "Carlos", "Ramirez", "555-0101", "General Medicine"),
            ("M002", "Ana", "Martinez", "555-0102", "Cardiology"),
            ("M003", "Luis", "Gonzalez", "555-0103", "Pediatrics"),
            ("M004", "Jose", "Mosquera", "555-0155", "Neurology"),
        ]
        .into_iter()
        .map(|(id, first, last, phone, specialty)| {
            User::Doctor(Doctor {
                id: id.to_string(),
                first_name: first.to_string(),
                last_name: last.to_string(),
                phone: phone.to_string(),
                email: format!("{}{}@clinic.example", &first[..1], last).to_lowercase(),
                specialty: specialty.to_string(),
                assigned_room: None,
            })
        }),
    );

    users.extend(
        [
            ("P001", "Maria", "Lopez", "777-1001", "HC-001", "15/03/1985", "O+", "Female"),
            ("P002", "Juan", "Plata", "777-1002", "HC-002", "22/07/1990", "A+", "Male"),
            ("P003", "Camilo", "Medina", "777-1003", "HC-003", "05/01/2005", "B-", "Male"),
            ("P004", "Laura", "Fernandez", "777-1004", "HC-004", "10/11/1978", "B+", "Female"),
        ]
        .into_iter()
        .map(|(id, first, last, phone, record, birth, blood, sex)| {
            User::Patient(Patient {
                id: id.to_string(),
                first_name: first.to_string(),
                last_name: last.to_string(),
                phone: phone.to_string(),
                email: format!("{}{}@mail.example", &first[..1], last).to_lowercase(),
                birth_date: birth.to_string(),
                clinical_record: record.to_string(),
                blood_type: blood.to_string(),
                sex: sex.to_string(),
            })
        }),
    );

    DirectorySnapshot { users, rooms }
}

fn room(number: &str, location: &str) -> Room {
    Room {
        number: number.to_string(),
        available: true,
        location: location.to_string(),
    }
}
