// libs/directory-cell/src/models.rs
use serde::{Deserialize, Serialize};
use std::fmt;

// ==============================================================================
// PEOPLE
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: String,
    /// Free-text birth date as captured at the front desk, e.g. `15/03/1985`.
    pub birth_date: String,
    pub clinical_record: String,
    pub blood_type: String,
    pub sex: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: String,
    pub specialty: String,
    /// Default room number, if one has been assigned.
    pub assigned_room: Option<String>,
}

impl Doctor {
    pub fn specialty_matches(&self, specialty: &str) -> bool {
        self.specialty.trim().to_lowercase() == specialty.trim().to_lowercase()
    }

    pub fn has_assigned_room(&self) -> bool {
        self.assigned_room
            .as_deref()
            .is_some_and(|room| !room.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receptionist {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: String,
    pub shift: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Patient,
    Doctor,
    Receptionist,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Patient => write!(f, "patient"),
            Role::Doctor => write!(f, "doctor"),
            Role::Receptionist => write!(f, "receptionist"),
        }
    }
}

/// Anyone the directory knows by id, discriminated by role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum User {
    Patient(Patient),
    Doctor(Doctor),
    Receptionist(Receptionist),
}

impl User {
    pub fn id(&self) -> &str {
        match self {
            User::Patient(patient) => &patient.id,
            User::Doctor(doctor) => &doctor.id,
            User::Receptionist(receptionist) => &receptionist.id,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            User::Patient(_) => Role::Patient,
            User::Doctor(_) => Role::Doctor,
            User::Receptionist(_) => Role::Receptionist,
        }
    }

    pub fn full_name(&self) -> String {
        let (first, last) = match self {
            User::Patient(p) => (&p.first_name, &p.last_name),
            User::Doctor(d) => (&d.first_name, &d.last_name),
            User::Receptionist(r) => (&r.first_name, &r.last_name),
        };
        format!("{} {}", first, last)
    }

    pub fn as_patient(&self) -> Option<&Patient> {
        match self {
            User::Patient(patient) => Some(patient),
            _ => None,
        }
    }

    pub fn as_doctor(&self) -> Option<&Doctor> {
        match self {
            User::Doctor(doctor) => Some(doctor),
            _ => None,
        }
    }

    pub fn into_patient(self) -> Option<Patient> {
        match self {
            User::Patient(patient) => Some(patient),
            _ => None,
        }
    }

    pub fn into_doctor(self) -> Option<Doctor> {
        match self {
            User::Doctor(doctor) => Some(doctor),
            _ => None,
        }
    }
}

// ==============================================================================
// ROOMS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub number: String,
    pub available: bool,
    pub location: String,
}

// ==============================================================================
// SNAPSHOT
// ==============================================================================

/// Full contents of a directory, in enumeration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectorySnapshot {
    pub users: Vec<User>,
    pub rooms: Vec<Room>,
}

impl DirectorySnapshot {
    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.rooms.is_empty()
    }

    pub fn doctors(&self) -> impl Iterator<Item = &Doctor> {
        self.users.iter().filter_map(User::as_doctor)
    }
}
