// libs/directory-cell/src/services/storage.rs
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

use crate::error::DirectoryError;
use crate::models::{Doctor, DirectorySnapshot, Patient, Receptionist, Room, User};

pub const FIELD_SEPARATOR: char = ';';

const PATIENTS_FILE: &str = "patients.csv";
const DOCTORS_FILE: &str = "doctors.csv";
const RECEPTIONISTS_FILE: &str = "receptionists.csv";
const ROOMS_FILE: &str = "rooms.csv";

/// Replace characters that would break a `;`-separated line.
pub fn sanitize_field(value: &str) -> String {
    value
        .replace(FIELD_SEPARATOR, ",")
        .replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
}

/// Line-oriented files for the directory, one file per kind of entry.
#[derive(Debug, Clone)]
pub struct DirectoryStorage {
    dir: PathBuf,
}

impl DirectoryStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load every file that exists. Lines that do not parse are skipped.
    pub async fn load(&self) -> Result<DirectorySnapshot, DirectoryError> {
        let mut snapshot = DirectorySnapshot::default();

        for line in self.read_lines(PATIENTS_FILE).await? {
            if let Some(patient) = decode_patient(&line) {
                snapshot.users.push(User::Patient(patient));
            } else {
                warn!("Skipping malformed patient line: {}", line);
            }
        }
        for line in self.read_lines(DOCTORS_FILE).await? {
            if let Some(doctor) = decode_doctor(&line) {
                snapshot.users.push(User::Doctor(doctor));
            } else {
                warn!("Skipping malformed doctor line: {}", line);
            }
        }
        for line in self.read_lines(RECEPTIONISTS_FILE).await? {
            if let Some(receptionist) = decode_receptionist(&line) {
                snapshot.users.push(User::Receptionist(receptionist));
            } else {
                warn!("Skipping malformed receptionist line: {}", line);
            }
        }
        for line in self.read_lines(ROOMS_FILE).await? {
            if let Some(room) = decode_room(&line) {
                snapshot.rooms.push(room);
            } else {
                warn!("Skipping malformed room line: {}", line);
            }
        }

        debug!(
            "Loaded directory from {}: {} users, {} rooms",
            self.dir.display(),
            snapshot.users.len(),
            snapshot.rooms.len()
        );
        Ok(snapshot)
    }

    pub async fn save(&self, snapshot: &DirectorySnapshot) -> Result<(), DirectoryError> {
        fs::create_dir_all(&self.dir).await?;

        let mut patients = Vec::new();
        let mut doctors = Vec::new();
        let mut receptionists = Vec::new();
        for user in &snapshot.users {
            match user {
                User::Patient(patient) => patients.push(encode_patient(patient)),
                User::Doctor(doctor) => doctors.push(encode_doctor(doctor)),
                User::Receptionist(receptionist) => receptionists.push(encode_receptionist(receptionist)),
            }
        }
        let rooms: Vec<String> = snapshot.rooms.iter().map(encode_room).collect();

        self.write_lines(PATIENTS_FILE, &patients).await?;
        self.write_lines(DOCTORS_FILE, &doctors).await?;
        self.write_lines(RECEPTIONISTS_FILE, &receptionists).await?;
        self.write_lines(ROOMS_FILE, &rooms).await?;

        debug!("Saved directory to {}", self.dir.display());
        Ok(())
    }

    async fn read_lines(&self, file: &str) -> Result<Vec<String>, DirectoryError> {
        let path = self.dir.join(file);
        if !fs::try_exists(&path).await? {
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(&path).await?;
        Ok(contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn write_lines(&self, file: &str, lines: &[String]) -> Result<(), DirectoryError> {
        let path = self.dir.join(file);
        let tmp = self.dir.join(format!("{}.tmp", file));

        let mut contents = lines.join("\n");
        if !contents.is_empty() {
            contents.push('\n');
        }

        fs::write(&tmp, contents).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

// ==============================================================================
// LINE CODECS
// ==============================================================================

fn join(fields: &[&str]) -> String {
    fields
        .iter()
        .map(|field| sanitize_field(field))
        .collect::<Vec<_>>()
        .join(&FIELD_SEPARATOR.to_string())
}

fn split(line: &str) -> Vec<&str> {
    line.split(FIELD_SEPARATOR).map(str::trim).collect()
}

fn encode_patient(p: &Patient) -> String {
    join(&[
        p.id.as_str(), p.first_name.as_str(), p.last_name.as_str(), p.phone.as_str(),
        p.email.as_str(), p.birth_date.as_str(), p.clinical_record.as_str(),
        p.blood_type.as_str(), p.sex.as_str(),
    ])
}

fn decode_patient(line: &str) -> Option<Patient> {
    match split(line).as_slice() {
        [id, first_name, last_name, phone, email, birth_date, clinical_record, blood_type, sex, ..]
            if !id.is_empty() =>
        {
            Some(Patient {
                id: id.to_string(),
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                phone: phone.to_string(),
                email: email.to_string(),
                birth_date: birth_date.to_string(),
                clinical_record: clinical_record.to_string(),
                blood_type: blood_type.to_string(),
                sex: sex.to_string(),
            })
        }
        _ => None,
    }
}

fn encode_doctor(d: &Doctor) -> String {
    join(&[
        d.id.as_str(), d.first_name.as_str(), d.last_name.as_str(), d.phone.as_str(),
        d.email.as_str(), d.specialty.as_str(), d.assigned_room.as_deref().unwrap_or(""),
    ])
}

fn decode_doctor(line: &str) -> Option<Doctor> {
    let fields = split(line);
    match fields.as_slice() {
        [id, first_name, last_name, phone, email, specialty, rest @ ..] if !id.is_empty() => {
            // older files end at the specialty
            let assigned_room = rest
                .first()
                .filter(|room| !room.is_empty())
                .map(|room| room.to_string());

            Some(Doctor {
                id: id.to_string(),
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                phone: phone.to_string(),
                email: email.to_string(),
                specialty: specialty.to_string(),
                assigned_room,
            })
        }
        _ => None,
    }
}

fn encode_receptionist(r: &Receptionist) -> String {
    join(&[
        r.id.as_str(), r.first_name.as_str(), r.last_name.as_str(),
        r.phone.as_str(), r.email.as_str(), r.shift.as_str(),
    ])
}

fn decode_receptionist(line: &str) -> Option<Receptionist> {
    match split(line).as_slice() {
        [id, first_name, last_name, phone, email, shift, ..] if !id.is_empty() => Some(Receptionist {
            id: id.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            phone: phone.to_string(),
            email: email.to_string(),
            shift: shift.to_string(),
        }),
        _ => None,
    }
}

fn encode_room(r: &Room) -> String {
    join(&[r.number.as_str(), if r.available { "true" } else { "false" }, r.location.as_str()])
}

fn decode_room(line: &str) -> Option<Room> {
    match split(line).as_slice() {
        [number, available, location, ..] if !number.is_empty() => Some(Room {
            number: number.to_string(),
            available: available.parse().ok()?,
            location: location.to_string(),
        }),
        _ => None,
    }
}
