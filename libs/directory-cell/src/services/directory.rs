// libs/directory-cell/src/services/directory.rs
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::DirectoryError;
use crate::models::{Doctor, DirectorySnapshot, Patient, Receptionist, Room, User};
use crate::services::storage::DirectoryStorage;

/// Lookup and enumeration of the people and rooms the scheduler refers to.
///
/// Enumeration order is stable: it is the order in which entries were
/// registered (or loaded), and callers such as the referral search rely on it
/// for deterministic first-fit choices.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn find_user(&self, id: &str) -> Option<User>;

    async fn find_room(&self, number: &str) -> Option<Room>;

    async fn all_doctors(&self) -> Vec<Doctor>;

    async fn all_rooms(&self) -> Vec<Room>;

    /// Set a doctor's default room. Both must already exist.
    async fn assign_doctor_room(&self, doctor_id: &str, room_number: &str) -> Result<(), DirectoryError>;

    /// Write-through trigger after a mutation of directory-owned data.
    async fn save(&self) -> Result<(), DirectoryError>;

    async fn find_patient(&self, id: &str) -> Option<Patient> {
        self.find_user(id).await.and_then(User::into_patient)
    }

    async fn find_doctor(&self, id: &str) -> Option<Doctor> {
        self.find_user(id).await.and_then(User::into_doctor)
    }
}

pub struct InMemoryDirectory {
    data: RwLock<DirectorySnapshot>,
    storage: Option<DirectoryStorage>,
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::from_snapshot(DirectorySnapshot::default())
    }

    pub fn from_snapshot(snapshot: DirectorySnapshot) -> Self {
        Self {
            data: RwLock::new(snapshot),
            storage: None,
        }
    }

    /// Load a directory from disk and keep writing through to it.
    pub async fn open(storage: DirectoryStorage) -> Result<Self, DirectoryError> {
        let snapshot = storage.load().await?;
        info!(
            "Directory opened with {} users and {} rooms",
            snapshot.users.len(),
            snapshot.rooms.len()
        );

        Ok(Self {
            data: RwLock::new(snapshot),
            storage: Some(storage),
        })
    }

    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }

    pub async fn snapshot(&self) -> DirectorySnapshot {
        self.data.read().await.clone()
    }

    pub async fn register_patient(&self, patient: Patient) -> Result<(), DirectoryError> {
        self.register_user(User::Patient(patient)).await
    }

    pub async fn register_doctor(&self, doctor: Doctor) -> Result<(), DirectoryError> {
        self.register_user(User::Doctor(doctor)).await
    }

    pub async fn register_receptionist(&self, receptionist: Receptionist) -> Result<(), DirectoryError> {
        self.register_user(User::Receptionist(receptionist)).await
    }

    pub async fn register_room(&self, room: Room) -> Result<(), DirectoryError> {
        if room.number.trim().is_empty() {
            return Err(DirectoryError::ValidationError("Room number cannot be empty".to_string()));
        }

        {
            let mut data = self.data.write().await;
            if data.rooms.iter().any(|existing| existing.number == room.number) {
                warn!("Rejected duplicate room {}", room.number);
                return Err(DirectoryError::DuplicateRoom(room.number));
            }
            debug!("Registering room {}", room.number);
            data.rooms.push(room);
        }

        self.save().await
    }

    /// Register every entry of a snapshot, e.g. the sample clinic on first run.
    pub async fn seed(&self, snapshot: DirectorySnapshot) -> Result<(), DirectoryError> {
        {
            let mut data = self.data.write().await;
            for user in snapshot.users {
                if data.users.iter().any(|existing| existing.id() == user.id()) {
                    return Err(DirectoryError::DuplicateUser(user.id().to_string()));
                }
                data.users.push(user);
            }
            for room in snapshot.rooms {
                if data.rooms.iter().any(|existing| existing.number == room.number) {
                    return Err(DirectoryError::DuplicateRoom(room.number));
                }
                data.rooms.push(room);
            }
        }

        info!("Directory seeded");
        self.save().await
    }

    async fn register_user(&self, user: User) -> Result<(), DirectoryError> {
        if user.id().trim().is_empty() {
            return Err(DirectoryError::ValidationError("User id cannot be empty".to_string()));
        }

        {
            let mut data = self.data.write().await;
            // ids are global across roles, lookups are by id alone
            if data.users.iter().any(|existing| existing.id() == user.id()) {
                warn!("Rejected duplicate user id {}", user.id());
                return Err(DirectoryError::DuplicateUser(user.id().to_string()));
            }
            info!("Registering {} {} ({})", user.role(), user.id(), user.full_name());
            data.users.push(user);
        }

        self.save().await
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn find_user(&self, id: &str) -> Option<User> {
        self.data
            .read()
            .await
            .users
            .iter()
            .find(|user| user.id() == id)
            .cloned()
    }

    async fn find_room(&self, number: &str) -> Option<Room> {
        self.data
            .read()
            .await
            .rooms
            .iter()
            .find(|room| room.number == number)
            .cloned()
    }

    async fn all_doctors(&self) -> Vec<Doctor> {
        self.data.read().await.doctors().cloned().collect()
    }

    async fn all_rooms(&self) -> Vec<Room> {
        self.data.read().await.rooms.clone()
    }

    async fn assign_doctor_room(&self, doctor_id: &str, room_number: &str) -> Result<(), DirectoryError> {
        {
            let mut data = self.data.write().await;

            if !data.rooms.iter().any(|room| room.number == room_number) {
                return Err(DirectoryError::RoomNotFound(room_number.to_string()));
            }

            let doctor = data
                .users
                .iter_mut()
                .find_map(|user| match user {
                    User::Doctor(doctor) if doctor.id == doctor_id => Some(doctor),
                    _ => None,
                })
                .ok_or_else(|| DirectoryError::DoctorNotFound(doctor_id.to_string()))?;

            info!("Assigning room {} to doctor {}", room_number, doctor_id);
            doctor.assigned_room = Some(room_number.to_string());
        }

        self.save().await
    }

    async fn save(&self) -> Result<(), DirectoryError> {
        match &self.storage {
            Some(storage) => {
                let snapshot = self.data.read().await.clone();
                storage.save(&snapshot).await
            }
            None => Ok(()),
        }
    }
}
