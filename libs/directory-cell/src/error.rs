use thiserror::Error;

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("A user with id {0} is already registered")]
    DuplicateUser(String),

    #[error("A room with number {0} is already registered")]
    DuplicateRoom(String),

    #[error("Doctor not found: {0}")]
    DoctorNotFound(String),

    #[error("Room not found: {0}")]
    RoomNotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Directory storage error: {0}")]
    Storage(#[from] std::io::Error),
}
