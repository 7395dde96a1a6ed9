pub mod directory;
pub mod storage;

pub use directory::{Directory, InMemoryDirectory};
pub use storage::{sanitize_field, DirectoryStorage, FIELD_SEPARATOR};
