// Local filesystem blob storage
mod local;

use thiserror::Error;

pub use local::{Blob, LocalStorage};

// Storage error types
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Blob not found: {0}")]
    NotFound(String), // Returned when a blob cannot be found

    #[error("Invalid storage key: {0}")]
    InvalidKey(String), // Key does not name a single file inside the upload directory

    #[error("Could not allocate a unique name for {0}")]
    NameCollision(String),

    #[error("Io Error: {0}")]
    IoError(#[from] std::io::Error), // Wraps standard I/O errors
}
