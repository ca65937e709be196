use crate::config::Config;
use crate::metadata::MetadataBackend;
use crate::storage::LocalStorage;

/// Central application state shared across all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// File record store (PostgreSQL or SQLite).
    pub metadata: MetadataBackend,

    /// Upload directory holding the blobs.
    pub storage: LocalStorage,

    /// Application configuration loaded from environment variables or `.env`.
    pub config: Config,
}
