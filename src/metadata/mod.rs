// Submodules for the PostgreSQL and SQLite metadata backends
mod postgres;
mod sqlite;

use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

pub use postgres::PgMetadataStore;
pub use sqlite::SqliteMetadataStore;

use crate::models::{FileRecord, NewFileRecord};

// Metadata error types
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("File record not found: {0}")]
    NotFound(Uuid),

    #[error("Unsupported database url scheme: {0}")]
    UnsupportedUrl(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// CRUD over file records.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Insert a batch of records in one statement, assigning ids and timestamps.
    /// Returns the stored records in input order.
    async fn insert_many(&self, records: Vec<NewFileRecord>) -> Result<Vec<FileRecord>, MetadataError>;

    /// Every record, newest first.
    async fn list_all(&self) -> Result<Vec<FileRecord>, MetadataError>;

    async fn find_by_id(&self, id: Uuid) -> Result<FileRecord, MetadataError>;

    async fn delete_by_id(&self, id: Uuid) -> Result<(), MetadataError>;
}

// Enum to represent metadata backends
#[derive(Clone, Debug)]
pub enum MetadataBackend {
    Postgres(PgMetadataStore),
    Sqlite(SqliteMetadataStore),
}

// Delegates calls to the chosen backend
#[async_trait]
impl MetadataStore for MetadataBackend {
    async fn insert_many(&self, records: Vec<NewFileRecord>) -> Result<Vec<FileRecord>, MetadataError> {
        match self {
            MetadataBackend::Postgres(s) => s.insert_many(records).await,
            MetadataBackend::Sqlite(s) => s.insert_many(records).await,
        }
    }

    async fn list_all(&self) -> Result<Vec<FileRecord>, MetadataError> {
        match self {
            MetadataBackend::Postgres(s) => s.list_all().await,
            MetadataBackend::Sqlite(s) => s.list_all().await,
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<FileRecord, MetadataError> {
        match self {
            MetadataBackend::Postgres(s) => s.find_by_id(id).await,
            MetadataBackend::Sqlite(s) => s.find_by_id(id).await,
        }
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<(), MetadataError> {
        match self {
            MetadataBackend::Postgres(s) => s.delete_by_id(id).await,
            MetadataBackend::Sqlite(s) => s.delete_by_id(id).await,
        }
    }
}

/// Connect to the metadata store named by `database_url` and apply migrations.
pub async fn init_metadata(database_url: &str) -> Result<MetadataBackend, MetadataError> {
    info!("Connecting to metadata store...");

    let backend = if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        MetadataBackend::Postgres(PgMetadataStore::connect(database_url).await?)
    } else if database_url.starts_with("sqlite:") {
        MetadataBackend::Sqlite(SqliteMetadataStore::connect(database_url).await?)
    } else {
        let scheme = database_url.split(':').next().unwrap_or_default();
        return Err(MetadataError::UnsupportedUrl(scheme.to_string()));
    };

    info!("Metadata store connection established");
    Ok(backend)
}

/// Gives a new record its identity. Timestamps are cut to microseconds, the
/// finest precision both backends keep.
fn assign_identity(record: NewFileRecord) -> FileRecord {
    FileRecord {
        id: Uuid::new_v4(),
        filename: record.filename,
        storage_path: record.storage_path,
        mime_type: record.mime_type,
        size_bytes: record.size_bytes,
        uploaded_at: Utc::now().trunc_subsecs(6),
    }
}
