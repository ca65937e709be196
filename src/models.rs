use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Metadata of one stored blob, as persisted in the `files` table.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct FileRecord {
    pub id: Uuid,
    pub filename: String,
    /// Key of the blob inside the upload directory. Never sent to clients.
    pub storage_path: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub uploaded_at: DateTime<Utc>,
}

/// A record about to be inserted; the store assigns `id` and `uploaded_at`.
#[derive(Debug, Clone)]
pub struct NewFileRecord {
    pub filename: String,
    pub storage_path: String,
    pub mime_type: String,
    pub size_bytes: i64,
}

/// Client-facing view of a [`FileRecord`].
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct FileResponse {
    pub id: Uuid,
    pub filename: String,
    pub size: i64,
    pub mimetype: String,
    #[serde(rename = "uploadedAt")]
    pub uploaded_at: DateTime<Utc>,
}

impl From<FileRecord> for FileResponse {
    fn from(record: FileRecord) -> Self {
        Self {
            id: record.id,
            filename: record.filename,
            size: record.size_bytes,
            mimetype: record.mime_type,
            uploaded_at: record.uploaded_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub count: usize,
    pub files: Vec<FileResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
