use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    error::AppError,
    metadata::{MetadataError, MetadataStore},
    models::*,
    state::AppState,
    storage::StorageError,
    utils::{attachment_disposition, normalize_filename},
};

/// Multipart field carrying uploaded files.
const UPLOAD_FIELD: &str = "files";

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Upload one or more files sent as repeated `files` multipart fields.
///
/// Every blob is written before the batch of records is inserted. A failure
/// part way through leaves the blobs already written in place.
pub async fn upload_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut pending: Vec<NewFileRecord> = Vec::new();
    let mut stored_keys: Vec<String> = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        error!("Error parsing multipart: {}", e);
        warn_orphans(&stored_keys);
        multipart_error(e)
    })? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        // Browsers send an empty, nameless part when no file was picked
        let original_name = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => continue,
        };
        let mime_type = field.content_type().unwrap_or(DEFAULT_MIME_TYPE).to_string();

        let data = field.bytes().await.map_err(|e| {
            error!("Error reading file bytes: {}", e);
            warn_orphans(&stored_keys);
            multipart_error(e)
        })?;
        let size_bytes = data.len() as i64;

        let storage_path = state.storage.store(&original_name, data).await.map_err(|e| {
            error!("Error storing file {}: {}", original_name, e);
            warn_orphans(&stored_keys);
            e
        })?;

        stored_keys.push(storage_path.clone());
        pending.push(NewFileRecord {
            filename: normalize_filename(&original_name),
            storage_path,
            mime_type,
            size_bytes,
        });
    }

    if pending.is_empty() {
        return Err(AppError::BadRequest("No files provided".into()));
    }

    let files = state.metadata.insert_many(pending).await.map_err(|e| {
        error!("Error saving file metadata: {}", e);
        warn_orphans(&stored_keys);
        e
    })?;

    for file in &files {
        info!("File uploaded: {} {} ({} bytes)", file.id, file.filename, file.size_bytes);
    }

    Ok(Json(UploadResponse {
        message: "Files uploaded successfully".into(),
        count: files.len(),
        files: files.into_iter().map(FileResponse::from).collect(),
    }))
}

/// List every uploaded file, newest first.
pub async fn list_files(
    State(state): State<AppState>,
) -> Result<Json<Vec<FileResponse>>, AppError> {
    let files = state.metadata.list_all().await?;

    Ok(Json(files.into_iter().map(FileResponse::from).collect()))
}

/// Stream a file back under its display name.
pub async fn download_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_id(&id)?;
    let file = state.metadata.find_by_id(id).await?;

    let blob = state.storage.read(&file.storage_path).await.map_err(|e| {
        error!("Error reading blob for file {}: {}", id, e);
        e
    })?;

    let content_type = HeaderValue::from_str(&file.mime_type)
        .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_MIME_TYPE));

    let headers = [
        (header::CONTENT_TYPE, content_type),
        (header::CONTENT_LENGTH, HeaderValue::from(blob.size)),
        (header::CONTENT_DISPOSITION, attachment_disposition(&file.filename)),
    ];

    Ok((headers, Body::from_stream(blob.stream)).into_response())
}

/// Delete a file: the blob first, then its record.
pub async fn delete_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = parse_id(&id)?;
    let file = state.metadata.find_by_id(id).await?;

    match state.storage.remove(&file.storage_path).await {
        Ok(()) => {}
        Err(StorageError::NotFound(key)) => {
            warn!("Blob {} of file {} was already missing; removing record", key, id);
        }
        Err(e) => {
            error!("Failed to delete blob of file {}: {}", id, e);
            return Err(e.into());
        }
    }

    // Blob is gone from here on; a failure leaves a dangling record
    state.metadata.delete_by_id(id).await.map_err(|e| {
        if !matches!(e, MetadataError::NotFound(_)) {
            error!("Blob of file {} removed but record delete failed: {}", id, e);
        }
        e
    })?;

    info!("File deleted: {}", id);

    Ok(Json(MessageResponse {
        message: "File deleted successfully".into(),
    }))
}

/// Liveness probe.
pub async fn health_check() -> &'static str {
    "OK"
}

/// Ids that are not UUIDs cannot exist, so they are reported as not found.
fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound("File not found".into()))
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::MultipartError(err.body_text())
    }
}

fn warn_orphans(keys: &[String]) {
    for key in keys {
        warn!("Orphaned blob left by failed upload: {}", key);
    }
}
