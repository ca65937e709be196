use std::{
    io::ErrorKind,
    path::{Component, Path, PathBuf},
};

use bytes::Bytes;
use chrono::Utc;
use tokio::{fs, io::AsyncWriteExt};
use tokio_util::io::ReaderStream;

use super::StorageError;
use crate::utils::normalize_filename;

/// Longest name part kept after the timestamp prefix, in bytes.
const MAX_NAME_LEN: usize = 200;

/// Attempts at finding a free name before giving up.
const MAX_NAME_ATTEMPTS: usize = 8;

/// An opened blob, ready to be streamed to a client.
pub struct Blob {
    pub size: u64,
    pub stream: ReaderStream<fs::File>,
}

// Local filesystem storage
#[derive(Clone, Debug)]
pub struct LocalStorage {
    base_path: PathBuf, // Directory holding every blob
}

impl LocalStorage {
    /// Creates a new LocalStorage rooted at `base_path`, creating the directory if absent.
    pub async fn new(base_path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path).await?;
        tracing::info!("Upload directory ready at {:?}", base_path);
        Ok(Self { base_path })
    }

    /// Resolves a storage key to its path, refusing anything but a plain file name.
    fn get_full_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let mut components = Path::new(key).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.base_path.join(key)),
            _ => Err(StorageError::InvalidKey(key.to_string())),
        }
    }

    /// Writes `content` under `<timestamp>-<normalized original name>` and returns that key.
    pub async fn store(&self, original_name: &str, content: Bytes) -> Result<String, StorageError> {
        let name = truncate_name(normalize_filename(original_name));

        let mut timestamp = Utc::now().timestamp_micros();

        for _ in 0..MAX_NAME_ATTEMPTS {
            let key = format!("{}-{}", timestamp, name);
            let full_path = self.get_full_path(&key)?;

            let mut file = match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&full_path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    timestamp += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let written = async {
                file.write_all(&content).await?;
                file.flush().await
            }
            .await;

            if let Err(e) = written {
                drop(file);
                let _ = fs::remove_file(&full_path).await;
                return Err(e.into());
            }

            tracing::debug!("Saved blob {} ({} bytes)", key, content.len());
            return Ok(key);
        }

        Err(StorageError::NameCollision(name))
    }

    /// Opens a blob for streaming.
    pub async fn read(&self, key: &str) -> Result<Blob, StorageError> {
        let full_path = self.get_full_path(key)?;

        let file = fs::File::open(&full_path).await.map_err(|e| not_found_or(e, key))?;
        let size = file.metadata().await?.len();

        Ok(Blob {
            size,
            stream: ReaderStream::new(file),
        })
    }

    /// Deletes a blob.
    pub async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let full_path = self.get_full_path(key)?;

        fs::remove_file(&full_path)
            .await
            .map_err(|e| not_found_or(e, key))?;

        tracing::debug!("Removed blob {}", key);
        Ok(())
    }
}

fn not_found_or(err: std::io::Error, key: &str) -> StorageError {
    if err.kind() == ErrorKind::NotFound {
        StorageError::NotFound(key.to_string())
    } else {
        StorageError::IoError(err)
    }
}

/// Keeps the tail of long names so the extension survives.
fn truncate_name(name: String) -> String {
    if name.len() <= MAX_NAME_LEN {
        return name;
    }
    let mut start = name.len() - MAX_NAME_LEN;
    while !name.is_char_boundary(start) {
        start += 1;
    }
    name[start..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use axum::body::Body;
    use http_body_util::BodyExt;

    async fn collect(stream: ReaderStream<fs::File>) -> Vec<u8> {
        Body::from_stream(stream)
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec()
    }

    async fn storage() -> (TempDir, LocalStorage) {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path().join("uploads")).await.unwrap();
        (dir, storage)
    }

    #[tokio::test]
    async fn new_creates_missing_directory() {
        let (dir, _storage) = storage().await;
        assert!(dir.path().join("uploads").is_dir());
    }

    #[tokio::test]
    async fn store_prefixes_timestamp_and_normalizes_name() {
        let (dir, storage) = storage().await;

        let key = storage
            .store("annual report.pdf", Bytes::from_static(b"%PDF-1.7"))
            .await
            .unwrap();

        let (timestamp, name) = key.split_once('-').unwrap();
        assert!(timestamp.parse::<i64>().is_ok());
        assert_eq!(name, "annual_report.pdf");

        let on_disk = std::fs::read(dir.path().join("uploads").join(&key)).unwrap();
        assert_eq!(on_disk, b"%PDF-1.7");
    }

    #[tokio::test]
    async fn same_name_twice_gets_distinct_keys() {
        let (_dir, storage) = storage().await;

        let first = storage.store("a.txt", Bytes::from_static(b"one")).await.unwrap();
        let second = storage.store("a.txt", Bytes::from_static(b"two")).await.unwrap();
        assert_ne!(first, second);

        let blob = storage.read(&first).await.unwrap();
        assert_eq!(collect(blob.stream).await, b"one");
    }

    #[tokio::test]
    async fn read_returns_size_and_bytes() {
        let (_dir, storage) = storage().await;
        let payload: Vec<u8> = (0..=255u8).cycle().take(70_000).collect();

        let key = storage.store("bin.dat", Bytes::from(payload.clone())).await.unwrap();
        let blob = storage.read(&key).await.unwrap();

        assert_eq!(blob.size, 70_000);
        assert_eq!(collect(blob.stream).await, payload);
    }

    #[tokio::test]
    async fn read_missing_blob_is_not_found() {
        let (_dir, storage) = storage().await;
        let err = storage.read("123-missing.txt").await.err().unwrap();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn remove_deletes_then_reports_not_found() {
        let (dir, storage) = storage().await;
        let key = storage.store("gone.txt", Bytes::from_static(b"x")).await.unwrap();

        storage.remove(&key).await.unwrap();
        assert!(!dir.path().join("uploads").join(&key).exists());

        let err = storage.remove(&key).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn keys_outside_the_directory_are_rejected() {
        let (_dir, storage) = storage().await;

        for key in ["../secret", "/etc/passwd", "a/b", "..", ""] {
            let err = storage.remove(key).await.unwrap_err();
            assert!(matches!(err, StorageError::InvalidKey(_)), "key {key:?}");
        }
    }

    #[test]
    fn long_names_keep_their_extension() {
        let long = format!("{}.tar.gz", "x".repeat(300));
        let truncated = truncate_name(long);
        assert_eq!(truncated.len(), MAX_NAME_LEN);
        assert!(truncated.ends_with(".tar.gz"));
    }
}
