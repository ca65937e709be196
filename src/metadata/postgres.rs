use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{assign_identity, MetadataError, MetadataStore};
use crate::models::{FileRecord, NewFileRecord};

// PostgreSQL metadata store
#[derive(Clone, Debug)]
pub struct PgMetadataStore {
    pool: PgPool,
}

impl PgMetadataStore {
    /// Connect with a pool of at most 5 connections and run migrations.
    pub async fn connect(database_url: &str) -> Result<Self, MetadataError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations/postgres").run(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl MetadataStore for PgMetadataStore {
    async fn insert_many(&self, records: Vec<NewFileRecord>) -> Result<Vec<FileRecord>, MetadataError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let records: Vec<FileRecord> = records.into_iter().map(assign_identity).collect();

        {
            let mut query = QueryBuilder::<Postgres>::new(
                "INSERT INTO files (id, filename, storage_path, mime_type, size_bytes, uploaded_at) ",
            );
            query.push_values(&records, |mut row, record| {
                row.push_bind(record.id)
                    .push_bind(&record.filename)
                    .push_bind(&record.storage_path)
                    .push_bind(&record.mime_type)
                    .push_bind(record.size_bytes)
                    .push_bind(record.uploaded_at);
            });
            query.build().execute(&self.pool).await?;
        }

        Ok(records)
    }

    async fn list_all(&self) -> Result<Vec<FileRecord>, MetadataError> {
        let files = sqlx::query_as::<_, FileRecord>(
            "SELECT id, filename, storage_path, mime_type, size_bytes, uploaded_at \
             FROM files ORDER BY uploaded_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(files)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<FileRecord, MetadataError> {
        sqlx::query_as::<_, FileRecord>(
            "SELECT id, filename, storage_path, mime_type, size_bytes, uploaded_at \
             FROM files WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(MetadataError::NotFound(id))
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<(), MetadataError> {
        let result = sqlx::query("DELETE FROM files WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(MetadataError::NotFound(id));
        }
        Ok(())
    }
}
