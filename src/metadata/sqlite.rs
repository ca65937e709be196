use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    QueryBuilder, Sqlite, SqlitePool,
};
use uuid::Uuid;

use super::{assign_identity, MetadataError, MetadataStore};
use crate::models::{FileRecord, NewFileRecord};

// SQLite metadata store
#[derive(Clone, Debug)]
pub struct SqliteMetadataStore {
    pool: SqlitePool,
}

impl SqliteMetadataStore {
    /// Open (creating if missing) the database file and run migrations.
    ///
    /// An in-memory database lives only as long as its connection, so it is
    /// served by a single connection that is never recycled.
    pub async fn connect(database_url: &str) -> Result<Self, MetadataError> {
        let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");

        let mut options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options.connect_with(options).await?;

        sqlx::migrate!("./migrations/sqlite").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn insert_many(&self, records: Vec<NewFileRecord>) -> Result<Vec<FileRecord>, MetadataError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let records: Vec<FileRecord> = records.into_iter().map(assign_identity).collect();

        {
            let mut query = QueryBuilder::<Sqlite>::new(
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
             FROM files WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(MetadataError::NotFound(id))
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<(), MetadataError> {
        let result = sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(MetadataError::NotFound(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn store() -> SqliteMetadataStore {
        SqliteMetadataStore::connect("sqlite::memory:").await.unwrap()
    }

    fn new_record(name: &str, size: i64) -> NewFileRecord {
        NewFileRecord {
            filename: name.to_string(),
            storage_path: format!("1700000000000000-{name}"),
            mime_type: "text/plain".to_string(),
            size_bytes: size,
        }
    }

    #[tokio::test]
    async fn insert_many_assigns_distinct_ids() {
        let store = store().await;

        let stored = store
            .insert_many(vec![new_record("a.txt", 1), new_record("b.txt", 2), new_record("c.txt", 3)])
            .await
            .unwrap();

        assert_eq!(stored.len(), 3);
        assert_eq!(
            stored.iter().map(|r| r.filename.as_str()).collect::<Vec<_>>(),
            ["a.txt", "b.txt", "c.txt"]
        );
        assert_ne!(stored[0].id, stored[1].id);
        assert_ne!(stored[1].id, stored[2].id);
        assert_eq!(store.list_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn insert_many_with_no_records_is_a_no_op() {
        let store = store().await;
        assert!(store.insert_many(Vec::new()).await.unwrap().is_empty());
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn find_by_id_round_trips_every_field() {
        let store = store().await;
        let stored = store.insert_many(vec![new_record("notes.md", 42)]).await.unwrap();

        let found = store.find_by_id(stored[0].id).await.unwrap();
        assert_eq!(found, stored[0]);
    }

    #[tokio::test]
    async fn list_all_is_newest_first() {
        let store = store().await;

        let older = store.insert_many(vec![new_record("older.txt", 1)]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let newer = store.insert_many(vec![new_record("newer.txt", 1)]).await.unwrap();

        let listed = store.list_all().await.unwrap();
        assert_eq!(listed[0].id, newer[0].id);
        assert_eq!(listed[1].id, older[0].id);
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let store = store().await;
        let id = Uuid::new_v4();

        assert!(matches!(store.find_by_id(id).await, Err(MetadataError::NotFound(missing)) if missing == id));
        assert!(matches!(store.delete_by_id(id).await, Err(MetadataError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_by_id_removes_only_that_record() {
        let store = store().await;
        let stored = store
            .insert_many(vec![new_record("keep.txt", 1), new_record("drop.txt", 1)])
            .await
            .unwrap();

        store.delete_by_id(stored[1].id).await.unwrap();

        let remaining = store.list_all().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, stored[0].id);
        assert!(matches!(store.find_by_id(stored[1].id).await, Err(MetadataError::NotFound(_))));
    }
}
