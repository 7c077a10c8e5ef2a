//! Document metadata registry.
//!
//! Keeps one record per uploaded document, keyed by filename. The registry
//! never stores chunk text; its `chunk_count` column is the value the
//! reconciliation check compares against the index. The ingestion pipeline
//! writes a record only after the chunk batch has committed, and deletes it
//! only after the chunks are gone.

use crate::error::IndexError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Row, SqlitePool};

/// Metadata for one uploaded document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentRecord {
    pub filename: String,
    pub upload_time: DateTime<Utc>,
    pub chunk_count: usize,
    pub file_size: u64,
}

/// SQLite-backed registry over the same pool as the index.
#[derive(Debug, Clone)]
pub struct DocumentRegistry {
    pool: SqlitePool,
}

impl DocumentRegistry {
    /// Creates the registry, ensuring its table exists. Shares the pool the
    /// index opened; a failure here is startup-fatal like the index's own.
    pub async fn open(pool: SqlitePool) -> Result<Self, IndexError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                filename TEXT PRIMARY KEY,
                upload_time TIMESTAMP NOT NULL,
                chunk_count INTEGER NOT NULL,
                file_size INTEGER NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(IndexError::Unavailable)?;

        Ok(Self { pool })
    }

    /// Inserts or replaces the record for a document.
    ///
    /// Returns the raw `sqlx::Error` so the ingestion pipeline can wrap a
    /// failure after index commit in its dedicated error variant.
    pub async fn upsert(&self, record: &DocumentRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO documents (filename, upload_time, chunk_count, file_size)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(filename) DO UPDATE SET
                upload_time = excluded.upload_time,
                chunk_count = excluded.chunk_count,
                file_size = excluded.file_size
            "#,
        )
        .bind(&record.filename)
        .bind(record.upload_time)
        .bind(record.chunk_count as i64)
        .bind(record.file_size as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Looks up a single document record.
    pub async fn get(&self, filename: &str) -> Result<Option<DocumentRecord>, IndexError> {
        let row = sqlx::query(
            "SELECT filename, upload_time, chunk_count, file_size
             FROM documents WHERE filename = ?1",
        )
        .bind(filename)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(record_from_row))
    }

    /// All document records, most recent upload first.
    pub async fn list(&self) -> Result<Vec<DocumentRecord>, IndexError> {
        let rows = sqlx::query(
            "SELECT filename, upload_time, chunk_count, file_size
             FROM documents ORDER BY upload_time DESC, filename",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(record_from_row).collect())
    }

    /// Removes a document record. Returns whether a record existed.
    pub async fn delete(&self, filename: &str) -> Result<bool, IndexError> {
        let result = sqlx::query("DELETE FROM documents WHERE filename = ?1")
            .bind(filename)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn record_from_row(row: sqlx::sqlite::SqliteRow) -> DocumentRecord {
    let filename: String = row.get("filename");
    let upload_time: DateTime<Utc> = row.get("upload_time");
    let chunk_count: i64 = row.get("chunk_count");
    let file_size: i64 = row.get("file_size");

    DocumentRecord {
        filename,
        upload_time,
        chunk_count: chunk_count as usize,
        file_size: file_size as u64,
    }
}
