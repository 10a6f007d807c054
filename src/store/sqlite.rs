//! SQLite-backed [`ContentStore`] implementation.

use async_trait::async_trait;
use chrono::DateTime;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::config::Config;
use crate::db;
use crate::error::PersistenceError;
use crate::migrate;
use crate::models::{NewContent, ProcessedContent, SourceKind};

use super::ContentStore;

/// Wraps a [`SqlitePool`]; the pool runs in WAL mode, so concurrent
/// submissions can insert without coordinating.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect using `[db]` settings and make sure the schema exists.
    pub async fn open(config: &Config) -> anyhow::Result<Self> {
        let pool = db::connect(config).await?;
        migrate::create_schema(&pool).await?;
        Ok(Self::new(pool))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn row_to_record(row: &SqliteRow) -> Result<ProcessedContent, PersistenceError> {
    let source_type: String = row.try_get("source_type").map_err(PersistenceError::new)?;
    let created_at: i64 = row.try_get("created_at").map_err(PersistenceError::new)?;

    Ok(ProcessedContent {
        id: row.try_get("id").map_err(PersistenceError::new)?,
        source_kind: source_type
            .parse::<SourceKind>()
            .map_err(PersistenceError::new)?,
        source_value: row.try_get("source_value").map_err(PersistenceError::new)?,
        original_text: row.try_get("original_text").map_err(PersistenceError::new)?,
        summary: row.try_get("summary").map_err(PersistenceError::new)?,
        created_at: DateTime::from_timestamp(created_at, 0).ok_or_else(|| {
            PersistenceError::new(format!("invalid created_at timestamp: {}", created_at))
        })?,
    })
}

#[async_trait]
impl ContentStore for SqliteStore {
    async fn insert(&self, content: NewContent) -> Result<ProcessedContent, PersistenceError> {
        let created_at = content.created_at.timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO processed_content (source_type, source_value, original_text,
                                           summary, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(content.source_kind.as_str())
        .bind(&content.source_value)
        .bind(&content.original_text)
        .bind(&content.summary)
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(PersistenceError::new)?;

        let mut record = ProcessedContent::from_new(result.last_insert_rowid(), content);
        // Stored with second precision; hand back what `get` will return.
        if let Some(ts) = DateTime::from_timestamp(created_at, 0) {
            record.created_at = ts;
        }
        Ok(record)
    }

    async fn get(&self, id: i64) -> Result<Option<ProcessedContent>, PersistenceError> {
        let row = sqlx::query(
            "SELECT id, source_type, source_value, original_text, summary, created_at \
             FROM processed_content WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(PersistenceError::new)?;

        row.as_ref().map(row_to_record).transpose()
    }
}
