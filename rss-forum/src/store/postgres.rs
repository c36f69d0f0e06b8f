use crate::traits::{DedupStore, ThreadStore};
use crate::types::{ItemId, NewThread, PipelineError, ProcessedRecord, Result, ThreadId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::collections::HashSet;
use tracing::{debug, info};
use uuid::Uuid;

/// Postgres-backed dedup and thread store.
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub async fn new(database_url: &str) -> Result<Self> {
        let db = PgPool::connect(database_url).await?;
        Ok(Self { db })
    }

    pub async fn setup_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS processed_articles (
                rss_id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                link TEXT NOT NULL,
                processed_at TIMESTAMP WITH TIME ZONE NOT NULL,
                topic_id UUID NOT NULL
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS categories (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                topics_count BIGINT NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS topics (
                id UUID PRIMARY KEY,
                title TEXT NOT NULL,
                category_id TEXT NOT NULL,
                author_id TEXT NOT NULL,
                author_name TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL,
                updated_at TIMESTAMP WITH TIME ZONE NOT NULL,
                views BIGINT NOT NULL DEFAULT 0,
                replies_count BIGINT NOT NULL DEFAULT 0,
                is_pinned BOOLEAN NOT NULL DEFAULT FALSE,
                is_locked BOOLEAN NOT NULL DEFAULT FALSE
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        info!("Database schema ready");
        Ok(())
    }

    /// Inserts the category if it does not exist yet.
    pub async fn ensure_category(&self, category_id: &str, name: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO categories (id, name, topics_count) VALUES ($1, $2, 0) ON CONFLICT (id) DO NOTHING",
        )
        .bind(category_id)
        .bind(name)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    pub async fn processed_records(&self) -> Result<Vec<ProcessedRecord>> {
        let rows = sqlx::query(
            "SELECT rss_id, title, link, processed_at, topic_id FROM processed_articles ORDER BY processed_at",
        )
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(record_from_row).collect()
    }
}

fn record_from_row(row: &PgRow) -> Result<ProcessedRecord> {
    let record = ProcessedRecord {
        rss_id: row.try_get("rss_id")?,
        title: row.try_get("title")?,
        link: row.try_get("link")?,
        processed_at: row.try_get::<DateTime<Utc>, _>("processed_at")?,
        thread_id: row.try_get::<Uuid, _>("topic_id")?,
    };
    record.validate()?;
    Ok(record)
}

fn rss_id_from_row(row: &PgRow) -> Result<ItemId> {
    let rss_id: String = row.try_get("rss_id")?;
    if rss_id.trim().is_empty() {
        return Err(PipelineError::Store(
            "processed_articles contains a row with an empty rss_id".to_string(),
        ));
    }
    Ok(rss_id)
}

#[async_trait]
impl DedupStore for PgStore {
    async fn filter_new(&self, ids: &[ItemId]) -> Result<Vec<ItemId>> {
        // Full-set diff; fine at feed-sized volumes.
        let processed: HashSet<ItemId> = self.processed_ids().await?.into_iter().collect();
        Ok(ids
            .iter()
            .filter(|id| !processed.contains(*id))
            .cloned()
            .collect())
    }

    async fn mark(&self, record: ProcessedRecord) -> Result<()> {
        record.validate()?;
        sqlx::query(
            r#"
            INSERT INTO processed_articles (rss_id, title, link, processed_at, topic_id)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&record.rss_id)
        .bind(&record.title)
        .bind(&record.link)
        .bind(record.processed_at)
        .bind(record.thread_id)
        .execute(&self.db)
        .await?;

        debug!("Marked {} as processed", record.rss_id);
        Ok(())
    }

    async fn processed_ids(&self) -> Result<Vec<ItemId>> {
        let rows = sqlx::query("SELECT rss_id FROM processed_articles")
            .fetch_all(&self.db)
            .await?;
        rows.iter().map(rss_id_from_row).collect()
    }
}

#[async_trait]
impl ThreadStore for PgStore {
    async fn create_thread(&self, thread: NewThread) -> Result<ThreadId> {
        let id = Uuid::new_v4();
        let mut tx = self.db.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO topics (id, title, category_id, author_id, author_name, content,
                                created_at, updated_at, views, replies_count, is_pinned, is_locked)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7, 0, 0, FALSE, FALSE)
            "#,
        )
        .bind(id)
        .bind(&thread.title)
        .bind(&thread.category_id)
        .bind(&thread.author_id)
        .bind(&thread.author_name)
        .bind(&thread.body)
        .bind(thread.created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE categories SET topics_count = topics_count + 1 WHERE id = $1")
            .bind(&thread.category_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(id)
    }

    async fn category_topic_count(&self, category_id: &str) -> Result<Option<i64>> {
        let count = sqlx::query_scalar::<_, i64>("SELECT topics_count FROM categories WHERE id = $1")
            .bind(category_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(count)
    }
}
