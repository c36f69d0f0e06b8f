use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Identifier of a feed item (guid, link or synthesized fallback).
pub type ItemId = String;

/// Identifier of a forum thread created by the publisher.
pub type ThreadId = Uuid;

/// One entry from the news feed. Re-derived on every fetch, never persisted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: ItemId,
    pub title: String,
    pub link: String,
    pub published_at: DateTime<Utc>,
    pub body: String,
    pub categories: Vec<String>,
}

/// A parsed feed document as handed out by the feed reader and stored in its cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedData {
    pub title: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub items: Vec<FeedItem>,
    pub fetched_at: DateTime<Utc>,
}

/// Marker that a feed item already produced a thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedRecord {
    pub rss_id: ItemId,
    pub title: String,
    pub link: String,
    pub processed_at: DateTime<Utc>,
    pub thread_id: ThreadId,
}

impl ProcessedRecord {
    pub fn new(item: &FeedItem, thread_id: ThreadId) -> Self {
        Self {
            rss_id: item.id.clone(),
            title: item.title.clone(),
            link: item.link.clone(),
            processed_at: Utc::now(),
            thread_id,
        }
    }

    /// Rejects records that would poison the dedup set.
    pub fn validate(&self) -> Result<()> {
        if self.rss_id.trim().is_empty() {
            return Err(PipelineError::Store(
                "processed record has an empty item identifier".to_string(),
            ));
        }
        Ok(())
    }
}

/// Output of the rewriting service for one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewrittenContent {
    pub title: String,
    pub body: String,
    pub source_link: String,
    pub categories: Vec<String>,
}

/// Thread record as handed to a thread store. The store assigns the identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewThread {
    pub title: String,
    pub category_id: String,
    pub author_id: String,
    pub author_name: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub id: ThreadId,
    pub title: String,
    pub category_id: String,
    pub author_id: String,
    pub author_name: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub views: i64,
    pub replies_count: i64,
    pub is_pinned: bool,
    pub is_locked: bool,
}

impl Thread {
    pub fn from_new(id: ThreadId, new_thread: NewThread) -> Self {
        Self {
            id,
            title: new_thread.title,
            category_id: new_thread.category_id,
            author_id: new_thread.author_id,
            author_name: new_thread.author_name,
            body: new_thread.body,
            created_at: new_thread.created_at,
            updated_at: new_thread.created_at,
            views: 0,
            replies_count: 0,
            is_pinned: false,
            is_locked: false,
        }
    }
}

/// Pipeline stage, used for logging and for reporting where an item's chain ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Fetching,
    Deduping,
    Rewriting,
    Emitting,
    Publishing,
    Marking,
    Done,
}

impl Stage {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fetching => "fetching",
            Self::Deduping => "deduping",
            Self::Rewriting => "rewriting",
            Self::Emitting => "emitting",
            Self::Publishing => "publishing",
            Self::Marking => "marking",
            Self::Done => "done",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    /// Thread created and item marked.
    Processed {
        thread_id: ThreadId,
        document: Option<String>,
    },
    /// Chain aborted before a thread existed; the item stays eligible.
    Failed { stage: Stage, reason: String },
    /// Thread exists but the mark did not stick; the item may be published again next run.
    Unmarked { thread_id: ThreadId, reason: String },
    /// Beyond `max_items_per_run`; the item stays eligible.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemReport {
    pub id: ItemId,
    pub title: String,
    pub outcome: ItemOutcome,
}

/// Aggregate counts handed to the invocation wrapper.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub processed: usize,
    pub failed: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub summary: RunSummary,
    pub items: Vec<ItemReport>,
    /// No fresh feed copy could be obtained; the run was a no-op.
    pub feed_unavailable: bool,
    /// The processed set could not be read; no item was touched.
    pub store_unavailable: bool,
}

impl RunReport {
    pub fn record(&mut self, item: &FeedItem, outcome: ItemOutcome) {
        match &outcome {
            ItemOutcome::Processed { .. } => self.summary.processed += 1,
            ItemOutcome::Failed { .. } | ItemOutcome::Unmarked { .. } => self.summary.failed += 1,
            ItemOutcome::Skipped => self.summary.skipped += 1,
        }
        self.items.push(ItemReport {
            id: item.id.clone(),
            title: item.title.clone(),
            outcome,
        });
    }

    /// Items whose thread exists without a processed record.
    pub fn duplicate_risks(&self) -> Vec<&ItemReport> {
        self.items
            .iter()
            .filter(|report| matches!(report.outcome, ItemOutcome::Unmarked { .. }))
            .collect()
    }

    /// Process exit code: 0 on any success or a true no-op, 1 when everything attempted
    /// failed, 2 when the dedup store could not be consulted.
    pub fn exit_code(&self) -> i32 {
        if self.store_unavailable {
            2
        } else if self.summary.processed == 0 && self.summary.failed > 0 {
            1
        } else {
            0
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed fetch failed: {0}")]
    Fetch(String),

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: &'static str, after: Duration },

    #[error("Rewrite failed: {0}")]
    Rewrite(String),

    #[error("Rewritten body does not contain the source link {link}")]
    MissingAttribution { link: String },

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Document emit failed: {0}")]
    Emit(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Feed size exceeds limit: {size_mb}MB")]
    FeedTooLarge { size_mb: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
