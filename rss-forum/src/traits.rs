use crate::types::{ItemId, NewThread, ProcessedRecord, Result, ThreadId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Where raw feed documents come from (network, local file, ...).
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Human-readable name for this source
    fn source_name(&self) -> String;

    /// Fetch the raw feed document. Implementations apply their own bounded retries;
    /// the feed reader applies the hard timeout.
    async fn fetch_raw(&self) -> Result<String>;
}

/// Persistent record of which feed items already produced a thread.
#[async_trait]
pub trait DedupStore: Send + Sync {
    /// Returns the subset of `ids` that have no processed record, in input order.
    ///
    /// Adapters may load the full processed set once per call; the contract does not
    /// depend on how membership is tested.
    async fn filter_new(&self, ids: &[ItemId]) -> Result<Vec<ItemId>>;

    /// Appends one record. A second record for the same identifier is an error.
    async fn mark(&self, record: ProcessedRecord) -> Result<()>;

    async fn processed_ids(&self) -> Result<Vec<ItemId>>;
}

/// Thread collection plus the per-category topic counters.
#[async_trait]
pub trait ThreadStore: Send + Sync {
    /// Creates the thread and increments its category's topic counter as one unit.
    async fn create_thread(&self, thread: NewThread) -> Result<ThreadId>;

    /// `None` when the category does not exist.
    async fn category_topic_count(&self, category_id: &str) -> Result<Option<i64>>;
}

/// Request sent to the text-generation service for one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewriteRequest {
    pub title: String,
    pub body: String,
    pub source_link: String,
    pub categories: Vec<String>,
}

/// Structured payload the service must answer with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewriteResponse {
    pub title: String,
    #[serde(alias = "content")]
    pub body: String,
}

/// Trait for LLM adapters that turn a raw feed item into forum prose
#[async_trait]
pub trait RewriteService: Send + Sync {
    /// Get the name of this adapter
    fn adapter_name(&self) -> String;

    /// One request/response call. No retries; the transformer owns timeout and throttle.
    async fn rewrite(&self, request: &RewriteRequest) -> Result<RewriteResponse>;
}
