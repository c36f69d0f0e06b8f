use crate::traits::{DedupStore, ThreadStore};
use crate::types::{ItemId, NewThread, PipelineError, ProcessedRecord, Result, Thread, ThreadId};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

#[derive(Default)]
struct MemoryState {
    processed: Vec<ProcessedRecord>,
    threads: Vec<Thread>,
    topic_counts: HashMap<String, i64>,
}

/// Process-local store for dry runs and tests. Nothing survives the process.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a category with a zero topic count.
    pub async fn add_category(&self, category_id: &str) {
        let mut state = self.state.write().await;
        state.topic_counts.entry(category_id.to_string()).or_insert(0);
    }

    pub async fn threads(&self) -> Vec<Thread> {
        self.state.read().await.threads.clone()
    }

    pub async fn records(&self) -> Vec<ProcessedRecord> {
        self.state.read().await.processed.clone()
    }
}

#[async_trait]
impl DedupStore for MemoryStore {
    async fn filter_new(&self, ids: &[ItemId]) -> Result<Vec<ItemId>> {
        let state = self.state.read().await;
        let seen: HashSet<&str> = state.processed.iter().map(|r| r.rss_id.as_str()).collect();
        Ok(ids
            .iter()
            .filter(|id| !seen.contains(id.as_str()))
            .cloned()
            .collect())
    }

    async fn mark(&self, record: ProcessedRecord) -> Result<()> {
        record.validate()?;
        let mut state = self.state.write().await;
        if state.processed.iter().any(|r| r.rss_id == record.rss_id) {
            return Err(PipelineError::Store(format!(
                "item {} is already marked as processed",
                record.rss_id
            )));
        }
        debug!("Marked {} as processed", record.rss_id);
        state.processed.push(record);
        Ok(())
    }

    async fn processed_ids(&self) -> Result<Vec<ItemId>> {
        let state = self.state.read().await;
        Ok(state.processed.iter().map(|r| r.rss_id.clone()).collect())
    }
}

#[async_trait]
impl ThreadStore for MemoryStore {
    async fn create_thread(&self, thread: NewThread) -> Result<ThreadId> {
        let id = Uuid::new_v4();
        let mut state = self.state.write().await;
        if let Some(count) = state.topic_counts.get_mut(&thread.category_id) {
            *count += 1;
        }
        state.threads.push(Thread::from_new(id, thread));
        Ok(id)
    }

    async fn category_topic_count(&self, category_id: &str) -> Result<Option<i64>> {
        Ok(self.state.read().await.topic_counts.get(category_id).copied())
    }
}
