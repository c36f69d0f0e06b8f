use crate::config::SiteConfig;
use crate::traits::ThreadStore;
use crate::types::{NewThread, PipelineError, Result, RewrittenContent, ThreadId};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Creates forum threads for rewritten content under the bot account.
///
/// Not idempotent: every call creates a new thread and bumps the category counter.
pub struct ThreadPublisher {
    store: Arc<dyn ThreadStore>,
    category_id: String,
    author_id: String,
    author_name: String,
    timeout: Duration,
}

impl ThreadPublisher {
    pub fn new(store: Arc<dyn ThreadStore>, site: &SiteConfig, timeout: Duration) -> Self {
        Self {
            store,
            category_id: site.default_category_id.clone(),
            author_id: site.bot_user_id.clone(),
            author_name: site.bot_user_name.clone(),
            timeout,
        }
    }

    pub async fn publish(&self, content: &RewrittenContent) -> Result<ThreadId> {
        let thread = NewThread {
            title: content.title.clone(),
            category_id: self.category_id.clone(),
            author_id: self.author_id.clone(),
            author_name: self.author_name.clone(),
            body: content.body.clone(),
            created_at: Utc::now(),
        };

        let thread_id = tokio::time::timeout(self.timeout, self.store.create_thread(thread))
            .await
            .map_err(|_| PipelineError::Timeout {
                operation: "thread create",
                after: self.timeout,
            })?
            .map_err(|e| PipelineError::Publish(e.to_string()))?;

        info!("Created forum thread {}: {}", thread_id, content.title);
        Ok(thread_id)
    }
}
