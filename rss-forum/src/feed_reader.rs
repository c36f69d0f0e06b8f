use crate::cache::FeedCache;
use crate::parser::FeedParser;
use crate::traits::FeedSource;
use crate::types::{FeedData, PipelineError, Result};
use chrono::Utc;
use std::time::Duration;
use tracing::{info, warn};

/// Fetches and parses the feed under a hard timeout, falling back to a fresh cached copy.
pub struct FeedReader {
    source: Box<dyn FeedSource>,
    cache: FeedCache,
    timeout: Duration,
}

impl FeedReader {
    pub fn new(source: Box<dyn FeedSource>, cache: FeedCache, timeout: Duration) -> Self {
        Self {
            source,
            cache,
            timeout,
        }
    }

    /// Returns the current feed.
    ///
    /// Without `force_refresh` a fresh cached copy is served without touching the network.
    /// A failed live fetch falls back to the cached copy when it is still fresh; otherwise
    /// the fetch error is returned.
    pub async fn fetch(&mut self, force_refresh: bool) -> Result<FeedData> {
        if !force_refresh {
            if let Some(cached) = self.cache.fresh() {
                info!("Using cached feed (fetched {})", cached.fetched_at);
                return Ok(cached.clone());
            }
        }

        match self.fetch_live().await {
            Ok(data) => {
                info!(
                    "Fetched {} items from {}",
                    data.items.len(),
                    self.source.source_name()
                );
                self.cache.store(data.clone()).await;
                Ok(data)
            }
            Err(e) => {
                warn!("Live feed fetch from {} failed: {}", self.source.source_name(), e);
                match self.cache.fresh() {
                    Some(cached) => {
                        warn!("Serving cached feed from {}", cached.fetched_at);
                        Ok(cached.clone())
                    }
                    None => Err(e),
                }
            }
        }
    }

    async fn fetch_live(&self) -> Result<FeedData> {
        let raw = tokio::time::timeout(self.timeout, self.source.fetch_raw())
            .await
            .map_err(|_| PipelineError::Timeout {
                operation: "feed fetch",
                after: self.timeout,
            })??;

        FeedParser::parse_feed(&raw, Utc::now())
    }
}
