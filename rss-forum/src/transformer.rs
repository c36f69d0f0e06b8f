use crate::config::RewriteConfig;
use crate::traits::{RewriteRequest, RewriteService};
use crate::types::{FeedItem, PipelineError, Result, RewrittenContent};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Turns one feed item into publishable content through the rewriting service.
///
/// Calls go out one at a time; successive calls start at least `min_delay` apart. A call
/// that exceeds `timeout`, returns a blank title or body, or drops the source link fails.
pub struct ContentTransformer {
    service: Arc<dyn RewriteService>,
    timeout: Duration,
    min_delay: Duration,
    last_call: Option<Instant>,
    calls: usize,
}

impl ContentTransformer {
    pub fn new(service: Arc<dyn RewriteService>, config: &RewriteConfig) -> Self {
        Self::with_limits(service, config.timeout, config.min_delay)
    }

    pub fn with_limits(service: Arc<dyn RewriteService>, timeout: Duration, min_delay: Duration) -> Self {
        Self {
            service,
            timeout,
            min_delay,
            last_call: None,
            calls: 0,
        }
    }

    /// Number of service calls issued so far.
    pub fn calls(&self) -> usize {
        self.calls
    }

    pub async fn rewrite(&mut self, item: &FeedItem) -> Result<RewrittenContent> {
        self.throttle().await;

        let request = RewriteRequest {
            title: item.title.clone(),
            body: item.body.clone(),
            source_link: item.link.clone(),
            categories: item.categories.clone(),
        };

        self.last_call = Some(Instant::now());
        self.calls += 1;
        debug!("Rewriting {} via {}", item.id, self.service.adapter_name());

        let response = tokio::time::timeout(self.timeout, self.service.rewrite(&request))
            .await
            .map_err(|_| PipelineError::Timeout {
                operation: "rewrite",
                after: self.timeout,
            })??;

        let title = response.title.trim();
        let body = response.body.trim();
        if title.is_empty() || body.is_empty() {
            warn!("Rewrite of {} came back with an empty title or body", item.id);
            return Err(PipelineError::Rewrite(
                "rewritten title or body is empty".to_string(),
            ));
        }

        if !body.contains(&item.link) {
            warn!("Rewrite of {} dropped the source link", item.id);
            return Err(PipelineError::MissingAttribution {
                link: item.link.clone(),
            });
        }

        Ok(RewrittenContent {
            title: title.to_string(),
            body: body.to_string(),
            source_link: item.link.clone(),
            categories: item.categories.clone(),
        })
    }

    async fn throttle(&self) {
        if let Some(last) = self.last_call {
            let elapsed = last.elapsed();
            if elapsed < self.min_delay {
                let wait = self.min_delay - elapsed;
                debug!("Throttling rewrite calls: waiting {:?}", wait);
                tokio::time::sleep(wait).await;
            }
        }
    }
}
