use crate::config::{PipelineConfig, SiteConfig};
use crate::emitter::DocumentEmitter;
use crate::feed_reader::FeedReader;
use crate::publisher::ThreadPublisher;
use crate::store::Stores;
use crate::traits::DedupStore;
use crate::transformer::ContentTransformer;
use crate::types::{
    FeedItem, ItemId, ItemOutcome, PipelineError, ProcessedRecord, Result, RunReport, Stage,
};
use crate::utils::url::derive_slug;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, info_span, warn, Instrument};

/// One scheduled RSS-to-forum run.
///
/// Fetch, dedup, then for each new item strictly in feed order:
/// rewrite -> emit (best effort) -> publish -> mark. Items past `max_items_per_run`
/// are skipped and stay eligible for the next run.
pub struct Pipeline {
    reader: FeedReader,
    dedup: Arc<dyn DedupStore>,
    transformer: ContentTransformer,
    emitter: Option<DocumentEmitter>,
    publisher: ThreadPublisher,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        reader: FeedReader,
        stores: Stores,
        transformer: ContentTransformer,
        site: SiteConfig,
        config: PipelineConfig,
    ) -> Self {
        let emitter = config
            .emit_documents
            .then(|| DocumentEmitter::new(site.clone()));
        let publisher = ThreadPublisher::new(stores.threads, &site, config.store_timeout);

        Self {
            reader,
            dedup: stores.dedup,
            transformer,
            emitter,
            publisher,
            config,
        }
    }

    pub async fn run(&mut self) -> RunReport {
        let mut report = RunReport::default();
        info!(
            "Starting RSS-to-forum run (max {} items)",
            self.config.max_items_per_run
        );

        info!(stage = %Stage::Fetching, "Fetching feed");
        let feed = match self.reader.fetch(self.config.force_refresh).await {
            Ok(feed) => feed,
            Err(e) => {
                error!(stage = %Stage::Fetching, "No usable feed, nothing to do: {}", e);
                report.feed_unavailable = true;
                return report;
            }
        };

        if feed.items.is_empty() {
            info!("Feed has no items");
            return report;
        }

        info!(stage = %Stage::Deduping, "Checking {} feed items against processed set", feed.items.len());
        let ids: Vec<ItemId> = feed.items.iter().map(|item| item.id.clone()).collect();
        let new_ids = match bounded(
            self.config.store_timeout,
            "dedup lookup",
            self.dedup.filter_new(&ids),
        )
        .await
        {
            Ok(new_ids) => new_ids.into_iter().collect::<HashSet<_>>(),
            Err(e) => {
                error!(stage = %Stage::Deduping, "Processed set unavailable, aborting run: {}", e);
                report.store_unavailable = true;
                return report;
            }
        };

        let candidates: Vec<FeedItem> = feed
            .items
            .into_iter()
            .filter(|item| new_ids.contains(&item.id))
            .collect();

        if candidates.is_empty() {
            info!("No new items to process");
            return report;
        }

        info!(
            "Found {} new items, processing up to {}",
            candidates.len(),
            self.config.max_items_per_run
        );

        for (index, item) in candidates.iter().enumerate() {
            if index >= self.config.max_items_per_run {
                report.record(item, ItemOutcome::Skipped);
                continue;
            }

            let span = info_span!("item", id = %item.id);
            let outcome = self.process_item(item).instrument(span).await;
            report.record(item, outcome);
        }

        let summary = report.summary;
        info!(
            stage = %Stage::Done,
            "Run complete: processed {}, failed {}, skipped {}",
            summary.processed, summary.failed, summary.skipped
        );
        for risk in report.duplicate_risks() {
            warn!("Thread published but not marked, may duplicate next run: {} ({})", risk.id, risk.title);
        }

        report
    }

    async fn process_item(&mut self, item: &FeedItem) -> ItemOutcome {
        info!(stage = %Stage::Rewriting, "Processing: {}", item.title);
        let content = match self.transformer.rewrite(item).await {
            Ok(content) => content,
            Err(e) => {
                warn!(stage = %Stage::Rewriting, "Rewrite failed: {}", e);
                return ItemOutcome::Failed {
                    stage: Stage::Rewriting,
                    reason: e.to_string(),
                };
            }
        };

        let document = match &self.emitter {
            Some(emitter) => {
                let slug = derive_slug(&item.link);
                match emitter.emit(&content, &slug, item.published_at).await {
                    Ok(path) => {
                        info!(stage = %Stage::Emitting, "Generated document {}", path.display());
                        Some(path.display().to_string())
                    }
                    Err(e) => {
                        warn!(stage = %Stage::Emitting, "Document not written, continuing: {}", e);
                        None
                    }
                }
            }
            None => None,
        };

        let thread_id = match self.publisher.publish(&content).await {
            Ok(thread_id) => thread_id,
            Err(e) => {
                warn!(stage = %Stage::Publishing, "Publish failed: {}", e);
                return ItemOutcome::Failed {
                    stage: Stage::Publishing,
                    reason: e.to_string(),
                };
            }
        };

        // No retry: a second attempt could only re-publish.
        let record = ProcessedRecord::new(item, thread_id);
        match bounded(self.config.store_timeout, "mark processed", self.dedup.mark(record)).await {
            Ok(()) => {
                info!(stage = %Stage::Marking, "Posted to forum as thread {}", thread_id);
                ItemOutcome::Processed {
                    thread_id,
                    document,
                }
            }
            Err(e) => {
                error!(stage = %Stage::Marking, "Thread {} created but item not marked: {}", thread_id, e);
                ItemOutcome::Unmarked {
                    thread_id,
                    reason: e.to_string(),
                }
            }
        }
    }
}

async fn bounded<T>(
    limit: Duration,
    operation: &'static str,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| PipelineError::Timeout {
            operation,
            after: limit,
        })?
}
