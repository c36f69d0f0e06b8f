#![allow(dead_code)]

// Shared fakes for the feed source, rewriting service and stores
use async_trait::async_trait;
use rss_forum::{
    ContentTransformer, DedupStore, FeedCache, FeedReader, FeedSource, ItemId, MemoryStore,
    NewThread, Pipeline, PipelineConfig, PipelineError, ProcessedRecord, Result, RewriteRequest,
    RewriteResponse, RewriteService, SiteConfig, Stores, ThreadId, ThreadStore,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

pub const REWRITE_TIMEOUT: Duration = Duration::from_secs(10);
pub const REWRITE_DELAY: Duration = Duration::from_secs(2);
pub const FEED_TIMEOUT: Duration = Duration::from_secs(15);
pub const CACHE_TTL: Duration = Duration::from_secs(3600);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn item_link(n: usize) -> String {
    format!(
        "https://www.politie.nl/nieuws/2025/oktober/4/{:02}-bericht-nummer-{}.html",
        n, n
    )
}

pub fn rss_item(guid: Option<&str>, title: &str, link: &str) -> String {
    let guid = guid
        .map(|g| format!("<guid isPermaLink=\"false\">{}</guid>", g))
        .unwrap_or_default();
    format!(
        r#"<item>
  <title>{title}</title>
  <link>{link}</link>
  {guid}
  <pubDate>Sat, 04 Oct 2025 08:00:00 +0200</pubDate>
  <description>&lt;p&gt;De politie heeft een man aangehouden. Onderzoek loopt.&lt;/p&gt;</description>
  <category>Noord-Holland</category>
</item>"#
    )
}

pub fn rss_document(items: &[String]) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
<channel>
  <title>Politie Nieuws</title>
  <link>https://www.politie.nl/nieuws</link>
  <description>Nieuws van de politie</description>
  {}
</channel>
</rss>"#,
        items.join("\n")
    )
}

/// Feed with items `politie-1..=n`, in that order.
pub fn numbered_feed(ids: &[usize]) -> String {
    let items: Vec<String> = ids
        .iter()
        .map(|n| {
            rss_item(
                Some(&format!("politie-{}", n)),
                &format!("Bericht {}", n),
                &item_link(*n),
            )
        })
        .collect();
    rss_document(&items)
}

/// Serves a fixed document, counting fetches.
pub struct StaticSource {
    xml: Mutex<String>,
    pub fetches: Arc<AtomicUsize>,
}

impl StaticSource {
    pub fn new(xml: String) -> Self {
        Self {
            xml: Mutex::new(xml),
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl FeedSource for StaticSource {
    fn source_name(&self) -> String {
        "static test feed".to_string()
    }

    async fn fetch_raw(&self) -> Result<String> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.xml.lock().unwrap().clone())
    }
}

/// Serves documents from a shared slot the test can swap between runs.
pub struct SwappableSource {
    pub xml: Arc<Mutex<String>>,
}

#[async_trait]
impl FeedSource for SwappableSource {
    fn source_name(&self) -> String {
        "swappable test feed".to_string()
    }

    async fn fetch_raw(&self) -> Result<String> {
        Ok(self.xml.lock().unwrap().clone())
    }
}

pub struct FailingSource;

#[async_trait]
impl FeedSource for FailingSource {
    fn source_name(&self) -> String {
        "failing test feed".to_string()
    }

    async fn fetch_raw(&self) -> Result<String> {
        Err(PipelineError::Fetch("connection refused".to_string()))
    }
}

pub struct HangingSource;

#[async_trait]
impl FeedSource for HangingSource {
    fn source_name(&self) -> String {
        "hanging test feed".to_string()
    }

    async fn fetch_raw(&self) -> Result<String> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(String::new())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    Echo,
    Hang,
    DropLink,
    Blank,
    Malformed,
}

#[derive(Debug, Clone)]
pub struct RewriteCall {
    pub link: String,
    pub at: Instant,
}

/// Rewriting service whose answer depends on the call index (0-based).
#[derive(Default)]
pub struct ScriptedRewriter {
    script: HashMap<usize, Behaviour>,
    calls: Mutex<Vec<RewriteCall>>,
}

impl ScriptedRewriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_call(mut self, index: usize, behaviour: Behaviour) -> Self {
        self.script.insert(index, behaviour);
        self
    }

    pub fn calls(&self) -> Vec<RewriteCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RewriteService for ScriptedRewriter {
    fn adapter_name(&self) -> String {
        "scripted".to_string()
    }

    async fn rewrite(&self, request: &RewriteRequest) -> Result<RewriteResponse> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(RewriteCall {
                link: request.source_link.clone(),
                at: Instant::now(),
            });
            calls.len() - 1
        };

        match self.script.get(&index).copied().unwrap_or(Behaviour::Echo) {
            Behaviour::Echo => Ok(RewriteResponse {
                title: format!("Discussie: {}", request.title),
                body: format!(
                    "{}\n\nWat vinden jullie?\n\nBron: {}",
                    request.body, request.source_link
                ),
            }),
            Behaviour::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(PipelineError::Rewrite("woke up from hang".to_string()))
            }
            Behaviour::DropLink => Ok(RewriteResponse {
                title: request.title.clone(),
                body: "Tekst zonder bronvermelding.".to_string(),
            }),
            Behaviour::Blank => Ok(RewriteResponse {
                title: "   ".to_string(),
                body: format!("Bron: {}", request.source_link),
            }),
            Behaviour::Malformed => Err(PipelineError::Rewrite("malformed payload".to_string())),
        }
    }
}

/// Memory store with switchable failures.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub fail_lookup: AtomicBool,
    pub fail_mark: AtomicBool,
    pub fail_publish: AtomicBool,
}

impl FlakyStore {
    pub async fn new(category_id: &str) -> Arc<Self> {
        let store = Self::default();
        store.inner.add_category(category_id).await;
        Arc::new(store)
    }
}

#[async_trait]
impl DedupStore for FlakyStore {
    async fn filter_new(&self, ids: &[ItemId]) -> Result<Vec<ItemId>> {
        if self.fail_lookup.load(Ordering::SeqCst) {
            return Err(PipelineError::Store("lookup unavailable".to_string()));
        }
        self.inner.filter_new(ids).await
    }

    async fn mark(&self, record: ProcessedRecord) -> Result<()> {
        if self.fail_mark.load(Ordering::SeqCst) {
            return Err(PipelineError::Store("write rejected".to_string()));
        }
        self.inner.mark(record).await
    }

    async fn processed_ids(&self) -> Result<Vec<ItemId>> {
        self.inner.processed_ids().await
    }
}

#[async_trait]
impl ThreadStore for FlakyStore {
    async fn create_thread(&self, thread: NewThread) -> Result<ThreadId> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(PipelineError::Store("topics unavailable".to_string()));
        }
        self.inner.create_thread(thread).await
    }

    async fn category_topic_count(&self, category_id: &str) -> Result<Option<i64>> {
        self.inner.category_topic_count(category_id).await
    }
}

pub fn pipeline_config(max_items_per_run: usize) -> PipelineConfig {
    PipelineConfig {
        max_items_per_run,
        emit_documents: false,
        ..PipelineConfig::default()
    }
}

pub fn build_pipeline(
    source: Box<dyn FeedSource>,
    stores: Stores,
    rewriter: Arc<dyn RewriteService>,
    site: SiteConfig,
    config: PipelineConfig,
) -> Pipeline {
    let reader = FeedReader::new(source, FeedCache::new(CACHE_TTL), FEED_TIMEOUT);
    let transformer = ContentTransformer::with_limits(rewriter, REWRITE_TIMEOUT, REWRITE_DELAY);
    Pipeline::new(reader, stores, transformer, site, config)
}
