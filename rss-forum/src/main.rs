use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use rss_forum::config::DEFAULT_FEED_URL;
use rss_forum::{
    store, ContentTransformer, FeedCache, FeedReader, FeedSource, FetchConfig, FileFeedSource,
    GroqAdapter, MockLlmAdapter, Pipeline, PipelineConfig, RewriteConfig, RewriteService,
    RssFeedSource, RunReport, SiteConfig, StoreBackend,
};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StoreKind {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RewriterKind {
    Groq,
    Mock,
}

/// Fetch the police news feed, rewrite new items and post them as forum threads.
#[derive(Debug, Parser)]
#[command(name = "rss-forum", version)]
struct Cli {
    /// Upper bound on rewrite calls (and threads) in this run
    #[arg(long, default_value_t = 5)]
    max_items: usize,

    #[arg(long, value_enum, default_value_t = StoreKind::Postgres)]
    store: StoreKind,

    /// Postgres connection string; falls back to DATABASE_URL
    #[arg(long)]
    database_url: Option<String>,

    #[arg(long, default_value = DEFAULT_FEED_URL)]
    feed_url: String,

    /// Read the feed from a local file instead of the network
    #[arg(long)]
    feed_file: Option<PathBuf>,

    /// Persist the feed cache here so it survives between runs
    #[arg(long)]
    cache_file: Option<PathBuf>,

    /// Serve a fresh cached feed instead of always fetching live
    #[arg(long)]
    use_cache: bool,

    #[arg(long, value_enum, default_value_t = RewriterKind::Groq)]
    rewriter: RewriterKind,

    #[arg(long, default_value_t = 10)]
    rewrite_timeout_secs: u64,

    #[arg(long, default_value_t = 2000)]
    rewrite_delay_ms: u64,

    /// Root directory for generated documents
    #[arg(long, default_value = "public")]
    output_dir: PathBuf,

    /// Skip writing the static documents
    #[arg(long)]
    no_documents: bool,

    #[arg(long)]
    base_url: Option<String>,

    /// Print the run report as JSON on stdout
    #[arg(long)]
    json: bool,

    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else if cli.quiet {
            tracing::Level::WARN
        } else {
            tracing::Level::INFO
        })
        .init();

    let json = cli.json;
    let code = match run(cli).await {
        Ok(report) => {
            if json {
                match serde_json::to_string_pretty(&report) {
                    Ok(out) => println!("{}", out),
                    Err(e) => error!("Failed to serialize run report: {}", e),
                }
            }
            report.exit_code()
        }
        Err(e) => {
            error!("{:#}", e);
            2
        }
    };

    std::process::exit(code);
}

async fn run(cli: Cli) -> anyhow::Result<RunReport> {
    info!("Starting RSS-to-forum pipeline");

    let fetch_config = FetchConfig {
        feed_url: cli.feed_url.clone(),
        cache_path: cli.cache_file.clone(),
        ..FetchConfig::default()
    };

    let rewrite_config = RewriteConfig {
        api_key: env::var("GROQ_API_KEY").ok(),
        timeout: Duration::from_secs(cli.rewrite_timeout_secs),
        min_delay: Duration::from_millis(cli.rewrite_delay_ms),
        ..RewriteConfig::default()
    };

    let mut site = SiteConfig {
        output_dir: cli.output_dir.clone(),
        ..SiteConfig::default()
    };
    if let Some(base_url) = cli.base_url.clone() {
        site.base_url = base_url;
    }

    let pipeline_config = PipelineConfig {
        max_items_per_run: cli.max_items,
        force_refresh: !cli.use_cache,
        emit_documents: !cli.no_documents,
        ..PipelineConfig::default()
    };

    let backend = match cli.store {
        StoreKind::Memory => StoreBackend::Memory,
        StoreKind::Postgres => {
            let url = cli
                .database_url
                .clone()
                .or_else(|| env::var("DATABASE_URL").ok())
                .context("--store postgres needs --database-url or DATABASE_URL")?;
            StoreBackend::Postgres { url }
        }
    };

    let service: Arc<dyn RewriteService> = match cli.rewriter {
        RewriterKind::Groq => Arc::new(
            GroqAdapter::new(rewrite_config.clone())
                .context("Get a key at https://console.groq.com/keys and export GROQ_API_KEY")?,
        ),
        RewriterKind::Mock => Arc::new(MockLlmAdapter::new("offline".to_string())),
    };
    info!("Rewriting with {}", service.adapter_name());

    let source: Box<dyn FeedSource> = match &cli.feed_file {
        Some(path) => Box::new(FileFeedSource::new(path.clone())),
        None => Box::new(RssFeedSource::new(fetch_config.clone())?),
    };

    let cache = match &fetch_config.cache_path {
        Some(path) => FeedCache::load(fetch_config.cache_ttl(), path.clone()).await,
        None => FeedCache::new(fetch_config.cache_ttl()),
    };

    if pipeline_config.max_items_per_run == 0 {
        bail!("--max-items must be at least 1");
    }

    let stores = store::open(&backend, &site.default_category_id)
        .await
        .with_context(|| format!("Failed to open store {}", backend.describe()))?;

    let reader = FeedReader::new(source, cache, fetch_config.timeout());
    let transformer = ContentTransformer::new(service, &rewrite_config);
    let mut pipeline = Pipeline::new(reader, stores, transformer, site, pipeline_config);

    let report = pipeline.run().await;
    let summary = report.summary;

    if summary.processed > 0 {
        info!("Successfully processed {} items", summary.processed);
    } else if summary.failed > 0 {
        info!("{} items failed to process", summary.failed);
    } else {
        info!("No new items to process");
    }

    Ok(report)
}
