use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_FEED_URL: &str = "https://rss.politie.nl/rss/algemeen/ab/algemeen.xml";
pub const DEFAULT_REWRITE_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_REWRITE_MODEL: &str = "llama-3.3-70b-versatile";

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub feed_url: String,
    pub user_agent: String,
    /// Hard bound on one fetch, retries included.
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
    pub max_feed_size_mb: usize,
    pub max_redirects: usize,
    /// How long a cached copy may stand in for a live fetch.
    pub cache_ttl_seconds: u64,
    pub cache_path: Option<PathBuf>,
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            user_agent: "RSS-Forum/1.0".to_string(),
            timeout_seconds: 15,
            max_retries: 1,
            retry_delay_seconds: 2,
            max_feed_size_mb: 10,
            max_redirects: 5,
            cache_ttl_seconds: 3600,
            cache_path: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RewriteConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
    /// Minimum spacing between the starts of two successive rewrite calls.
    pub min_delay: Duration,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_REWRITE_ENDPOINT.to_string(),
            model: DEFAULT_REWRITE_MODEL.to_string(),
            api_key: None,
            temperature: 0.7,
            max_tokens: 1024,
            timeout: Duration::from_secs(10),
            min_delay: Duration::from_secs(2),
        }
    }
}

/// Site identity used by the publisher and the document emitter.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub base_url: String,
    pub site_name: String,
    pub locale: String,
    pub bot_user_id: String,
    pub bot_user_name: String,
    pub default_category_id: String,
    pub output_dir: PathBuf,
}

impl SiteConfig {
    pub fn document_url(&self, slug: &str) -> String {
        format!("{}/forum/{}/", self.base_url.trim_end_matches('/'), slug)
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://politie-forum.nl".to_string(),
            site_name: "Politie Forum Nederland".to_string(),
            locale: "nl-NL".to_string(),
            bot_user_id: "rss-bot".to_string(),
            bot_user_name: "Politie Nieuws Bot".to_string(),
            default_category_id: "cat1".to_string(),
            output_dir: PathBuf::from("public"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub max_items_per_run: usize,
    pub force_refresh: bool,
    pub emit_documents: bool,
    /// Bound on every dedup/thread store call.
    pub store_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_items_per_run: 5,
            force_refresh: true,
            emit_documents: true,
            store_timeout: Duration::from_secs(10),
        }
    }
}

/// Which persistence adapter backs the dedup and thread stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Postgres { url: String },
}

impl StoreBackend {
    /// Connection string with the password masked, for logs.
    pub fn describe(&self) -> String {
        match self {
            Self::Memory => "memory".to_string(),
            Self::Postgres { url } => match url::Url::parse(url) {
                Ok(mut parsed) => {
                    if parsed.password().is_some() {
                        let _ = parsed.set_password(Some("***"));
                    }
                    parsed.to_string()
                }
                Err(_) => "postgres (unparseable url)".to_string(),
            },
        }
    }
}
