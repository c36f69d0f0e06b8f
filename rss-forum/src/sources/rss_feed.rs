use crate::config::FetchConfig;
use crate::fetcher::Fetcher;
use crate::traits::FeedSource;
use crate::types::Result;
use crate::utils::url::extract_domain;
use async_trait::async_trait;
use tracing::info;

/// Live RSS/Atom feed pulled over HTTP
pub struct RssFeedSource {
    pub url: String,
    fetcher: Fetcher,
}

impl RssFeedSource {
    pub fn new(fetch_config: FetchConfig) -> Result<Self> {
        let url = fetch_config.feed_url.clone();
        let fetcher = Fetcher::new(fetch_config)?;
        Ok(Self { url, fetcher })
    }
}

#[async_trait]
impl FeedSource for RssFeedSource {
    fn source_name(&self) -> String {
        match extract_domain(&self.url) {
            Some(domain) => format!("RSS Feed ({})", domain),
            None => "RSS Feed".to_string(),
        }
    }

    async fn fetch_raw(&self) -> Result<String> {
        info!("Pulling RSS feed: {}", self.url);
        self.fetcher.fetch(&self.url).await
    }
}
