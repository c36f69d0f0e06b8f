use crate::traits::FeedSource;
use crate::types::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

/// Feed document read from a local file, for offline runs.
pub struct FileFeedSource {
    path: PathBuf,
}

impl FileFeedSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl FeedSource for FileFeedSource {
    fn source_name(&self) -> String {
        format!("Feed file ({})", self.path.display())
    }

    async fn fetch_raw(&self) -> Result<String> {
        debug!("Reading feed file: {}", self.path.display());
        Ok(tokio::fs::read_to_string(&self.path).await?)
    }
}
