use crate::types::{FeedData, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Last successfully parsed feed plus its freshness window.
///
/// Optionally mirrored to a JSON file so the window spans separate invocations.
pub struct FeedCache {
    ttl: Duration,
    entry: Option<FeedData>,
    path: Option<PathBuf>,
}

impl FeedCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: None,
            path: None,
        }
    }

    /// Cache backed by `path`. A missing or unreadable file yields an empty cache.
    pub async fn load(ttl: Duration, path: PathBuf) -> Self {
        let entry = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<FeedData>(&bytes) {
                Ok(data) => {
                    debug!("Loaded cached feed from {} (fetched {})", path.display(), data.fetched_at);
                    Some(data)
                }
                Err(e) => {
                    warn!("Ignoring unreadable feed cache {}: {}", path.display(), e);
                    None
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!("Ignoring feed cache {}: {}", path.display(), e);
                None
            }
        };

        Self {
            ttl,
            entry,
            path: Some(path),
        }
    }

    pub fn last_fetched(&self) -> Option<DateTime<Utc>> {
        self.entry.as_ref().map(|data| data.fetched_at)
    }

    /// The cached copy if it was fetched within the TTL before `now`.
    pub fn fresh_at(&self, now: DateTime<Utc>) -> Option<&FeedData> {
        let data = self.entry.as_ref()?;
        let age = now.signed_duration_since(data.fetched_at).to_std().ok()?;
        (age <= self.ttl).then_some(data)
    }

    pub fn fresh(&self) -> Option<&FeedData> {
        self.fresh_at(Utc::now())
    }

    /// Replaces the cached copy. Persisting is best-effort; the in-memory copy always updates.
    pub async fn store(&mut self, data: FeedData) {
        if let Some(path) = &self.path {
            if let Err(e) = persist(path, &data).await {
                warn!("Failed to persist feed cache to {}: {}", path.display(), e);
            }
        }
        self.entry = Some(data);
    }
}

async fn persist(path: &Path, data: &FeedData) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_vec_pretty(data)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}
