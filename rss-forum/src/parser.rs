use crate::types::{FeedData, FeedItem, PipelineError, Result};
use crate::utils::html;
use chrono::{DateTime, Utc};
use feed_rs::parser;
use std::collections::HashSet;
use tracing::{debug, info};

const UNTITLED: &str = "Geen titel";

pub struct FeedParser;

impl FeedParser {
    /// Parses an RSS/Atom document into feed items.
    ///
    /// Entries without a link are dropped. Entries repeating an identifier already seen
    /// in the same document are collapsed to the first occurrence.
    pub fn parse_feed(content: &str, fetched_at: DateTime<Utc>) -> Result<FeedData> {
        debug!("Parsing feed content ({} bytes)", content.len());

        // Missing guids stay empty so the link fallback below applies.
        let feed = parser::Builder::new()
            .id_generator(|_links, _title, _uri| String::new())
            .build()
            .parse(content.as_bytes())
            .map_err(|e| PipelineError::Parse(format!("Failed to parse feed: {}", e)))?;

        let title = feed.title.map(|t| t.content);
        let description = feed.description.map(|d| d.content);
        let link = feed.links.first().map(|l| l.href.clone());

        let mut seen = HashSet::new();
        let mut items = Vec::new();

        for entry in feed.entries {
            let Some(item) = Self::parse_entry(entry, fetched_at) else {
                continue;
            };
            if !seen.insert(item.id.clone()) {
                debug!("Skipping duplicate entry with id: {}", item.id);
                continue;
            }
            items.push(item);
        }

        info!("Parsed feed with {} entries", items.len());

        Ok(FeedData {
            title,
            description,
            link,
            items,
            fetched_at,
        })
    }

    fn parse_entry(entry: feed_rs::model::Entry, fetched_at: DateTime<Utc>) -> Option<FeedItem> {
        let link = entry.links.first()?.href.trim().to_string();
        if link.is_empty() {
            return None;
        }

        let title = entry
            .title
            .map(|t| t.content.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| UNTITLED.to_string());

        let published_at = entry
            .published
            .or(entry.updated)
            .map(|dt| dt.with_timezone(&Utc));

        // Prefer full content over the summary
        let raw_body = entry
            .content
            .and_then(|c| c.body)
            .or_else(|| entry.summary.map(|s| s.content))
            .unwrap_or_default();

        let categories = entry
            .categories
            .into_iter()
            .map(|c| c.term)
            .filter(|term| !term.trim().is_empty())
            .collect();

        let id = item_id(Some(entry.id.as_str()), &link);

        Some(FeedItem {
            id,
            title,
            link,
            published_at: published_at.unwrap_or(fetched_at),
            body: html::extract_text(&raw_body),
            categories,
        })
    }
}

/// Stable identifier for a feed entry: its guid, else its link. Never random, so an
/// entry missing a guid is tracked under the same identifier on every run. Entries
/// without a link never get here, so the link is always present.
pub fn item_id(guid: Option<&str>, link: &str) -> String {
    guid.map(str::trim)
        .filter(|g| !g.is_empty())
        .unwrap_or_else(|| link.trim())
        .to_string()
}
