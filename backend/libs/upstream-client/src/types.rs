use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque conditional-fetch tokens for one feed.
///
/// Both fields are stored and replayed verbatim; the client never inspects
/// their contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedValidators {
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

impl FeedValidators {
    pub fn new(etag: Option<String>, last_modified: Option<String>) -> Self {
        Self {
            etag,
            last_modified,
        }
    }

    /// No validators stored yet; a conditional request cannot be formed.
    pub fn is_empty(&self) -> bool {
        self.etag.is_none() && self.last_modified.is_none()
    }
}

/// Outcome of one conditional feed fetch.
#[derive(Debug, Clone)]
pub struct FeedCheck {
    /// False only on an authoritative `304 Not Modified`.
    pub changed: bool,
    /// HTTP status of the response (200 or 304).
    pub status: u16,
    /// Validators to persist for the next check.
    pub validators: FeedValidators,
    /// Entry ids present in the feed body; empty on 304.
    pub entry_ids: Vec<String>,
}

/// One video as the platform reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub duration_seconds: Option<i32>,
    #[serde(default)]
    pub view_count: i64,
    #[serde(default)]
    pub like_count: i64,
    pub published_at: DateTime<Utc>,
}

/// One page of a playlist's item list.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemPage {
    pub items: Vec<RemoteItem>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// A fully paginated item list.
#[derive(Debug, Clone)]
pub struct ItemListing {
    /// Items in the platform's order.
    pub items: Vec<RemoteItem>,
    pub pages_fetched: u32,
    /// True when the page cap stopped pagination before the list was
    /// exhausted; `items` is then a prefix, not the full list.
    pub truncated: bool,
}

impl ItemListing {
    /// Item ids in listing order.
    pub fn ids(&self) -> Vec<&str> {
        self.items.iter().map(|item| item.id.as_str()).collect()
    }
}

/// Feed body shape: `{"playlist_id": "...", "entries": [{"id": "..."}]}`.
#[derive(Debug, Deserialize)]
pub(crate) struct FeedDocument {
    #[serde(default)]
    pub entries: Vec<FeedEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FeedEntry {
    pub id: String,
}
