/// Data structures for the catalog engine
///
/// Row structs mirror the migration schema; DTOs shape what handlers return.
/// Report types are the structured results every sync path hands back to its
/// trigger (and into the activity log).
pub mod activity;

pub use activity::{ActivityAction, ActivityDetails, ActivityEntry, ActivityLog};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// A tracked remote playlist.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Playlist {
    pub id: Uuid,
    pub remote_id: String,
    pub title: String,
    pub slug: String,
    /// Validators captured at the last successful full rebuild.
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    /// Hex SHA-256 over the ordered remote item-id list.
    pub fingerprint: Option<String>,
    pub fingerprint_checked_at: Option<DateTime<Utc>>,
    pub item_count: i32,
    pub lease_owner: Option<String>,
    pub lease_expires_at: Option<DateTime<Utc>>,
    pub last_full_count_at: Option<DateTime<Utc>>,
    pub count_verified: bool,
    pub incremental_runs: i32,
    pub is_featured: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A video known to the local catalog.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Video {
    pub id: Uuid,
    pub remote_id: String,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub duration_seconds: Option<i32>,
    pub view_count: i64,
    pub like_count: i64,
    pub published_at: DateTime<Utc>,
    pub is_active: bool,
    /// Incremented on every metadata refresh.
    pub sync_version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-feed validator state, one row per feed URL.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SyncStateRow {
    pub feed_url: String,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub last_status: Option<i16>,
    pub checked_at: DateTime<Utc>,
}

/// The single-row single-flight guard for the legacy full sync.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SyncStatusRow {
    pub id: bool,
    pub is_syncing: bool,
    pub current_playlist_id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// Homepage content configuration (single row, admin-managed).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SiteSettings {
    pub id: bool,
    pub pinned_video_id: Option<Uuid>,
    pub featured_playlist_id: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

/// Rebuild strategy chosen per playlist at trigger time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SyncStrategy {
    /// Complete paginated re-enumeration; authoritative count.
    Full,
    /// First-page-only top-up; adds items, never detects removals.
    Smart,
}

impl SyncStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStrategy::Full => "full",
            SyncStrategy::Smart => "smart",
        }
    }
}

impl std::fmt::Display for SyncStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// === API DTOs ===

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlaylistSummary {
    pub id: Uuid,
    pub remote_id: String,
    pub title: String,
    pub slug: String,
    pub item_count: i32,
    pub count_verified: bool,
    pub is_featured: bool,
    pub last_full_count_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl From<Playlist> for PlaylistSummary {
    fn from(playlist: Playlist) -> Self {
        Self {
            id: playlist.id,
            remote_id: playlist.remote_id,
            title: playlist.title,
            slug: playlist.slug,
            item_count: playlist.item_count,
            count_verified: playlist.count_verified,
            is_featured: playlist.is_featured,
            last_full_count_at: playlist.last_full_count_at,
            updated_at: playlist.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VideoSummary {
    pub id: Uuid,
    pub remote_id: String,
    pub title: String,
    pub thumbnail_url: Option<String>,
    pub duration_seconds: Option<i32>,
    pub view_count: i64,
    pub published_at: DateTime<Utc>,
}

impl From<Video> for VideoSummary {
    fn from(video: Video) -> Self {
        Self {
            id: video.id,
            remote_id: video.remote_id,
            title: video.title,
            thumbnail_url: video.thumbnail_url,
            duration_seconds: video.duration_seconds,
            view_count: video.view_count,
            published_at: video.published_at,
        }
    }
}

/// Composed homepage listing with a label naming which fill stages ran.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HomepageFeed {
    pub source: String,
    pub videos: Vec<VideoSummary>,
}

// === Structured operation results ===

/// Per-tier result of one cache invalidation cascade.
///
/// Tiers fail independently; this is a report, never an error.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CascadeOutcome {
    pub lru_cleared: bool,
    pub cdn_purged: bool,
    pub pages_revalidated: bool,
    pub total_duration_ms: u64,
}

impl CascadeOutcome {
    pub fn all_succeeded(&self) -> bool {
        self.lru_cleared && self.cdn_purged && self.pages_revalidated
    }
}

/// Result of one playlist rebuild while holding the lease.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RebuildReport {
    pub strategy: SyncStrategy,
    pub added: u32,
    pub updated: u32,
    pub removed: u32,
    pub item_count: i32,
    pub fingerprint_changed: bool,
    /// True when the enumeration hit the page cap.
    pub truncated: bool,
    pub duration_ms: u64,
    /// Per-item failures, collected rather than thrown.
    pub item_errors: Vec<String>,
}

/// Result of one change-detector sweep.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SweepReport {
    pub checked: u32,
    pub changed: u32,
    pub rebuilt: u32,
    pub skipped_lease: u32,
    pub failures: u32,
    pub playlists_invalidated: Vec<String>,
    pub cascade: Option<CascadeOutcome>,
    pub duration_ms: u64,
}

/// Result of one idle fingerprint probe.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IdleReport {
    /// Slug of the probed playlist; `None` when nothing was eligible.
    pub probed: Option<String>,
    pub fingerprint_changed: bool,
    pub rebuilt: bool,
    pub skipped_lease: bool,
    pub cascade: Option<CascadeOutcome>,
    pub duration_ms: u64,
}

/// One count correction written by the verification job.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CountCorrection {
    pub playlist_id: Uuid,
    pub slug: String,
    pub stored: i32,
    pub authoritative: i32,
}

/// One per-playlist failure inside a batch run.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlaylistSyncError {
    pub playlist_id: Uuid,
    pub slug: String,
    pub error: String,
}

/// Result of one verification pass over all active playlists.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VerificationReport {
    pub checked: u32,
    pub corrected: u32,
    pub skipped_truncated: u32,
    /// Drifted playlists left to the worker already holding their lease.
    pub skipped_lease: u32,
    pub failures: u32,
    pub corrections: Vec<CountCorrection>,
    pub errors: Vec<PlaylistSyncError>,
    pub cascade: Option<CascadeOutcome>,
    pub duration_ms: u64,
}

/// Result of one legacy catalog-wide full sync.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FullSyncReport {
    pub playlists: u32,
    pub rebuilt: u32,
    pub skipped_lease: u32,
    pub failures: u32,
    pub added: u32,
    pub updated: u32,
    pub removed: u32,
    pub cascade: Option<CascadeOutcome>,
    pub duration_ms: u64,
}
