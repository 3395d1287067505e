/// Append-only audit log model
///
/// Every sync completion, failure, and manual admin trigger lands here. The
/// `details` column is the serialized form of [`ActivityDetails`], a tagged
/// union with one variant per operation shape, so entries are type-checked
/// where they are written and rendered by enum dispatch rather than by
/// matching on loose JSON.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{
    CascadeOutcome, FullSyncReport, IdleReport, RebuildReport, SweepReport, VerificationReport,
};

/// One audit row as stored. Never mutated after insert.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActivityLog {
    pub id: Uuid,
    pub actor: String,
    pub action: String,
    pub details: serde_json::Value,
    pub trace_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Action kinds, stored as strings for indexed filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityAction {
    FeedSweep,
    IdleProbe,
    FullSyncStarted,
    FullSyncCompleted,
    FullSyncFailed,
    PlaylistSynced,
    VideoFixed,
    VideoPurged,
    VerificationCompleted,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::FeedSweep => "feed_sweep",
            ActivityAction::IdleProbe => "idle_probe",
            ActivityAction::FullSyncStarted => "full_sync_started",
            ActivityAction::FullSyncCompleted => "full_sync_completed",
            ActivityAction::FullSyncFailed => "full_sync_failed",
            ActivityAction::PlaylistSynced => "playlist_synced",
            ActivityAction::VideoFixed => "video_fixed",
            ActivityAction::VideoPurged => "video_purged",
            ActivityAction::VerificationCompleted => "verification_completed",
        }
    }
}

/// Typed payload of one audit entry.
///
/// The serde tag doubles as the stored `action` column; see
/// [`ActivityDetails::action`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActivityDetails {
    FeedSweep {
        report: SweepReport,
    },
    IdleProbe {
        report: IdleReport,
    },
    FullSyncStarted {
        playlists: u32,
    },
    FullSyncCompleted {
        report: FullSyncReport,
    },
    FullSyncFailed {
        error: String,
    },
    PlaylistSynced {
        playlist_id: Uuid,
        slug: String,
        report: RebuildReport,
        cascade: Option<CascadeOutcome>,
    },
    VideoFixed {
        remote_id: String,
        deactivated: bool,
        playlists_rebuilt: u32,
        cascade: CascadeOutcome,
    },
    VideoPurged {
        remote_id: String,
        playlists_touched: u32,
        cascade: CascadeOutcome,
    },
    VerificationCompleted {
        report: VerificationReport,
    },
}

impl ActivityDetails {
    pub fn action(&self) -> ActivityAction {
        match self {
            ActivityDetails::FeedSweep { .. } => ActivityAction::FeedSweep,
            ActivityDetails::IdleProbe { .. } => ActivityAction::IdleProbe,
            ActivityDetails::FullSyncStarted { .. } => ActivityAction::FullSyncStarted,
            ActivityDetails::FullSyncCompleted { .. } => ActivityAction::FullSyncCompleted,
            ActivityDetails::FullSyncFailed { .. } => ActivityAction::FullSyncFailed,
            ActivityDetails::PlaylistSynced { .. } => ActivityAction::PlaylistSynced,
            ActivityDetails::VideoFixed { .. } => ActivityAction::VideoFixed,
            ActivityDetails::VideoPurged { .. } => ActivityAction::VideoPurged,
            ActivityDetails::VerificationCompleted { .. } => ActivityAction::VerificationCompleted,
        }
    }

    /// One dashboard line per entry; one arm per variant.
    pub fn summary(&self) -> String {
        match self {
            ActivityDetails::FeedSweep { report } => format!(
                "Feed sweep checked {} playlists: {} changed, {} rebuilt, {} lease-skipped, {} failed",
                report.checked, report.changed, report.rebuilt, report.skipped_lease, report.failures
            ),
            ActivityDetails::IdleProbe { report } => match (&report.probed, report.fingerprint_changed) {
                (None, _) => "Idle probe found no eligible playlist".to_string(),
                (Some(slug), false) => format!("Idle probe left '{}' untouched (fingerprint unchanged)", slug),
                (Some(slug), true) if report.rebuilt => {
                    format!("Idle probe caught a change in '{}' and rebuilt it", slug)
                }
                (Some(slug), true) if report.skipped_lease => {
                    format!("Idle probe caught a change in '{}' but the lease was held", slug)
                }
                (Some(slug), true) => {
                    format!("Idle probe caught a change in '{}' but the rebuild failed", slug)
                }
            },
            ActivityDetails::FullSyncStarted { playlists } => {
                format!("Full catalog sync started over {} playlists", playlists)
            }
            ActivityDetails::FullSyncCompleted { report } => format!(
                "Full catalog sync rebuilt {}/{} playlists (+{} ~{} -{}, {} failed)",
                report.rebuilt, report.playlists, report.added, report.updated, report.removed,
                report.failures
            ),
            ActivityDetails::FullSyncFailed { error } => {
                format!("Full catalog sync failed: {}", error)
            }
            ActivityDetails::PlaylistSynced { slug, report, .. } => format!(
                "Playlist '{}' synced ({}): +{} ~{} -{}, {} items",
                slug, report.strategy, report.added, report.updated, report.removed,
                report.item_count
            ),
            ActivityDetails::VideoFixed { remote_id, deactivated, playlists_rebuilt, .. } => {
                if *deactivated {
                    format!("Video {} is gone upstream; deactivated locally", remote_id)
                } else {
                    format!(
                        "Video {} metadata refreshed, {} playlists rebuilt",
                        remote_id, playlists_rebuilt
                    )
                }
            }
            ActivityDetails::VideoPurged { remote_id, playlists_touched, .. } => format!(
                "Video {} purged from the catalog ({} playlists touched)",
                remote_id, playlists_touched
            ),
            ActivityDetails::VerificationCompleted { report } => format!(
                "Verification checked {} playlists: {} counts corrected, {} skipped (truncated), {} failed",
                report.checked, report.corrected, report.skipped_truncated, report.failures
            ),
        }
    }
}

/// Dashboard-facing view of one audit row.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityEntry {
    pub id: Uuid,
    pub actor: String,
    pub action: String,
    pub summary: String,
    pub details: serde_json::Value,
    pub trace_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<ActivityLog> for ActivityEntry {
    fn from(row: ActivityLog) -> Self {
        let summary = match serde_json::from_value::<ActivityDetails>(row.details.clone()) {
            Ok(details) => details.summary(),
            // Rows written before a variant existed still render.
            Err(_) => format!("{} (unrecognized details)", row.action),
        };
        Self {
            id: row.id,
            actor: row.actor,
            action: row.action,
            summary,
            details: row.details,
            trace_id: row.trace_id,
            created_at: row.created_at,
        }
    }
}
