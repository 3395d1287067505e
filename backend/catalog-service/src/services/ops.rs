//! Operator-triggered catalog operations.
//!
//! Each operation runs synchronously end to end — rebuild, cascade, audit —
//! and hands the structured outcome back to the caller, so the operator who
//! clicked the button sees exactly what happened, including per-tier cache
//! results. A trace id ties the HTTP response to the audit entry.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use sqlx::PgPool;
use tracing::{info, warn};
use upstream_client::UpstreamApi;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::cache::CacheCascade;
use crate::db::{activity_repo, playlist_repo, video_repo};
use crate::error::{AppError, Result};
use crate::models::{ActivityDetails, CascadeOutcome, RebuildReport, SyncStrategy};
use crate::services::lease::LeaseManager;
use crate::services::rebuilder::{PlaylistRebuilder, SyncAttempt};
use crate::services::strategy::select_strategy;

#[derive(Debug, Serialize, ToSchema)]
pub struct PlaylistSyncOutcome {
    pub trace_id: Uuid,
    pub playlist_id: Uuid,
    pub slug: String,
    pub strategy: SyncStrategy,
    pub report: RebuildReport,
    pub cascade: CascadeOutcome,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VideoFixOutcome {
    pub trace_id: Uuid,
    pub remote_id: String,
    /// True when the platform no longer served the video and it was
    /// deactivated locally instead of refreshed.
    pub deactivated: bool,
    pub playlists_rebuilt: u32,
    pub cascade: CascadeOutcome,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VideoPurgeOutcome {
    pub trace_id: Uuid,
    pub remote_id: String,
    pub playlists_touched: u32,
    pub cascade: CascadeOutcome,
}

#[derive(Clone)]
pub struct AdminOps {
    pool: PgPool,
    upstream: Arc<dyn UpstreamApi>,
    lease: LeaseManager,
    rebuilder: PlaylistRebuilder,
    cascade: Arc<CacheCascade>,
    full_recount_days: i64,
    max_pages: u32,
}

impl AdminOps {
    pub fn new(
        pool: PgPool,
        upstream: Arc<dyn UpstreamApi>,
        lease: LeaseManager,
        rebuilder: PlaylistRebuilder,
        cascade: Arc<CacheCascade>,
        full_recount_days: i64,
        max_pages: u32,
    ) -> Self {
        Self {
            pool,
            upstream,
            lease,
            rebuilder,
            cascade,
            full_recount_days,
            max_pages,
        }
    }

    /// Strategy → rebuild → cascade for one playlist.
    pub async fn sync_playlist(
        &self,
        playlist_id: Uuid,
        force: bool,
        actor: &str,
    ) -> Result<PlaylistSyncOutcome> {
        let trace_id = Uuid::new_v4();
        let playlist = playlist_repo::find_by_id(&self.pool, playlist_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("playlist {}", playlist_id)))?;

        let strategy = select_strategy(&playlist, force, Utc::now(), self.full_recount_days);
        info!(
            playlist = %playlist.slug,
            strategy = %strategy,
            force,
            trace_id = %trace_id,
            "manual playlist sync requested"
        );

        let report = match self
            .rebuilder
            .rebuild_under_lease(&self.lease, &playlist, strategy, None)
            .await
        {
            SyncAttempt::Completed(report) => report,
            SyncAttempt::LeaseHeld => return Err(AppError::LeaseHeld(playlist.slug)),
            SyncAttempt::Failed(err) => return Err(err),
        };

        let cascade = self.cascade.run(None, &[playlist.slug.clone()]).await;

        self.audit(
            actor,
            &ActivityDetails::PlaylistSynced {
                playlist_id: playlist.id,
                slug: playlist.slug.clone(),
                report: report.clone(),
                cascade: Some(cascade.clone()),
            },
            trace_id,
        )
        .await;

        Ok(PlaylistSyncOutcome {
            trace_id,
            playlist_id: playlist.id,
            slug: playlist.slug,
            strategy,
            report,
            cascade,
        })
    }

    /// Re-fetch one video's metadata and reconcile its memberships.
    ///
    /// When the platform still serves the video, its metadata is refreshed
    /// and every active playlist whose remote listing contains it — or that
    /// still links it locally — is rebuilt from that listing. Checking the
    /// remote side is what repairs the common broken state: a video missing
    /// from a playlist it should be in, which no local membership row points
    /// at. When the platform no longer serves the video, it is deactivated
    /// and pulled out of every playlist.
    pub async fn fix_video(&self, remote_id: &str, actor: &str) -> Result<VideoFixOutcome> {
        let trace_id = Uuid::new_v4();
        let fetched = self.upstream.fetch_video(remote_id).await?;
        let stored = video_repo::find_by_remote_id(&self.pool, remote_id).await?;

        if fetched.is_none() && stored.is_none() {
            return Err(AppError::NotFound(format!("video {}", remote_id)));
        }

        let mut deactivated = false;
        let mut playlists_rebuilt = 0u32;
        let mut affected: Vec<String> = Vec::new();

        match (&fetched, &stored) {
            (Some(item), _) => {
                let video_id = video_repo::upsert_remote_item(&self.pool, item).await?;
                let linked: HashSet<Uuid> = playlist_repo::containing_video(&self.pool, video_id)
                    .await?
                    .into_iter()
                    .map(|p| p.id)
                    .collect();

                for playlist in playlist_repo::list_active(&self.pool).await? {
                    let listing = match self
                        .upstream
                        .list_all(&playlist.remote_id, self.max_pages)
                        .await
                    {
                        Ok(listing) => listing,
                        Err(err) => {
                            warn!(
                                playlist = %playlist.slug,
                                error = %err,
                                "fix-video listing fetch failed, skipping playlist"
                            );
                            continue;
                        }
                    };

                    let in_remote = listing.items.iter().any(|i| i.id == remote_id);
                    if !in_remote && !linked.contains(&playlist.id) {
                        continue;
                    }

                    // The listing was just fetched; apply it instead of
                    // enumerating again inside the rebuild.
                    match self
                        .rebuilder
                        .apply_listing_under_lease(&self.lease, &playlist, &listing, None)
                        .await
                    {
                        SyncAttempt::Completed(_) => playlists_rebuilt += 1,
                        SyncAttempt::LeaseHeld => {
                            info!(playlist = %playlist.slug, "fix-video rebuild skipped, lease held")
                        }
                        SyncAttempt::Failed(err) => {
                            warn!(playlist = %playlist.slug, error = %err, "fix-video rebuild failed")
                        }
                    }
                    affected.push(playlist.slug);
                }
            }
            (None, Some(video)) => {
                // Capture memberships before tearing them down; the cascade
                // still needs those slugs.
                affected = playlist_repo::containing_video(&self.pool, video.id)
                    .await?
                    .into_iter()
                    .map(|p| p.slug)
                    .collect();
                video_repo::deactivate(&self.pool, video.id).await?;
                video_repo::remove_all_memberships(&self.pool, video.id).await?;
                deactivated = true;
                info!(remote_id, trace_id = %trace_id, "video gone upstream, deactivated locally");
            }
            (None, None) => unreachable!("handled above"),
        }

        let cascade = self.cascade.run(Some(remote_id), &affected).await;

        self.audit(
            actor,
            &ActivityDetails::VideoFixed {
                remote_id: remote_id.to_string(),
                deactivated,
                playlists_rebuilt,
                cascade: cascade.clone(),
            },
            trace_id,
        )
        .await;

        Ok(VideoFixOutcome {
            trace_id,
            remote_id: remote_id.to_string(),
            deactivated,
            playlists_rebuilt,
            cascade,
        })
    }

    /// Hard-delete a video and its membership rows.
    ///
    /// Stored playlist counts are deliberately left alone; they converge on
    /// the next rebuild or verification pass.
    pub async fn purge_video(&self, remote_id: &str, actor: &str) -> Result<VideoPurgeOutcome> {
        let trace_id = Uuid::new_v4();
        let video = video_repo::find_by_remote_id(&self.pool, remote_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("video {}", remote_id)))?;

        let playlists = playlist_repo::containing_video(&self.pool, video.id).await?;
        video_repo::purge(&self.pool, video.id).await?;
        info!(
            remote_id,
            playlists = playlists.len(),
            trace_id = %trace_id,
            "video purged from catalog"
        );

        let slugs: Vec<String> = playlists.iter().map(|p| p.slug.clone()).collect();
        let cascade = self.cascade.run(Some(remote_id), &slugs).await;

        self.audit(
            actor,
            &ActivityDetails::VideoPurged {
                remote_id: remote_id.to_string(),
                playlists_touched: playlists.len() as u32,
                cascade: cascade.clone(),
            },
            trace_id,
        )
        .await;

        Ok(VideoPurgeOutcome {
            trace_id,
            remote_id: remote_id.to_string(),
            playlists_touched: playlists.len() as u32,
            cascade,
        })
    }

    /// Audit writes never fail the operation they describe.
    async fn audit(&self, actor: &str, details: &ActivityDetails, trace_id: Uuid) {
        if let Err(err) = activity_repo::append(&self.pool, actor, details, trace_id).await {
            warn!(error = %err, trace_id = %trace_id, "audit write failed");
        }
    }
}
