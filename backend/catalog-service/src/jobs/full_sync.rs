//! Catalog-wide full resync.
//!
//! The blunt instrument: every active playlist gets a full rebuild in one
//! run. Kept for operator use after incidents (credential rotation, bulk
//! upstream changes) where per-playlist freshness tracking cannot be
//! trusted. The `sync_status` row single-flights the whole operation: a
//! second trigger while one runs is rejected, and a run whose marker is
//! older than the staleness window is presumed crashed and taken over.

use std::sync::Arc;
use std::time::Instant;

use chrono::{Duration, Utc};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::cache::CacheCascade;
use crate::db::{activity_repo, playlist_repo, sync_status_repo};
use crate::error::{AppError, Result};
use crate::metrics::sync::SYNC_JOB_DURATION_SECONDS;
use crate::models::{ActivityDetails, FullSyncReport, SyncStrategy};
use crate::services::lease::LeaseManager;
use crate::services::rebuilder::{PlaylistRebuilder, SyncAttempt};

#[derive(Clone)]
pub struct FullSyncJob {
    pool: PgPool,
    lease: LeaseManager,
    rebuilder: PlaylistRebuilder,
    cascade: Arc<CacheCascade>,
    status_stale_secs: u64,
}

impl FullSyncJob {
    pub fn new(
        pool: PgPool,
        lease: LeaseManager,
        rebuilder: PlaylistRebuilder,
        cascade: Arc<CacheCascade>,
        status_stale_secs: u64,
    ) -> Self {
        Self {
            pool,
            lease,
            rebuilder,
            cascade,
            status_stale_secs,
        }
    }

    pub async fn run(&self, actor: &str, trace_id: Uuid) -> Result<FullSyncReport> {
        let started = Instant::now();

        let stale_before = Utc::now() - Duration::seconds(self.status_stale_secs as i64);
        if !sync_status_repo::try_begin(&self.pool, stale_before).await? {
            return Err(AppError::SyncInProgress);
        }

        let result = self.run_inner(actor, trace_id, started).await;

        SYNC_JOB_DURATION_SECONDS
            .with_label_values(&["full_sync"])
            .observe(started.elapsed().as_secs_f64());

        match result {
            Ok(report) => {
                sync_status_repo::finish(&self.pool, None).await?;
                activity_repo::append(
                    &self.pool,
                    actor,
                    &ActivityDetails::FullSyncCompleted {
                        report: report.clone(),
                    },
                    trace_id,
                )
                .await?;
                Ok(report)
            }
            Err(err) => {
                let message = err.to_string();
                // Release the slot even on failure or every later run gets
                // rejected until the staleness window expires.
                if let Err(finish_err) = sync_status_repo::finish(&self.pool, Some(&message)).await
                {
                    warn!(error = %finish_err, "failed to release sync status after error");
                }
                if let Err(audit_err) = activity_repo::append(
                    &self.pool,
                    actor,
                    &ActivityDetails::FullSyncFailed {
                        error: message.clone(),
                    },
                    trace_id,
                )
                .await
                {
                    warn!(error = %audit_err, "failed to record full sync failure");
                }
                Err(err)
            }
        }
    }

    async fn run_inner(
        &self,
        actor: &str,
        trace_id: Uuid,
        started: Instant,
    ) -> Result<FullSyncReport> {
        let playlists = playlist_repo::list_active(&self.pool).await?;

        activity_repo::append(
            &self.pool,
            actor,
            &ActivityDetails::FullSyncStarted {
                playlists: playlists.len() as u32,
            },
            trace_id,
        )
        .await?;

        info!(trace_id = %trace_id, playlists = playlists.len(), "full catalog sync started");

        let mut rebuilt = 0u32;
        let mut skipped_lease = 0u32;
        let mut failures = 0u32;
        let mut added = 0u32;
        let mut updated = 0u32;
        let mut removed = 0u32;
        let mut invalidated: Vec<String> = Vec::new();

        for playlist in &playlists {
            sync_status_repo::set_current_playlist(&self.pool, Some(playlist.id)).await?;

            match self
                .rebuilder
                .rebuild_under_lease(&self.lease, playlist, SyncStrategy::Full, None)
                .await
            {
                SyncAttempt::Completed(report) => {
                    rebuilt += 1;
                    added += report.added;
                    updated += report.updated;
                    removed += report.removed;
                    invalidated.push(playlist.slug.clone());
                }
                SyncAttempt::LeaseHeld => {
                    info!(playlist = %playlist.slug, "lease held elsewhere, skipping");
                    skipped_lease += 1;
                }
                SyncAttempt::Failed(err) => {
                    if matches!(err, AppError::Config(_)) {
                        return Err(err);
                    }
                    failures += 1;
                }
            }
        }

        sync_status_repo::set_current_playlist(&self.pool, None).await?;

        let cascade = if invalidated.is_empty() {
            None
        } else {
            Some(self.cascade.run(None, &invalidated).await)
        };

        let report = FullSyncReport {
            playlists: playlists.len() as u32,
            rebuilt,
            skipped_lease,
            failures,
            added,
            updated,
            removed,
            cascade,
            duration_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            trace_id = %trace_id,
            rebuilt = report.rebuilt,
            skipped_lease = report.skipped_lease,
            failures = report.failures,
            added = report.added,
            removed = report.removed,
            "full catalog sync finished"
        );

        Ok(report)
    }
}
