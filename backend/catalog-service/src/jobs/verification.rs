//! Drift verification over stored item counts.
//!
//! Smart syncs see additions only, so `item_count` accumulates error
//! between full recounts. This job re-enumerates every active playlist and,
//! where the relative drift exceeds the configured ratio, applies the
//! enumeration through the same lease-guarded rebuild that every other sync
//! path uses — membership, count and fingerprint move together, and the
//! corrected playlists get one cache cascade at the end. Single-item noise
//! stays below the threshold and writes nothing.

use std::sync::Arc;
use std::time::Instant;

use sqlx::PgPool;
use tracing::{info, warn};
use upstream_client::{UpstreamApi, UpstreamError};
use uuid::Uuid;

use crate::cache::CacheCascade;
use crate::db::{activity_repo, playlist_repo};
use crate::error::Result;
use crate::metrics::sync::{SYNC_JOB_DURATION_SECONDS, VERIFICATION_CORRECTIONS_TOTAL};
use crate::models::{ActivityDetails, CountCorrection, PlaylistSyncError, VerificationReport};
use crate::services::lease::LeaseManager;
use crate::services::rebuilder::{PlaylistRebuilder, SyncAttempt};

#[derive(Clone)]
pub struct VerificationJob {
    pool: PgPool,
    upstream: Arc<dyn UpstreamApi>,
    lease: LeaseManager,
    rebuilder: PlaylistRebuilder,
    cascade: Arc<CacheCascade>,
    verify_max_pages: u32,
    drift_ratio: f64,
}

impl VerificationJob {
    pub fn new(
        pool: PgPool,
        upstream: Arc<dyn UpstreamApi>,
        lease: LeaseManager,
        rebuilder: PlaylistRebuilder,
        cascade: Arc<CacheCascade>,
        verify_max_pages: u32,
        drift_ratio: f64,
    ) -> Self {
        Self {
            pool,
            upstream,
            lease,
            rebuilder,
            cascade,
            verify_max_pages,
            drift_ratio,
        }
    }

    /// Walk every active playlist sequentially; this job trades speed for
    /// minimal upstream pressure since it runs on a long period.
    pub async fn run(&self, actor: &str, trace_id: Uuid) -> Result<VerificationReport> {
        let started = Instant::now();

        let playlists = playlist_repo::list_active(&self.pool).await?;

        let mut checked = 0u32;
        let mut skipped_truncated = 0u32;
        let mut skipped_lease = 0u32;
        let mut corrections: Vec<CountCorrection> = Vec::new();
        let mut errors: Vec<PlaylistSyncError> = Vec::new();
        let mut invalidated: Vec<String> = Vec::new();

        for playlist in &playlists {
            let listing = match self
                .upstream
                .list_all(&playlist.remote_id, self.verify_max_pages)
                .await
            {
                Ok(listing) => listing,
                Err(err @ UpstreamError::MissingCredentials) => {
                    // Every remaining playlist would fail identically.
                    return Err(err.into());
                }
                Err(err) => {
                    warn!(playlist = %playlist.slug, error = %err, "verification fetch failed");
                    errors.push(PlaylistSyncError {
                        playlist_id: playlist.id,
                        slug: playlist.slug.clone(),
                        error: err.to_string(),
                    });
                    continue;
                }
            };

            checked += 1;

            if listing.truncated {
                // A prefix count is a lower bound, not an authoritative
                // count; correcting from it would shrink valid playlists.
                skipped_truncated += 1;
                continue;
            }

            let authoritative = listing.ids().len() as i32;
            let stored = playlist.item_count;
            let drift = (authoritative - stored).abs() as f64 / stored.max(1) as f64;

            if drift <= self.drift_ratio {
                continue;
            }

            // The stored count drifted past the threshold, which means the
            // stored membership drifted with it. Apply the enumeration just
            // fetched through the rebuilder so membership, count and
            // fingerprint land together; a bare count-and-fingerprint write
            // would leave stale membership that nothing ever compares again.
            match self
                .rebuilder
                .apply_listing_under_lease(&self.lease, playlist, &listing, None)
                .await
            {
                SyncAttempt::Completed(_) => {
                    VERIFICATION_CORRECTIONS_TOTAL.inc();
                    info!(
                        playlist = %playlist.slug,
                        stored,
                        authoritative,
                        "verification corrected drifted playlist"
                    );
                    corrections.push(CountCorrection {
                        playlist_id: playlist.id,
                        slug: playlist.slug.clone(),
                        stored,
                        authoritative,
                    });
                    invalidated.push(playlist.slug.clone());
                }
                SyncAttempt::LeaseHeld => {
                    // Another worker is rebuilding it right now; its rebuild
                    // corrects the drift, so just move on.
                    info!(playlist = %playlist.slug, "verification skipped, lease held");
                    skipped_lease += 1;
                }
                SyncAttempt::Failed(err) => {
                    errors.push(PlaylistSyncError {
                        playlist_id: playlist.id,
                        slug: playlist.slug.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }

        // Corrected playlists changed their displayed counts; one cascade
        // for the union, same as the feed sweep.
        let cascade = if invalidated.is_empty() {
            None
        } else {
            Some(self.cascade.run(None, &invalidated).await)
        };

        let report = VerificationReport {
            checked,
            corrected: corrections.len() as u32,
            skipped_truncated,
            skipped_lease,
            failures: errors.len() as u32,
            corrections,
            errors,
            cascade,
            duration_ms: started.elapsed().as_millis() as u64,
        };

        SYNC_JOB_DURATION_SECONDS
            .with_label_values(&["verification"])
            .observe(started.elapsed().as_secs_f64());

        info!(
            trace_id = %trace_id,
            checked = report.checked,
            corrected = report.corrected,
            skipped_truncated = report.skipped_truncated,
            skipped_lease = report.skipped_lease,
            failures = report.failures,
            "verification pass finished"
        );

        // One entry per run, whatever happened: the audit log records that
        // verification ran, sized by anomalies rather than catalog size.
        activity_repo::append(
            &self.pool,
            actor,
            &ActivityDetails::VerificationCompleted {
                report: report.clone(),
            },
            trace_id,
        )
        .await?;

        Ok(report)
    }
}
