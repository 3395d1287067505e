//! Idle fingerprint probe.
//!
//! Safety net under the feed sweep: feeds can lie (stale validators,
//! caching middleboxes), so the probe re-enumerates one featured playlist
//! per invocation — the one probed longest ago — fingerprints the actual
//! item list and rebuilds only when the fingerprint moved. One playlist per
//! tick keeps the steady-state load near zero while guaranteeing every
//! featured playlist is re-verified within (featured-count x cadence).

use std::sync::Arc;
use std::time::Instant;

use sqlx::PgPool;
use tracing::{info, warn};
use upstream_client::UpstreamApi;
use uuid::Uuid;

use crate::cache::CacheCascade;
use crate::db::{activity_repo, playlist_repo};
use crate::error::Result;
use crate::metrics::sync::SYNC_JOB_DURATION_SECONDS;
use crate::models::{ActivityDetails, IdleReport};
use crate::services::lease::LeaseManager;
use crate::services::rebuilder::{fingerprint, PlaylistRebuilder, SyncAttempt};

#[derive(Clone)]
pub struct IdleSweepJob {
    pool: PgPool,
    upstream: Arc<dyn UpstreamApi>,
    lease: LeaseManager,
    rebuilder: PlaylistRebuilder,
    cascade: Arc<CacheCascade>,
    max_pages: u32,
}

impl IdleSweepJob {
    pub fn new(
        pool: PgPool,
        upstream: Arc<dyn UpstreamApi>,
        lease: LeaseManager,
        rebuilder: PlaylistRebuilder,
        cascade: Arc<CacheCascade>,
        max_pages: u32,
    ) -> Self {
        Self {
            pool,
            upstream,
            lease,
            rebuilder,
            cascade,
            max_pages,
        }
    }

    pub async fn run(&self, actor: &str, trace_id: Uuid) -> Result<IdleReport> {
        let started = Instant::now();
        let result = self.run_inner(trace_id, started).await;

        SYNC_JOB_DURATION_SECONDS
            .with_label_values(&["idle_probe"])
            .observe(started.elapsed().as_secs_f64());

        let report = result?;
        if report.fingerprint_changed {
            activity_repo::append(
                &self.pool,
                actor,
                &ActivityDetails::IdleProbe {
                    report: report.clone(),
                },
                trace_id,
            )
            .await?;
        }
        Ok(report)
    }

    async fn run_inner(&self, trace_id: Uuid, started: Instant) -> Result<IdleReport> {
        let Some(playlist) = playlist_repo::next_idle_probe_candidate(&self.pool).await? else {
            info!(trace_id = %trace_id, "idle probe found no eligible playlist");
            return Ok(IdleReport {
                probed: None,
                fingerprint_changed: false,
                rebuilt: false,
                skipped_lease: false,
                cascade: None,
                duration_ms: started.elapsed().as_millis() as u64,
            });
        };

        let listing = match self
            .upstream
            .list_all(&playlist.remote_id, self.max_pages)
            .await
        {
            Ok(listing) => listing,
            Err(err) if err.is_transient() => {
                // Advance the probe clock anyway: one unreachable playlist
                // must not wedge the rotation. It gets retried after the
                // other candidates have had their turn.
                warn!(playlist = %playlist.slug, error = %err, "idle probe fetch failed, rotating on");
                playlist_repo::touch_fingerprint_check(&self.pool, playlist.id).await?;
                return Ok(unchanged_report(playlist.slug, started));
            }
            Err(err) => return Err(err.into()),
        };

        if listing.truncated {
            // A prefix fingerprint would compare unequal to the stored full
            // one and trigger rebuilds forever; skip the comparison.
            warn!(
                playlist = %playlist.slug,
                pages = listing.pages_fetched,
                "idle probe listing truncated, skipping fingerprint comparison"
            );
            playlist_repo::touch_fingerprint_check(&self.pool, playlist.id).await?;
            return Ok(unchanged_report(playlist.slug, started));
        }

        let ids = listing.ids();
        let current = fingerprint(&ids);
        if playlist.fingerprint.as_deref() == Some(current.as_str()) {
            playlist_repo::touch_fingerprint_check(&self.pool, playlist.id).await?;
            info!(playlist = %playlist.slug, trace_id = %trace_id, "idle probe: fingerprint unchanged");
            return Ok(unchanged_report(playlist.slug, started));
        }

        info!(
            playlist = %playlist.slug,
            trace_id = %trace_id,
            "idle probe caught a fingerprint change, rebuilding"
        );

        // Reuse the listing just fetched instead of enumerating again.
        let attempt = self
            .rebuilder
            .apply_listing_under_lease(&self.lease, &playlist, &listing, None)
            .await;

        let (rebuilt, skipped_lease) = match &attempt {
            SyncAttempt::Completed(_) => (true, false),
            SyncAttempt::LeaseHeld => (false, true),
            SyncAttempt::Failed(err) => {
                warn!(playlist = %playlist.slug, error = %err, "idle probe rebuild failed");
                (false, false)
            }
        };

        let cascade = if rebuilt {
            Some(self.cascade.run(None, &[playlist.slug.clone()]).await)
        } else {
            None
        };

        Ok(IdleReport {
            probed: Some(playlist.slug),
            fingerprint_changed: true,
            rebuilt,
            skipped_lease,
            cascade,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }
}

fn unchanged_report(slug: String, started: Instant) -> IdleReport {
    IdleReport {
        probed: Some(slug),
        fingerprint_changed: false,
        rebuilt: false,
        skipped_lease: false,
        cascade: None,
        duration_ms: started.elapsed().as_millis() as u64,
    }
}
