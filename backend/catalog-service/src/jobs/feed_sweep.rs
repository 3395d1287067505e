//! Feed sweep job.
//!
//! One sweep = one pass over every active playlist: probe each feed with a
//! conditional fetch, rebuild only the playlists whose feed actually
//! changed, then run a single cache cascade for the union of affected
//! paths. External cron owns the cadence; this module only exposes `run`.
//!
//! Two bounded phases: feed checks fan out under the sweep semaphore
//! (default 8) because they are cheap 304s most days; rebuilds fan out
//! under a smaller semaphore (default 2) because each one can paginate a
//! large playlist.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};
use upstream_client::FeedValidators;
use uuid::Uuid;

use crate::cache::CacheCascade;
use crate::db::{activity_repo, playlist_repo};
use crate::error::{AppError, Result};
use crate::metrics::sync::SYNC_JOB_DURATION_SECONDS;
use crate::models::{ActivityDetails, Playlist, SweepReport};
use crate::services::change_detector::ChangeDetector;
use crate::services::lease::LeaseManager;
use crate::services::rebuilder::{PlaylistRebuilder, SyncAttempt};
use crate::services::strategy::select_strategy;

#[derive(Clone)]
pub struct FeedSweepJob {
    pool: PgPool,
    detector: ChangeDetector,
    lease: LeaseManager,
    rebuilder: PlaylistRebuilder,
    cascade: Arc<CacheCascade>,
    sweep_concurrency: usize,
    rebuild_concurrency: usize,
    full_recount_days: i64,
}

impl FeedSweepJob {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: PgPool,
        detector: ChangeDetector,
        lease: LeaseManager,
        rebuilder: PlaylistRebuilder,
        cascade: Arc<CacheCascade>,
        sweep_concurrency: usize,
        rebuild_concurrency: usize,
        full_recount_days: i64,
    ) -> Self {
        Self {
            pool,
            detector,
            lease,
            rebuilder,
            cascade,
            sweep_concurrency: sweep_concurrency.max(1),
            rebuild_concurrency: rebuild_concurrency.max(1),
            full_recount_days,
        }
    }

    pub async fn run(&self, actor: &str, trace_id: Uuid) -> Result<SweepReport> {
        let started = Instant::now();
        let playlists = playlist_repo::list_active(&self.pool).await?;
        info!(playlists = playlists.len(), trace_id = %trace_id, "feed sweep started");

        // Phase 1: conditional feed checks, bounded fan-out.
        let mut checked = 0u32;
        let mut failures = 0u32;
        let mut changed: Vec<(Playlist, FeedValidators)> = Vec::new();

        let semaphore = Arc::new(Semaphore::new(self.sweep_concurrency));
        let mut checks: JoinSet<(Playlist, crate::services::FeedProbe)> = JoinSet::new();
        for playlist in playlists {
            let permit = semaphore.clone().acquire_owned().await.unwrap();
            let detector = self.detector.clone();
            checks.spawn(async move {
                let probe = detector.check(&playlist).await;
                drop(permit);
                (playlist, probe)
            });
        }

        while let Some(joined) = checks.join_next().await {
            match joined {
                Ok((playlist, probe)) => {
                    checked += 1;
                    if probe.failed {
                        failures += 1;
                    } else if probe.changed {
                        changed.push((playlist, probe.validators));
                    }
                }
                Err(err) => {
                    failures += 1;
                    error!(error = %err, "feed check task panicked");
                }
            }
        }

        let changed_count = changed.len() as u32;

        // Phase 2: rebuild what changed, under the tighter semaphore.
        let mut rebuilt = 0u32;
        let mut skipped_lease = 0u32;
        let mut invalidated: Vec<String> = Vec::new();

        let rebuild_semaphore = Arc::new(Semaphore::new(self.rebuild_concurrency));
        let mut rebuilds: JoinSet<(String, SyncAttempt)> = JoinSet::new();
        for (playlist, validators) in changed {
            let permit = rebuild_semaphore.clone().acquire_owned().await.unwrap();
            let lease = self.lease.clone();
            let rebuilder = self.rebuilder.clone();
            let recount_days = self.full_recount_days;
            rebuilds.spawn(async move {
                let strategy = select_strategy(&playlist, false, Utc::now(), recount_days);
                let attempt = rebuilder
                    .rebuild_under_lease(&lease, &playlist, strategy, Some(&validators))
                    .await;
                drop(permit);
                (playlist.slug, attempt)
            });
        }

        let mut config_error: Option<AppError> = None;
        while let Some(joined) = rebuilds.join_next().await {
            match joined {
                Ok((slug, SyncAttempt::Completed(_))) => {
                    rebuilt += 1;
                    invalidated.push(slug);
                }
                Ok((_, SyncAttempt::LeaseHeld)) => skipped_lease += 1,
                Ok((_, SyncAttempt::Failed(err))) => {
                    // Misconfiguration fails every rebuild the same way;
                    // surface it to the caller instead of burying it in
                    // the failure count.
                    if matches!(err, AppError::Config(_)) && config_error.is_none() {
                        config_error = Some(err);
                    }
                    failures += 1;
                }
                Err(err) => {
                    failures += 1;
                    error!(error = %err, "rebuild task panicked");
                }
            }
        }
        if let Some(err) = config_error {
            return Err(err);
        }

        // Phase 3: one cascade for the union of everything that changed.
        let cascade = if invalidated.is_empty() {
            None
        } else {
            Some(self.cascade.run(None, &invalidated).await)
        };

        let report = SweepReport {
            checked,
            changed: changed_count,
            rebuilt,
            skipped_lease,
            failures,
            playlists_invalidated: invalidated,
            cascade,
            duration_ms: started.elapsed().as_millis() as u64,
        };

        SYNC_JOB_DURATION_SECONDS
            .with_label_values(&["feed_sweep"])
            .observe(started.elapsed().as_secs_f64());
        info!(
            checked = report.checked,
            changed = report.changed,
            rebuilt = report.rebuilt,
            skipped_lease = report.skipped_lease,
            failures = report.failures,
            duration_ms = report.duration_ms,
            trace_id = %trace_id,
            "feed sweep completed"
        );

        // Quiet sweeps (everything 304) stay out of the audit log.
        if report.changed > 0 || report.failures > 0 {
            activity_repo::append(
                &self.pool,
                actor,
                &ActivityDetails::FeedSweep {
                    report: report.clone(),
                },
                trace_id,
            )
            .await?;
        }

        Ok(report)
    }
}
