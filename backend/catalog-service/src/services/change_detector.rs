//! Conditional-fetch change detection.
//!
//! One cheap feed request per playlist per sweep, replaying the stored
//! ETag / Last-Modified validators. A `304 Not Modified` answers "anything
//! to do?" without transferring the feed body; only a `200` marks the
//! playlist for rebuild.

use std::sync::Arc;

use sqlx::PgPool;
use tracing::{debug, warn};
use upstream_client::{FeedValidators, UpstreamApi, UpstreamError};

use crate::db::sync_state_repo;
use crate::metrics::sync::SYNC_FEED_CHECKS_TOTAL;
use crate::models::Playlist;

/// Outcome of one feed probe.
///
/// `changed == false` covers two very different cases, told apart by
/// `failed`: an authoritative 304, or a failure treated as "unchanged this
/// cycle" so the next sweep retries. A failure is never reported as changed
/// and never as authoritatively unchanged.
#[derive(Debug, Clone)]
pub struct FeedProbe {
    pub changed: bool,
    pub failed: bool,
    /// Validators to pass along to the rebuild that follows a change.
    pub validators: FeedValidators,
    /// Entry ids of the feed body; empty on 304 or failure.
    pub entry_ids: Vec<String>,
}

#[derive(Clone)]
pub struct ChangeDetector {
    pool: PgPool,
    upstream: Arc<dyn UpstreamApi>,
}

impl ChangeDetector {
    pub fn new(pool: PgPool, upstream: Arc<dyn UpstreamApi>) -> Self {
        Self { pool, upstream }
    }

    /// Probe one playlist's feed.
    ///
    /// Never returns an error: sweeps treat every kind of failure the same
    /// way (skip this cycle, retry next), so failures are folded into the
    /// probe and logged here. The validator store is updated after every
    /// check, success or not.
    pub async fn check(&self, playlist: &Playlist) -> FeedProbe {
        let feed_url = self.upstream.feed_url(&playlist.remote_id);
        let stored = match sync_state_repo::find(&self.pool, &feed_url).await {
            Ok(row) => row
                .map(|state| FeedValidators::new(state.etag, state.last_modified))
                .unwrap_or_default(),
            Err(err) => {
                // Proceed without validators: worst case is an unconditional
                // GET that reports changed, which is the safe direction.
                warn!(playlist = %playlist.slug, error = %err, "validator lookup failed");
                FeedValidators::default()
            }
        };

        match self.upstream.check_feed(&playlist.remote_id, &stored).await {
            Ok(check) => {
                let outcome = if check.changed { "changed" } else { "unchanged" };
                SYNC_FEED_CHECKS_TOTAL.with_label_values(&[outcome]).inc();
                debug!(
                    playlist = %playlist.slug,
                    status = check.status,
                    changed = check.changed,
                    "feed check completed"
                );

                self.record(
                    &feed_url,
                    &playlist.slug,
                    check.validators.etag.as_deref(),
                    check.validators.last_modified.as_deref(),
                    Some(check.status as i16),
                )
                .await;

                FeedProbe {
                    changed: check.changed,
                    failed: false,
                    validators: check.validators,
                    entry_ids: check.entry_ids,
                }
            }
            Err(err) => {
                SYNC_FEED_CHECKS_TOTAL.with_label_values(&["failed"]).inc();
                if err.is_transient() {
                    warn!(playlist = %playlist.slug, error = %err, "feed check failed, will retry next sweep");
                } else {
                    warn!(playlist = %playlist.slug, error = %err, "feed check failed non-transiently");
                }

                let status = match &err {
                    UpstreamError::Status(code) => Some(*code as i16),
                    _ => None,
                };
                // None validators keep the stored ones via COALESCE.
                self.record(&feed_url, &playlist.slug, None, None, status).await;

                FeedProbe {
                    changed: false,
                    failed: true,
                    validators: stored,
                    entry_ids: Vec::new(),
                }
            }
        }
    }

    async fn record(
        &self,
        feed_url: &str,
        slug: &str,
        etag: Option<&str>,
        last_modified: Option<&str>,
        status: Option<i16>,
    ) {
        if let Err(err) =
            sync_state_repo::record_check(&self.pool, feed_url, etag, last_modified, status).await
        {
            warn!(playlist = %slug, error = %err, "failed to persist feed check state");
        }
    }
}
