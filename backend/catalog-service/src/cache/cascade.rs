//! The three-tier cache invalidation cascade.
//!
//! One explicit, synchronous entry point for every path that changes catalog
//! content: cron sweeps, admin operations and webhook-style triggers all call
//! [`CacheCascade::run`] and get the same structured outcome back. Tiers are
//! independent; a failing CDN purge never stops the regeneration request.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::cache::cdn::CdnPurger;
use crate::cache::local::{self, LocalCache};
use crate::cache::paths::affected_paths;
use crate::cache::revalidate::Revalidator;
use crate::metrics::cache::{CACHE_INVALIDATION_TIER_TOTAL, CASCADE_DURATION_SECONDS};
use crate::models::CascadeOutcome;

pub struct CacheCascade {
    local: Arc<LocalCache>,
    cdn: CdnPurger,
    revalidator: Revalidator,
}

impl CacheCascade {
    pub fn new(local: Arc<LocalCache>, cdn: CdnPurger, revalidator: Revalidator) -> Self {
        Self {
            local,
            cdn,
            revalidator,
        }
    }

    /// Invalidate everything the given change could have touched.
    ///
    /// Never returns an error; per-tier results land in the outcome so a
    /// caller can see (and an operator can retry) exactly the tier that
    /// failed.
    pub async fn run(&self, video_remote_id: Option<&str>, slugs: &[String]) -> CascadeOutcome {
        let started = Instant::now();
        let paths = affected_paths(video_remote_id, slugs);

        // Tier 1: the local map cannot fail, only miss keys it never held.
        self.local.invalidate(&local::homepage_key());
        self.local.invalidate(&local::playlist_index_key());
        for slug in slugs {
            self.local.invalidate(&local::playlist_key(slug));
        }
        let lru_cleared = true;
        record_tier("local", true, true);

        // Tier 2: edge purge.
        let cdn_purged = self.cdn.purge_paths(&paths).await;
        record_tier("cdn", self.cdn.is_configured(), cdn_purged);

        // Tier 3: static page regeneration.
        let pages_revalidated = self.revalidator.revalidate(&paths).await;
        record_tier("revalidate", self.revalidator.is_configured(), pages_revalidated);

        let outcome = CascadeOutcome {
            lru_cleared,
            cdn_purged,
            pages_revalidated,
            total_duration_ms: started.elapsed().as_millis() as u64,
        };

        CASCADE_DURATION_SECONDS.observe(started.elapsed().as_secs_f64());
        if outcome.all_succeeded() {
            info!(
                paths = paths.len(),
                duration_ms = outcome.total_duration_ms,
                "cache invalidation cascade completed"
            );
        } else {
            warn!(
                cdn_purged = outcome.cdn_purged,
                pages_revalidated = outcome.pages_revalidated,
                paths = paths.len(),
                "cache invalidation cascade completed with tier failures"
            );
        }

        outcome
    }
}

fn record_tier(tier: &str, configured: bool, succeeded: bool) {
    let outcome = if !configured {
        "skipped"
    } else if succeeded {
        "ok"
    } else {
        "error"
    };
    CACHE_INVALIDATION_TIER_TOTAL
        .with_label_values(&[tier, outcome])
        .inc();
}
