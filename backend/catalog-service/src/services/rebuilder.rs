//! Playlist rebuild: fetch, diff, persist.
//!
//! The rebuild is the only writer of playlist membership. It diffs the
//! remote item list against stored membership and applies additions,
//! metadata refreshes and removals row by row — never drop-and-recreate, so
//! a reader mid-rebuild sees a playlist shrink or grow, not vanish.
//!
//! Truncation discipline: a page-capped enumeration saw only a prefix, so it
//! must not delete anything it did not see, must not claim an authoritative
//! count and must not write a fingerprint that a later complete enumeration
//! would wrongly match.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use sha2::{Digest, Sha256};
use sqlx::PgPool;
use tracing::{info, warn};
use upstream_client::{FeedValidators, ItemListing, RemoteItem, UpstreamApi};

use crate::db::{playlist_repo, video_repo};
use crate::error::{AppError, Result};
use crate::metrics::sync::{SYNC_ITEMS_TOTAL, SYNC_REBUILDS_TOTAL, SYNC_REBUILD_DURATION_SECONDS};
use crate::models::{Playlist, RebuildReport, SyncStrategy};
use crate::services::lease::LeaseManager;

/// Hex SHA-256 over the ordered item ids joined with newlines.
///
/// Order-sensitive on purpose: a reorder is a content change worth a
/// rebuild. Computed only from complete enumerations.
pub fn fingerprint(ids: &[&str]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(ids.join("\n").as_bytes());
    hex::encode(hasher.finalize())
}

/// Outcome of one lease-guarded rebuild attempt.
#[derive(Debug)]
pub enum SyncAttempt {
    Completed(RebuildReport),
    /// Another worker holds the lease; routine, not an error.
    LeaseHeld,
    Failed(AppError),
}

#[derive(Clone)]
pub struct PlaylistRebuilder {
    pool: PgPool,
    upstream: Arc<dyn UpstreamApi>,
    max_pages: u32,
}

enum RebuildSource<'a> {
    Fetch(SyncStrategy),
    /// An already-fetched complete listing (the idle probe fetched one to
    /// fingerprint it and should not fetch again).
    Listing(&'a ItemListing),
}

impl RebuildSource<'_> {
    fn strategy_label(&self) -> &'static str {
        match self {
            RebuildSource::Fetch(strategy) => strategy.as_str(),
            RebuildSource::Listing(_) => SyncStrategy::Full.as_str(),
        }
    }
}

impl PlaylistRebuilder {
    pub fn new(pool: PgPool, upstream: Arc<dyn UpstreamApi>, max_pages: u32) -> Self {
        Self {
            pool,
            upstream,
            max_pages,
        }
    }

    /// Acquire the lease, rebuild with the chosen strategy, release.
    pub async fn rebuild_under_lease(
        &self,
        lease: &LeaseManager,
        playlist: &Playlist,
        strategy: SyncStrategy,
        validators: Option<&FeedValidators>,
    ) -> SyncAttempt {
        self.run_guarded(lease, playlist, RebuildSource::Fetch(strategy), validators)
            .await
    }

    /// Acquire the lease and apply an already-fetched full listing.
    pub async fn apply_listing_under_lease(
        &self,
        lease: &LeaseManager,
        playlist: &Playlist,
        listing: &ItemListing,
        validators: Option<&FeedValidators>,
    ) -> SyncAttempt {
        self.run_guarded(lease, playlist, RebuildSource::Listing(listing), validators)
            .await
    }

    async fn run_guarded(
        &self,
        lease: &LeaseManager,
        playlist: &Playlist,
        source: RebuildSource<'_>,
        validators: Option<&FeedValidators>,
    ) -> SyncAttempt {
        let label = source.strategy_label();
        let owner = LeaseManager::owner_token();
        match lease.acquire(playlist.id, &owner).await {
            Ok(true) => {}
            Ok(false) => {
                SYNC_REBUILDS_TOTAL
                    .with_label_values(&[label, "lease_held"])
                    .inc();
                return SyncAttempt::LeaseHeld;
            }
            Err(err) => {
                SYNC_REBUILDS_TOTAL.with_label_values(&[label, "failed"]).inc();
                return SyncAttempt::Failed(err.into());
            }
        }

        let result = match &source {
            RebuildSource::Fetch(strategy) => self.rebuild(playlist, *strategy, validators).await,
            RebuildSource::Listing(listing) => {
                self.apply_full_listing(playlist, listing, validators).await
            }
        };

        // The release runs whatever the rebuild did; if this write fails the
        // TTL reclaims the lease on its own.
        if let Err(err) = lease.release(playlist.id, &owner).await {
            warn!(playlist = %playlist.slug, error = %err, "lease release failed, TTL will reclaim");
        }

        match result {
            Ok(report) => {
                SYNC_REBUILDS_TOTAL
                    .with_label_values(&[label, "completed"])
                    .inc();
                SyncAttempt::Completed(report)
            }
            Err(err) => {
                SYNC_REBUILDS_TOTAL.with_label_values(&[label, "failed"]).inc();
                warn!(playlist = %playlist.slug, error = %err, "rebuild failed");
                SyncAttempt::Failed(err)
            }
        }
    }

    /// Rebuild without lease handling; callers own the coordination.
    pub async fn rebuild(
        &self,
        playlist: &Playlist,
        strategy: SyncStrategy,
        validators: Option<&FeedValidators>,
    ) -> Result<RebuildReport> {
        match strategy {
            SyncStrategy::Full => {
                let listing = self
                    .upstream
                    .list_all(&playlist.remote_id, self.max_pages)
                    .await?;
                self.apply_full_listing(playlist, &listing, validators).await
            }
            SyncStrategy::Smart => self.apply_first_page(playlist, validators).await,
        }
    }

    /// Diff a complete (or page-capped) listing against stored membership
    /// and persist the difference.
    pub async fn apply_full_listing(
        &self,
        playlist: &Playlist,
        listing: &ItemListing,
        validators: Option<&FeedValidators>,
    ) -> Result<RebuildReport> {
        let started = Instant::now();

        // The platform occasionally repeats an item across page boundaries;
        // first occurrence wins so the diff stays set-like.
        let mut seen: HashSet<&str> = HashSet::new();
        let unique: Vec<&RemoteItem> = listing
            .items
            .iter()
            .filter(|item| seen.insert(item.id.as_str()))
            .collect();
        let remote_ids: Vec<&str> = unique.iter().map(|item| item.id.as_str()).collect();
        let remote_set: HashSet<&str> = remote_ids.iter().copied().collect();

        let stored = video_repo::membership(&self.pool, playlist.id).await?;
        let stored_ids: HashSet<&str> = stored.iter().map(|(_, rid)| rid.as_str()).collect();

        let mut added = 0u32;
        let mut updated = 0u32;
        let mut item_errors = Vec::new();

        for item in &unique {
            match video_repo::upsert_remote_item(&self.pool, item).await {
                Ok(video_id) => {
                    if stored_ids.contains(item.id.as_str()) {
                        updated += 1;
                    } else {
                        match video_repo::add_membership(&self.pool, playlist.id, video_id).await {
                            Ok(()) => added += 1,
                            Err(err) => {
                                item_errors.push(format!("{}: membership insert: {}", item.id, err))
                            }
                        }
                    }
                }
                Err(err) => item_errors.push(format!("{}: {}", item.id, err)),
            }
        }

        // Removals only from a complete enumeration: a truncated listing
        // proves nothing about items beyond the fetched prefix.
        let mut removed = 0u32;
        if !listing.truncated {
            for (video_id, remote_id) in &stored {
                if !remote_set.contains(remote_id.as_str()) {
                    match video_repo::remove_membership(&self.pool, playlist.id, *video_id).await {
                        Ok(()) => removed += 1,
                        Err(err) => {
                            item_errors.push(format!("{}: membership delete: {}", remote_id, err))
                        }
                    }
                }
            }
        }

        let etag = validators.and_then(|v| v.etag.as_deref());
        let last_modified = validators.and_then(|v| v.last_modified.as_deref());
        let fetched_count = remote_ids.len() as i32;

        let (item_count, new_fingerprint) = if listing.truncated {
            playlist_repo::record_truncated_rebuild(
                &self.pool,
                playlist.id,
                etag,
                last_modified,
                fetched_count,
            )
            .await?;
            (playlist.item_count.max(fetched_count), None)
        } else {
            let digest = fingerprint(&remote_ids);
            playlist_repo::record_full_rebuild(
                &self.pool,
                playlist.id,
                &digest,
                etag,
                last_modified,
                fetched_count,
            )
            .await?;
            (fetched_count, Some(digest))
        };

        let fingerprint_changed = match &new_fingerprint {
            Some(digest) => playlist.fingerprint.as_deref() != Some(digest.as_str()),
            None => false,
        };

        SYNC_ITEMS_TOTAL.with_label_values(&["added"]).inc_by(added as u64);
        SYNC_ITEMS_TOTAL.with_label_values(&["updated"]).inc_by(updated as u64);
        SYNC_ITEMS_TOTAL.with_label_values(&["removed"]).inc_by(removed as u64);
        SYNC_REBUILD_DURATION_SECONDS
            .with_label_values(&[SyncStrategy::Full.as_str()])
            .observe(started.elapsed().as_secs_f64());

        let report = RebuildReport {
            strategy: SyncStrategy::Full,
            added,
            updated,
            removed,
            item_count,
            fingerprint_changed,
            truncated: listing.truncated,
            duration_ms: started.elapsed().as_millis() as u64,
            item_errors,
        };

        info!(
            playlist = %playlist.slug,
            added = report.added,
            updated = report.updated,
            removed = report.removed,
            item_count = report.item_count,
            truncated = report.truncated,
            pages = listing.pages_fetched,
            errors = report.item_errors.len(),
            "full rebuild applied"
        );

        Ok(report)
    }

    /// First-page smart sync: pick up new items, touch nothing else.
    ///
    /// Diffs the remote first page against the playlist's *entire* stored
    /// membership, so an old item resurfacing on page one is recognized and
    /// not duplicated. Removals are invisible to this path; the recount
    /// window and the verification job bound the error.
    async fn apply_first_page(
        &self,
        playlist: &Playlist,
        validators: Option<&FeedValidators>,
    ) -> Result<RebuildReport> {
        let started = Instant::now();

        let page = self.upstream.list_page(&playlist.remote_id, None).await?;

        let stored = video_repo::membership(&self.pool, playlist.id).await?;
        let stored_ids: HashSet<&str> = stored.iter().map(|(_, rid)| rid.as_str()).collect();

        let mut seen: HashSet<&str> = HashSet::new();
        let mut added = 0u32;
        let mut item_errors = Vec::new();

        for item in &page.items {
            if !seen.insert(item.id.as_str()) || stored_ids.contains(item.id.as_str()) {
                continue;
            }
            match video_repo::upsert_remote_item(&self.pool, item).await {
                Ok(video_id) => {
                    match video_repo::add_membership(&self.pool, playlist.id, video_id).await {
                        Ok(()) => added += 1,
                        Err(err) => {
                            item_errors.push(format!("{}: membership insert: {}", item.id, err))
                        }
                    }
                }
                Err(err) => item_errors.push(format!("{}: {}", item.id, err)),
            }
        }

        let item_count = playlist.item_count + added as i32;
        playlist_repo::record_smart_rebuild(
            &self.pool,
            playlist.id,
            validators.and_then(|v| v.etag.as_deref()),
            validators.and_then(|v| v.last_modified.as_deref()),
            item_count,
        )
        .await?;

        SYNC_ITEMS_TOTAL.with_label_values(&["added"]).inc_by(added as u64);
        SYNC_REBUILD_DURATION_SECONDS
            .with_label_values(&[SyncStrategy::Smart.as_str()])
            .observe(started.elapsed().as_secs_f64());

        let report = RebuildReport {
            strategy: SyncStrategy::Smart,
            added,
            updated: 0,
            removed: 0,
            item_count,
            fingerprint_changed: false,
            truncated: false,
            duration_ms: started.elapsed().as_millis() as u64,
            item_errors,
        };

        info!(
            playlist = %playlist.slug,
            added = report.added,
            item_count = report.item_count,
            errors = report.item_errors.len(),
            "smart sync applied"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_deterministic() {
        let ids = vec!["a", "b", "c"];
        assert_eq!(fingerprint(&ids), fingerprint(&ids));
    }

    #[test]
    fn fingerprint_is_order_sensitive() {
        assert_ne!(fingerprint(&["a", "b", "c"]), fingerprint(&["c", "b", "a"]));
    }

    #[test]
    fn fingerprint_detects_membership_change() {
        assert_ne!(fingerprint(&["a", "b", "c"]), fingerprint(&["a", "b", "c", "d"]));
    }

    #[test]
    fn fingerprint_is_hex_sha256() {
        let digest = fingerprint(&["a", "b"]);
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        // Known digest of "a\nb".
        assert_eq!(
            digest,
            "7e18f737311b2dc3b2f269dd78396b0351f14fb66efa879f768cb23181883c78"
        );
    }

    #[test]
    fn empty_list_has_a_fingerprint() {
        // The empty playlist still fingerprints; SHA-256 of the empty string.
        assert_eq!(
            fingerprint(&[]),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
