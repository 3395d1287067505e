//! Playlist rebuild leases.
//!
//! A lease is a row-level advisory claim: `lease_owner` plus a deadline on
//! the playlist row itself, taken and released with conditional UPDATEs.
//! Workers on different machines coordinate purely through these rows; a
//! crashed worker's claim lapses when its deadline passes and the next
//! acquire simply takes over.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::db::playlist_repo;
use crate::metrics::sync::SYNC_LEASE_CONTENTION_TOTAL;

#[derive(Clone)]
pub struct LeaseManager {
    pool: PgPool,
    ttl_secs: i64,
}

impl LeaseManager {
    pub fn new(pool: PgPool, ttl_secs: i64) -> Self {
        Self {
            pool,
            ttl_secs: ttl_secs.max(1),
        }
    }

    /// Fresh owner token for one rebuild attempt.
    pub fn owner_token() -> String {
        Uuid::new_v4().to_string()
    }

    /// Try to claim the playlist. `false` means another worker holds a live
    /// lease; that is routine contention, not an error.
    pub async fn acquire(&self, playlist_id: Uuid, owner: &str) -> Result<bool, sqlx::Error> {
        let expires_at = Utc::now() + Duration::seconds(self.ttl_secs);
        let acquired = playlist_repo::acquire_lease(&self.pool, playlist_id, owner, expires_at).await?;

        if !acquired {
            SYNC_LEASE_CONTENTION_TOTAL.inc();
            debug!(playlist_id = %playlist_id, "rebuild lease held elsewhere, skipping");
        }

        Ok(acquired)
    }

    /// Release a claim. Fenced on the owner token, so releasing after the
    /// TTL already let someone else take over is a harmless no-op.
    pub async fn release(&self, playlist_id: Uuid, owner: &str) -> Result<bool, sqlx::Error> {
        playlist_repo::release_lease(&self.pool, playlist_id, owner).await
    }
}
