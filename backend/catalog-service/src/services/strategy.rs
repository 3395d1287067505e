//! Full-vs-smart rebuild strategy selection.
//!
//! The decision is a pure function of stored playlist state plus the force
//! flag, so it lives apart from any I/O and the whole table is unit tested.

use chrono::{DateTime, Duration, Utc};

use crate::models::{Playlist, SyncStrategy};

/// Pick the rebuild strategy for one playlist.
///
/// Full enumeration wins whenever the stored count cannot be trusted as a
/// diff base: an empty playlist, a playlist never fully counted, an operator
/// forcing it, or a count older than the recount window. Everything else
/// gets the cheap first-page smart sync.
pub fn select_strategy(
    playlist: &Playlist,
    force: bool,
    now: DateTime<Utc>,
    full_recount_days: i64,
) -> SyncStrategy {
    if playlist.item_count == 0 {
        return SyncStrategy::Full;
    }
    let Some(last_full) = playlist.last_full_count_at else {
        return SyncStrategy::Full;
    };
    if force {
        return SyncStrategy::Full;
    }
    if now - last_full > Duration::days(full_recount_days) {
        return SyncStrategy::Full;
    }

    SyncStrategy::Smart
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn playlist(item_count: i32, last_full_days_ago: Option<i64>) -> Playlist {
        let now = Utc::now();
        Playlist {
            id: Uuid::new_v4(),
            remote_id: "PL123".to_string(),
            title: "News".to_string(),
            slug: "news".to_string(),
            etag: None,
            last_modified: None,
            fingerprint: None,
            fingerprint_checked_at: None,
            item_count,
            lease_owner: None,
            lease_expires_at: None,
            last_full_count_at: last_full_days_ago.map(|days| now - Duration::days(days)),
            count_verified: last_full_days_ago.is_some(),
            incremental_runs: 0,
            is_featured: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn empty_playlist_needs_full() {
        let p = playlist(0, Some(1));
        assert_eq!(select_strategy(&p, false, Utc::now(), 7), SyncStrategy::Full);
    }

    #[test]
    fn never_counted_needs_full() {
        let p = playlist(42, None);
        assert_eq!(select_strategy(&p, false, Utc::now(), 7), SyncStrategy::Full);
    }

    #[test]
    fn force_overrides_fresh_count() {
        let p = playlist(42, Some(2));
        assert_eq!(select_strategy(&p, true, Utc::now(), 7), SyncStrategy::Full);
    }

    #[test]
    fn stale_count_needs_full() {
        let p = playlist(42, Some(8));
        assert_eq!(select_strategy(&p, false, Utc::now(), 7), SyncStrategy::Full);
    }

    #[test]
    fn fresh_count_allows_smart() {
        let p = playlist(42, Some(2));
        assert_eq!(select_strategy(&p, false, Utc::now(), 7), SyncStrategy::Smart);
    }

    #[test]
    fn boundary_day_is_still_fresh() {
        // Exactly at the window edge: not yet past it.
        let now = Utc::now();
        let mut p = playlist(42, Some(0));
        p.last_full_count_at = Some(now - Duration::days(7));
        assert_eq!(select_strategy(&p, false, now, 7), SyncStrategy::Smart);
    }
}
