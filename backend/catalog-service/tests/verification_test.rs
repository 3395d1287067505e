//! Drift verification semantics against a real database.
//!
//! A correction is a real rebuild: membership, count and fingerprint move
//! together and the corrected playlists get a cache cascade. Corrections
//! run only past the relative-drift threshold, truncated enumerations never
//! correct, and a whole pass lands as one audit entry no matter how many
//! playlists it touched.

mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use catalog_service::cache::{CacheCascade, CdnPurger, LocalCache, Revalidator};
use catalog_service::config::{CdnConfig, RevalidateConfig};
use catalog_service::db::{activity_repo, playlist_repo, video_repo};
use catalog_service::jobs::VerificationJob;
use catalog_service::services::rebuilder::fingerprint;
use catalog_service::services::{LeaseManager, PlaylistRebuilder};
use common::StubUpstream;

/// Cascade whose CDN and revalidation tiers are unconfigured no-ops; these
/// tests pin verification semantics, cascade_test pins tier behavior.
fn noop_cascade() -> Arc<CacheCascade> {
    let cdn = CdnPurger::new(
        &CdnConfig {
            api_base_url: "https://cdn.example".to_string(),
            zone_id: String::new(),
            api_token: String::new(),
            purge_tag: "catalog".to_string(),
            timeout_secs: 5,
        },
        "https://site.example",
    )
    .unwrap();
    let revalidator = Revalidator::new(&RevalidateConfig {
        url: String::new(),
        secret: String::new(),
        timeout_secs: 5,
    })
    .unwrap();
    Arc::new(CacheCascade::new(
        Arc::new(LocalCache::new(32, Duration::from_secs(60))),
        cdn,
        revalidator,
    ))
}

fn verification_job(pool: &sqlx::PgPool, upstream: Arc<StubUpstream>) -> VerificationJob {
    let lease = LeaseManager::new(pool.clone(), 30);
    let rebuilder = PlaylistRebuilder::new(pool.clone(), upstream.clone(), 40);
    VerificationJob::new(
        pool.clone(),
        upstream,
        lease,
        rebuilder,
        noop_cascade(),
        30,
        0.01,
    )
}

async fn set_stored_count(pool: &sqlx::PgPool, playlist_id: Uuid, count: i32) {
    sqlx::query("UPDATE playlists SET item_count = $2 WHERE id = $1")
        .bind(playlist_id)
        .bind(count)
        .execute(pool)
        .await
        .unwrap();
}

async fn membership_ids(pool: &sqlx::PgPool, playlist_id: Uuid) -> HashSet<String> {
    video_repo::membership(pool, playlist_id)
        .await
        .unwrap()
        .into_iter()
        .map(|(_, remote_id)| remote_id)
        .collect()
}

#[tokio::test]
#[ignore] // Run manually: cargo test --test verification_test -- --ignored
async fn drift_above_threshold_is_corrected() {
    let pool = common::setup_test_db().await.expect("test db");
    let playlist_id = common::seed_playlist(&pool, "PL-verify-1", "verify-1").await;
    set_stored_count(&pool, playlist_id, 100).await;

    // Remote truth: 103 items, 3% over the stored count.
    let upstream = Arc::new(StubUpstream::new());
    upstream.set_items(
        "PL-verify-1",
        (0..103).map(|i| common::remote_item(&format!("v{}", i), i)).collect(),
    );

    let report = verification_job(&pool, upstream)
        .run("scheduler", Uuid::new_v4())
        .await
        .unwrap();

    assert_eq!(report.checked, 1);
    assert_eq!(report.corrected, 1);
    assert_eq!(report.corrections[0].stored, 100);
    assert_eq!(report.corrections[0].authoritative, 103);
    let cascade = report.cascade.expect("a correction must trigger the cascade");
    assert!(cascade.all_succeeded());

    let row = playlist_repo::find_by_id(&pool, playlist_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.item_count, 103);
    assert!(row.count_verified);
    assert!(row.last_full_count_at.is_some());
    assert!(row.fingerprint.is_some(), "correction re-fingerprints from the full listing");
    assert_eq!(
        membership_ids(&pool, playlist_id).await.len(),
        103,
        "the correction must persist the membership it counted"
    );
}

#[tokio::test]
#[ignore]
async fn correction_rewrites_membership_alongside_the_fingerprint() {
    let pool = common::setup_test_db().await.expect("test db");
    let playlist_id = common::seed_playlist(&pool, "PL-verify-drift", "verify-drift").await;

    // Stored membership lags the remote truth: {a, b, z} locally while the
    // remote list is {a, b, c, d, e}.
    for remote_id in ["a", "b", "z"] {
        let video_id = common::seed_video(&pool, remote_id, 1).await;
        common::link_video(&pool, playlist_id, video_id).await;
    }
    set_stored_count(&pool, playlist_id, 3).await;

    let upstream = Arc::new(StubUpstream::new());
    upstream.set_items(
        "PL-verify-drift",
        ["a", "b", "c", "d", "e"]
            .iter()
            .map(|id| common::remote_item(id, 1))
            .collect(),
    );

    let report = verification_job(&pool, upstream)
        .run("scheduler", Uuid::new_v4())
        .await
        .unwrap();
    assert_eq!(report.corrected, 1);

    // If the correction only wrote the count and fingerprint, the stored
    // fingerprint would match the remote list while the membership still
    // said {a, b, z} — and no later probe would ever see the difference.
    let stored = membership_ids(&pool, playlist_id).await;
    let expected: HashSet<String> =
        ["a", "b", "c", "d", "e"].iter().map(|s| s.to_string()).collect();
    assert_eq!(stored, expected);

    let row = playlist_repo::find_by_id(&pool, playlist_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        row.fingerprint.as_deref(),
        Some(fingerprint(&["a", "b", "c", "d", "e"]).as_str()),
        "the stored fingerprint must describe the stored membership"
    );
    assert_eq!(row.item_count, 5);
}

#[tokio::test]
#[ignore]
async fn single_item_noise_writes_nothing() {
    let pool = common::setup_test_db().await.expect("test db");
    let playlist_id = common::seed_playlist(&pool, "PL-verify-2", "verify-2").await;
    set_stored_count(&pool, playlist_id, 100).await;

    // 101 vs 100 is exactly 1% drift, not above the threshold.
    let upstream = Arc::new(StubUpstream::new());
    upstream.set_items(
        "PL-verify-2",
        (0..101).map(|i| common::remote_item(&format!("v{}", i), i)).collect(),
    );

    let report = verification_job(&pool, upstream)
        .run("scheduler", Uuid::new_v4())
        .await
        .unwrap();

    assert_eq!(report.checked, 1);
    assert_eq!(report.corrected, 0);
    assert!(report.cascade.is_none(), "nothing corrected, nothing to invalidate");

    let row = playlist_repo::find_by_id(&pool, playlist_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.item_count, 100, "noise below the threshold must not thrash storage");
    assert!(!row.count_verified);
    assert!(membership_ids(&pool, playlist_id).await.is_empty());
}

#[tokio::test]
#[ignore]
async fn truncated_enumeration_never_corrects() {
    let pool = common::setup_test_db().await.expect("test db");
    let playlist_id = common::seed_playlist(&pool, "PL-verify-3", "verify-3").await;
    set_stored_count(&pool, playlist_id, 100).await;

    let upstream = Arc::new(StubUpstream::new());
    upstream.set_items(
        "PL-verify-3",
        (0..150).map(|i| common::remote_item(&format!("v{}", i), i)).collect(),
    );
    // The page cap bites: only a 40-item prefix comes back.
    upstream.truncate_at(40);

    let report = verification_job(&pool, upstream)
        .run("scheduler", Uuid::new_v4())
        .await
        .unwrap();

    assert_eq!(report.skipped_truncated, 1);
    assert_eq!(report.corrected, 0);

    let row = playlist_repo::find_by_id(&pool, playlist_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.item_count, 100, "a prefix count is a lower bound, never authoritative");
}

#[tokio::test]
#[ignore]
async fn lease_held_elsewhere_defers_the_correction() {
    let pool = common::setup_test_db().await.expect("test db");
    let playlist_id = common::seed_playlist(&pool, "PL-verify-4", "verify-4").await;
    set_stored_count(&pool, playlist_id, 100).await;

    // Another worker's live lease; its rebuild will correct the drift.
    let other = LeaseManager::new(pool.clone(), 60);
    assert!(other
        .acquire(playlist_id, &LeaseManager::owner_token())
        .await
        .unwrap());

    let upstream = Arc::new(StubUpstream::new());
    upstream.set_items(
        "PL-verify-4",
        (0..110).map(|i| common::remote_item(&format!("v{}", i), i)).collect(),
    );

    let report = verification_job(&pool, upstream)
        .run("scheduler", Uuid::new_v4())
        .await
        .unwrap();

    assert_eq!(report.skipped_lease, 1);
    assert_eq!(report.corrected, 0);
    assert_eq!(report.failures, 0, "a held lease is a skip, not a failure");

    let row = playlist_repo::find_by_id(&pool, playlist_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.item_count, 100, "a deferred correction must write nothing");
}

#[tokio::test]
#[ignore]
async fn whole_pass_lands_as_one_audit_entry() {
    let pool = common::setup_test_db().await.expect("test db");
    for i in 0..3 {
        let playlist_id =
            common::seed_playlist(&pool, &format!("PL-verify-batch-{}", i), &format!("verify-batch-{}", i))
                .await;
        set_stored_count(&pool, playlist_id, 10).await;
    }

    let upstream = Arc::new(StubUpstream::new());
    for i in 0..3 {
        upstream.set_items(
            &format!("PL-verify-batch-{}", i),
            (0..15).map(|j| common::remote_item(&format!("b{}-v{}", i, j), j)).collect(),
        );
    }
    // One playlist's fetch fails; the pass continues and the failure lands
    // in the same batch entry.
    upstream.mark_failing("PL-verify-batch-2");

    let trace_id = Uuid::new_v4();
    let report = verification_job(&pool, upstream)
        .run("scheduler", trace_id)
        .await
        .unwrap();

    assert_eq!(report.checked, 2);
    assert_eq!(report.corrected, 2);
    assert_eq!(report.failures, 1);

    let entries = activity_repo::list_recent(&pool, 10).await.unwrap();
    assert_eq!(entries.len(), 1, "one batch entry per pass, not one per playlist");
    assert_eq!(entries[0].action, "verification_completed");
    assert_eq!(entries[0].trace_id, trace_id);
}
