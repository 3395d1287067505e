//! Single-flight semantics of the legacy catalog-wide sync.
//!
//! The `sync_status` row is the coarse compare-and-set guard: one run at a
//! time, a second trigger rejected outright, a crashed run's stale marker
//! taken over after the staleness window.

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use catalog_service::cache::{CacheCascade, CdnPurger, LocalCache, Revalidator};
use catalog_service::config::{CdnConfig, RevalidateConfig};
use catalog_service::db::sync_status_repo;
use catalog_service::error::AppError;
use catalog_service::jobs::FullSyncJob;
use catalog_service::services::{LeaseManager, PlaylistRebuilder};
use common::StubUpstream;

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

fn full_sync_job(pool: &sqlx::PgPool, upstream: Arc<StubUpstream>) -> FullSyncJob {
    let lease = LeaseManager::new(pool.clone(), 30);
    let rebuilder = PlaylistRebuilder::new(pool.clone(), upstream, 40);
    FullSyncJob::new(pool.clone(), lease, rebuilder, noop_cascade(), 900)
}

#[tokio::test]
#[ignore] // Run manually: cargo test --test full_sync_test -- --ignored
async fn begin_is_exclusive_until_finished() {
    let pool = common::setup_test_db().await.expect("test db");
    let stale_before = Utc::now() - chrono::Duration::seconds(900);

    assert!(sync_status_repo::try_begin(&pool, stale_before).await.unwrap());
    assert!(
        !sync_status_repo::try_begin(&pool, stale_before).await.unwrap(),
        "the slot is single-flight"
    );

    sync_status_repo::finish(&pool, None).await.unwrap();
    assert!(sync_status_repo::try_begin(&pool, stale_before).await.unwrap());
}

#[tokio::test]
#[ignore]
async fn second_concurrent_run_is_rejected_without_touching_the_first() {
    let pool = common::setup_test_db().await.expect("test db");
    common::seed_playlist(&pool, "PL-full-1", "full-1").await;

    // A running sync, as another worker would have marked it.
    let stale_before = Utc::now() - chrono::Duration::seconds(900);
    assert!(sync_status_repo::try_begin(&pool, stale_before).await.unwrap());
    let running = sync_status_repo::get(&pool).await.unwrap();

    let upstream = Arc::new(StubUpstream::new());
    upstream.set_items("PL-full-1", vec![common::remote_item("v1", 0)]);

    let err = full_sync_job(&pool, upstream)
        .run("admin", Uuid::new_v4())
        .await
        .expect_err("second run must be rejected");
    assert!(matches!(err, AppError::SyncInProgress));

    // The running sync's marker is untouched by the rejection.
    let after = sync_status_repo::get(&pool).await.unwrap();
    assert!(after.is_syncing);
    assert_eq!(after.started_at, running.started_at);
}

#[tokio::test]
#[ignore]
async fn stale_marker_from_a_crashed_run_is_taken_over() {
    let pool = common::setup_test_db().await.expect("test db");
    common::seed_playlist(&pool, "PL-full-2", "full-2").await;

    let stale_before = Utc::now() - chrono::Duration::seconds(900);
    assert!(sync_status_repo::try_begin(&pool, stale_before).await.unwrap());
    // Backdate the marker past the staleness window, as a crashed worker
    // would have left it.
    sqlx::query("UPDATE sync_status SET started_at = now() - interval '1 hour' WHERE id")
        .execute(&pool)
        .await
        .unwrap();

    let upstream = Arc::new(StubUpstream::new());
    upstream.set_items("PL-full-2", vec![common::remote_item("v1", 0)]);

    let report = full_sync_job(&pool, upstream)
        .run("admin", Uuid::new_v4())
        .await
        .expect("stale marker must be reclaimable");
    assert_eq!(report.rebuilt, 1);

    let status = sync_status_repo::get(&pool).await.unwrap();
    assert!(!status.is_syncing);
    assert!(status.last_sync_at.is_some());
}

#[tokio::test]
#[ignore]
async fn failed_run_releases_the_slot_and_records_the_error() {
    let pool = common::setup_test_db().await.expect("test db");
    common::seed_playlist(&pool, "PL-full-3", "full-3").await;

    // Missing credentials is the fatal-configuration case: the run aborts.
    let upstream = Arc::new(StubUpstream::without_credentials());

    let err = full_sync_job(&pool, upstream)
        .run("admin", Uuid::new_v4())
        .await
        .expect_err("missing credentials must abort the run");
    assert!(matches!(err, AppError::Config(_)));

    let status = sync_status_repo::get(&pool).await.unwrap();
    assert!(!status.is_syncing, "the slot must not stay wedged after a failure");
    assert!(status.last_error.is_some());
}
