//! Homepage composition against a real database.
//!
//! Pins the dedupe and minimum-count guarantees: a pinned video never
//! appears twice, a thin catalog clamps to what exists, and an empty
//! catalog is a labeled empty list rather than an error.

mod common;

use catalog_service::services::homepage;

#[tokio::test]
#[ignore] // Run manually: cargo test --test homepage_test -- --ignored
async fn pinned_video_in_playlist_appears_exactly_once() {
    let pool = common::setup_test_db().await.expect("test db");
    let playlist_id = common::seed_playlist(&pool, "PL-home-1", "home-1").await;

    let mut video_ids = Vec::new();
    for i in 0..6 {
        let video_id = common::seed_video(&pool, &format!("home1-v{}", i), i).await;
        common::link_video(&pool, playlist_id, video_id).await;
        video_ids.push(video_id);
    }
    common::feature_playlist(&pool, playlist_id).await;
    // Pin the newest playlist video, the one the playlist fill would pick
    // first anyway.
    common::pin_video(&pool, video_ids[0]).await;

    let feed = homepage::compose(&pool, 5).await.unwrap();

    assert_eq!(feed.videos.len(), 5);
    assert_eq!(feed.videos[0].remote_id, "home1-v0", "pinned video leads");
    let pinned_occurrences = feed
        .videos
        .iter()
        .filter(|v| v.remote_id == "home1-v0")
        .count();
    assert_eq!(pinned_occurrences, 1);
    assert_eq!(feed.source, "pinned+playlist");
}

#[tokio::test]
#[ignore]
async fn thin_catalog_clamps_to_active_count() {
    let pool = common::setup_test_db().await.expect("test db");
    let playlist_id = common::seed_playlist(&pool, "PL-home-2", "home-2").await;

    for i in 0..2 {
        let video_id = common::seed_video(&pool, &format!("home2-v{}", i), i).await;
        common::link_video(&pool, playlist_id, video_id).await;
    }
    common::feature_playlist(&pool, playlist_id).await;

    let feed = homepage::compose(&pool, 5).await.unwrap();

    // min(minimum, total_active): two videos exist, so two come back.
    assert_eq!(feed.videos.len(), 2);
    let unique: std::collections::HashSet<_> =
        feed.videos.iter().map(|v| v.remote_id.as_str()).collect();
    assert_eq!(unique.len(), 2, "no duplicates");
    assert_eq!(feed.source, "playlist");
}

#[tokio::test]
#[ignore]
async fn latest_videos_supplement_a_short_playlist() {
    let pool = common::setup_test_db().await.expect("test db");
    let playlist_id = common::seed_playlist(&pool, "PL-home-3", "home-3").await;

    for i in 0..2 {
        let video_id = common::seed_video(&pool, &format!("home3-v{}", i), i).await;
        common::link_video(&pool, playlist_id, video_id).await;
    }
    // Catalog videos outside the playlist, available as supplement.
    for i in 0..4 {
        common::seed_video(&pool, &format!("home3-extra{}", i), 10 + i).await;
    }
    common::feature_playlist(&pool, playlist_id).await;

    let feed = homepage::compose(&pool, 5).await.unwrap();

    assert_eq!(feed.videos.len(), 5);
    let unique: std::collections::HashSet<_> =
        feed.videos.iter().map(|v| v.remote_id.as_str()).collect();
    assert_eq!(unique.len(), 5);
    assert_eq!(feed.source, "playlist+latest");
}

#[tokio::test]
#[ignore]
async fn empty_catalog_yields_labeled_empty_list() {
    let pool = common::setup_test_db().await.expect("test db");

    let feed = homepage::compose(&pool, 5).await.unwrap();

    assert!(feed.videos.is_empty());
    assert_eq!(feed.source, "empty-catalog");
}

#[tokio::test]
#[ignore]
async fn deactivated_pinned_video_is_skipped() {
    let pool = common::setup_test_db().await.expect("test db");
    let playlist_id = common::seed_playlist(&pool, "PL-home-4", "home-4").await;

    let pinned = common::seed_video(&pool, "home4-pinned", 0).await;
    common::pin_video(&pool, pinned).await;
    sqlx::query("UPDATE videos SET is_active = FALSE WHERE id = $1")
        .bind(pinned)
        .execute(&pool)
        .await
        .unwrap();

    let fill = common::seed_video(&pool, "home4-v1", 1).await;
    common::link_video(&pool, playlist_id, fill).await;
    common::feature_playlist(&pool, playlist_id).await;

    let feed = homepage::compose(&pool, 5).await.unwrap();

    assert!(feed.videos.iter().all(|v| v.remote_id != "home4-pinned"));
    assert_eq!(feed.source, "playlist");
}
