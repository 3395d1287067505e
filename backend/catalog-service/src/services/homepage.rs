//! Homepage composition.
//!
//! Pure function of stored state, no remote calls: pinned video first, then
//! the featured playlist's videos by publish date, then a recency supplement
//! until the minimum display count is met or the catalog runs out. Each
//! video appears at most once regardless of how many stages it qualifies
//! for.

use std::collections::HashSet;

use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{settings_repo, video_repo};
use crate::models::{HomepageFeed, VideoSummary};

/// Compose the homepage feed.
///
/// The `source` label names the stages that contributed, joined with `+`
/// (`pinned+playlist`, `playlist+latest`, ...); an empty catalog yields an
/// empty list labeled `empty-catalog` rather than an error.
pub async fn compose(pool: &PgPool, min_items: usize) -> Result<HomepageFeed, sqlx::Error> {
    let settings = settings_repo::get(pool).await?;

    let mut videos: Vec<VideoSummary> = Vec::with_capacity(min_items);
    let mut selected: HashSet<Uuid> = HashSet::new();
    let mut stages: Vec<&str> = Vec::new();

    if let Some(pinned_id) = settings.pinned_video_id {
        if let Some(video) = video_repo::find_by_id(pool, pinned_id).await? {
            // A pinned video that has since been deactivated is silently
            // skipped; the settings row is not this module's to fix.
            if video.is_active {
                selected.insert(video.id);
                videos.push(video.into());
                stages.push("pinned");
            }
        }
    }

    if videos.len() < min_items {
        if let Some(playlist_id) = settings.featured_playlist_id {
            // Fetch one extra so a pinned video sitting in the playlist's
            // top results does not shrink the fill.
            let fill =
                video_repo::videos_in_playlist(pool, playlist_id, (min_items + 1) as i64).await?;
            let before = videos.len();
            for video in fill {
                if videos.len() >= min_items {
                    break;
                }
                if selected.insert(video.id) {
                    videos.push(video.into());
                }
            }
            if videos.len() > before {
                stages.push("playlist");
            }
        }
    }

    if videos.len() < min_items {
        let exclude: Vec<Uuid> = selected.iter().copied().collect();
        let supplement = video_repo::latest_active_excluding(
            pool,
            &exclude,
            (min_items - videos.len()) as i64,
        )
        .await?;
        let before = videos.len();
        for video in supplement {
            if selected.insert(video.id) {
                videos.push(video.into());
            }
        }
        if videos.len() > before {
            stages.push("latest");
        }
    }

    let source = if stages.is_empty() {
        "empty-catalog".to_string()
    } else {
        stages.join("+")
    };

    Ok(HomepageFeed { source, videos })
}
