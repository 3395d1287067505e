//! Public catalog reads consumed by the display layer.
//!
//! Every response flows through the in-process cache tier: the handler
//! serves the cached serialized body when present and rebuilds it from
//! storage on a miss. The invalidation cascade clears these keys after
//! every rebuild, so a hit is never staler than the last sync.

use std::sync::Arc;

use actix_web::{web, HttpResponse};
use sqlx::PgPool;

use crate::cache::local::{self, LocalCache};
use crate::config::Config;
use crate::db::{playlist_repo, video_repo};
use crate::error::{AppError, Result};
use crate::models::{HomepageFeed, PlaylistSummary, VideoSummary};
use crate::services::homepage;

/// Upper bound on videos returned in one playlist detail response.
const PLAYLIST_DETAIL_VIDEO_LIMIT: i64 = 200;

fn json_body(body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("application/json")
        .body(body)
}

/// GET /api/v1/homepage
#[utoipa::path(
    get,
    path = "/api/v1/homepage",
    tag = "Catalog",
    responses(
        (status = 200, description = "Composed homepage feed with its source label", body = HomepageFeed)
    )
)]
pub async fn get_homepage(
    pool: web::Data<PgPool>,
    cache: web::Data<Arc<LocalCache>>,
    config: web::Data<Config>,
) -> Result<HttpResponse> {
    let key = local::homepage_key();
    if let Some(body) = cache.get(&key) {
        return Ok(json_body(body));
    }

    let feed = homepage::compose(&pool, config.homepage.min_items).await?;
    let body = serde_json::to_string(&feed)?;
    cache.insert(key, body.clone());
    Ok(json_body(body))
}

/// GET /api/v1/playlists
#[utoipa::path(
    get,
    path = "/api/v1/playlists",
    tag = "Catalog",
    responses(
        (status = 200, description = "Active playlists ordered by title", body = Vec<PlaylistSummary>)
    )
)]
pub async fn list_playlists(
    pool: web::Data<PgPool>,
    cache: web::Data<Arc<LocalCache>>,
) -> Result<HttpResponse> {
    let key = local::playlist_index_key();
    if let Some(body) = cache.get(&key) {
        return Ok(json_body(body));
    }

    let playlists: Vec<PlaylistSummary> = playlist_repo::list_active(&pool)
        .await?
        .into_iter()
        .map(PlaylistSummary::from)
        .collect();
    let body = serde_json::to_string(&playlists)?;
    cache.insert(key, body.clone());
    Ok(json_body(body))
}

/// GET /api/v1/playlists/{slug}
#[utoipa::path(
    get,
    path = "/api/v1/playlists/{slug}",
    tag = "Catalog",
    params(("slug" = String, Path, description = "Playlist slug")),
    responses(
        (status = 200, description = "Playlist with its videos by publish date"),
        (status = 404, description = "No active playlist under this slug")
    )
)]
pub async fn get_playlist(
    pool: web::Data<PgPool>,
    cache: web::Data<Arc<LocalCache>>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let slug = path.into_inner();
    let key = local::playlist_key(&slug);
    if let Some(body) = cache.get(&key) {
        return Ok(json_body(body));
    }

    let playlist = playlist_repo::find_by_slug(&pool, &slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("playlist {}", slug)))?;

    let videos: Vec<VideoSummary> =
        video_repo::videos_in_playlist(&pool, playlist.id, PLAYLIST_DETAIL_VIDEO_LIMIT)
            .await?
            .into_iter()
            .map(VideoSummary::from)
            .collect();

    let body = serde_json::to_string(&serde_json::json!({
        "playlist": PlaylistSummary::from(playlist),
        "videos": videos
    }))?;
    cache.insert(key, body.clone());
    Ok(json_body(body))
}
