use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Playlist;

/// Register a playlist for tracking
pub async fn create(
    pool: &PgPool,
    remote_id: &str,
    title: &str,
    slug: &str,
    is_featured: bool,
) -> Result<Playlist, sqlx::Error> {
    let playlist = sqlx::query_as::<_, Playlist>(
        r#"
        INSERT INTO playlists (remote_id, title, slug, is_featured)
        VALUES ($1, $2, $3, $4)
        RETURNING id, remote_id, title, slug, etag, last_modified, fingerprint,
                  fingerprint_checked_at, item_count, lease_owner, lease_expires_at,
                  last_full_count_at, count_verified, incremental_runs, is_featured,
                  is_active, created_at, updated_at
        "#,
    )
    .bind(remote_id)
    .bind(title)
    .bind(slug)
    .bind(is_featured)
    .fetch_one(pool)
    .await?;

    Ok(playlist)
}

/// All playlists still being synchronized, in stable listing order
pub async fn list_active(pool: &PgPool) -> Result<Vec<Playlist>, sqlx::Error> {
    let playlists = sqlx::query_as::<_, Playlist>(
        r#"
        SELECT id, remote_id, title, slug, etag, last_modified, fingerprint,
               fingerprint_checked_at, item_count, lease_owner, lease_expires_at,
               last_full_count_at, count_verified, incremental_runs, is_featured,
               is_active, created_at, updated_at
        FROM playlists
        WHERE is_active
        ORDER BY title ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(playlists)
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Playlist>, sqlx::Error> {
    let playlist = sqlx::query_as::<_, Playlist>(
        r#"
        SELECT id, remote_id, title, slug, etag, last_modified, fingerprint,
               fingerprint_checked_at, item_count, lease_owner, lease_expires_at,
               last_full_count_at, count_verified, incremental_runs, is_featured,
               is_active, created_at, updated_at
        FROM playlists
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(playlist)
}

/// Find an active playlist by its public slug
pub async fn find_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Playlist>, sqlx::Error> {
    let playlist = sqlx::query_as::<_, Playlist>(
        r#"
        SELECT id, remote_id, title, slug, etag, last_modified, fingerprint,
               fingerprint_checked_at, item_count, lease_owner, lease_expires_at,
               last_full_count_at, count_verified, incremental_runs, is_featured,
               is_active, created_at, updated_at
        FROM playlists
        WHERE slug = $1 AND is_active
        "#,
    )
    .bind(slug)
    .fetch_optional(pool)
    .await?;

    Ok(playlist)
}

pub async fn find_by_remote_id(
    pool: &PgPool,
    remote_id: &str,
) -> Result<Option<Playlist>, sqlx::Error> {
    let playlist = sqlx::query_as::<_, Playlist>(
        r#"
        SELECT id, remote_id, title, slug, etag, last_modified, fingerprint,
               fingerprint_checked_at, item_count, lease_owner, lease_expires_at,
               last_full_count_at, count_verified, incremental_runs, is_featured,
               is_active, created_at, updated_at
        FROM playlists
        WHERE remote_id = $1
        "#,
    )
    .bind(remote_id)
    .fetch_optional(pool)
    .await?;

    Ok(playlist)
}

/// Active playlists that currently contain the given video
pub async fn containing_video(
    pool: &PgPool,
    video_id: Uuid,
) -> Result<Vec<Playlist>, sqlx::Error> {
    let playlists = sqlx::query_as::<_, Playlist>(
        r#"
        SELECT p.id, p.remote_id, p.title, p.slug, p.etag, p.last_modified, p.fingerprint,
               p.fingerprint_checked_at, p.item_count, p.lease_owner, p.lease_expires_at,
               p.last_full_count_at, p.count_verified, p.incremental_runs, p.is_featured,
               p.is_active, p.created_at, p.updated_at
        FROM playlists p
        JOIN playlist_videos pv ON pv.playlist_id = p.id
        WHERE pv.video_id = $1 AND p.is_active
        ORDER BY p.title ASC
        "#,
    )
    .bind(video_id)
    .fetch_all(pool)
    .await?;

    Ok(playlists)
}

/// The active featured playlist whose fingerprint was probed longest ago.
/// `NULLS FIRST` so a playlist that has never been probed always wins.
pub async fn next_idle_probe_candidate(pool: &PgPool) -> Result<Option<Playlist>, sqlx::Error> {
    let playlist = sqlx::query_as::<_, Playlist>(
        r#"
        SELECT id, remote_id, title, slug, etag, last_modified, fingerprint,
               fingerprint_checked_at, item_count, lease_owner, lease_expires_at,
               last_full_count_at, count_verified, incremental_runs, is_featured,
               is_active, created_at, updated_at
        FROM playlists
        WHERE is_active AND is_featured
        ORDER BY fingerprint_checked_at ASC NULLS FIRST
        LIMIT 1
        "#,
    )
    .fetch_optional(pool)
    .await?;

    Ok(playlist)
}

/// Try to take the per-playlist rebuild lease.
///
/// The WHERE clause makes this a compare-and-set: the row is claimed only
/// when no lease is held or the held one has expired. Returns whether this
/// caller now owns the lease.
pub async fn acquire_lease(
    pool: &PgPool,
    id: Uuid,
    owner: &str,
    expires_at: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE playlists
        SET lease_owner = $2, lease_expires_at = $3
        WHERE id = $1 AND (lease_owner IS NULL OR lease_expires_at < now())
        "#,
    )
    .bind(id)
    .bind(owner)
    .bind(expires_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Release a lease, but only while still its owner.
///
/// A release attempted after the TTL let another worker take over must be a
/// no-op, otherwise the stale worker would free the new worker's lease.
pub async fn release_lease(pool: &PgPool, id: Uuid, owner: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE playlists
        SET lease_owner = NULL, lease_expires_at = NULL
        WHERE id = $1 AND lease_owner = $2
        "#,
    )
    .bind(id)
    .bind(owner)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Advance the idle-probe clock without touching anything else
pub async fn touch_fingerprint_check(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE playlists SET fingerprint_checked_at = now() WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Persist the outcome of a complete (non-truncated) full enumeration.
///
/// Only this path may rewrite the fingerprint, because only a complete
/// enumeration counted every item. `COALESCE` keeps previously captured
/// validators when the rebuild ran without fresh ones.
pub async fn record_full_rebuild(
    pool: &PgPool,
    id: Uuid,
    fingerprint: &str,
    etag: Option<&str>,
    last_modified: Option<&str>,
    item_count: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE playlists
        SET fingerprint = $2,
            fingerprint_checked_at = now(),
            etag = COALESCE($3, etag),
            last_modified = COALESCE($4, last_modified),
            item_count = $5,
            last_full_count_at = now(),
            count_verified = TRUE,
            incremental_runs = 0,
            updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(fingerprint)
    .bind(etag)
    .bind(last_modified)
    .bind(item_count)
    .execute(pool)
    .await?;

    Ok(())
}

/// Persist what a page-capped enumeration is allowed to claim.
///
/// The fetched prefix gives only a lower bound on the count, so the stored
/// count is never reduced here, the fingerprint stays untouched and the
/// full-count clock does not advance.
pub async fn record_truncated_rebuild(
    pool: &PgPool,
    id: Uuid,
    etag: Option<&str>,
    last_modified: Option<&str>,
    fetched_count: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE playlists
        SET etag = COALESCE($2, etag),
            last_modified = COALESCE($3, last_modified),
            item_count = GREATEST(item_count, $4),
            count_verified = FALSE,
            updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(etag)
    .bind(last_modified)
    .bind(fetched_count)
    .execute(pool)
    .await?;

    Ok(())
}

/// Persist the outcome of a first-page smart sync.
///
/// Smart syncs never see removals, so the incremented count is an estimate;
/// `count_verified` drops until the next full enumeration.
pub async fn record_smart_rebuild(
    pool: &PgPool,
    id: Uuid,
    etag: Option<&str>,
    last_modified: Option<&str>,
    item_count: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE playlists
        SET etag = COALESCE($2, etag),
            last_modified = COALESCE($3, last_modified),
            item_count = $4,
            count_verified = FALSE,
            incremental_runs = incremental_runs + 1,
            updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(etag)
    .bind(last_modified)
    .bind(item_count)
    .execute(pool)
    .await?;

    Ok(())
}
