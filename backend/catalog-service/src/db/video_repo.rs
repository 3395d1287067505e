use sqlx::PgPool;
use upstream_client::RemoteItem;
use uuid::Uuid;

use crate::models::Video;

/// Insert or refresh a video from its platform snapshot.
///
/// Re-imports reactivate deactivated rows and bump `sync_version`, so any
/// downstream consumer can tell the metadata was touched even when the
/// visible fields happen to be identical.
pub async fn upsert_remote_item(pool: &PgPool, item: &RemoteItem) -> Result<Uuid, sqlx::Error> {
    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO videos (remote_id, title, description, thumbnail_url, duration_seconds,
                            view_count, like_count, published_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (remote_id) DO UPDATE
        SET title = EXCLUDED.title,
            description = EXCLUDED.description,
            thumbnail_url = EXCLUDED.thumbnail_url,
            duration_seconds = EXCLUDED.duration_seconds,
            view_count = EXCLUDED.view_count,
            like_count = EXCLUDED.like_count,
            published_at = EXCLUDED.published_at,
            is_active = TRUE,
            sync_version = videos.sync_version + 1,
            updated_at = now()
        RETURNING id
        "#,
    )
    .bind(&item.id)
    .bind(&item.title)
    .bind(&item.description)
    .bind(&item.thumbnail_url)
    .bind(item.duration_seconds)
    .bind(item.view_count)
    .bind(item.like_count)
    .bind(item.published_at)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Video>, sqlx::Error> {
    let video = sqlx::query_as::<_, Video>(
        r#"
        SELECT id, remote_id, title, description, thumbnail_url, duration_seconds,
               view_count, like_count, published_at, is_active, sync_version,
               created_at, updated_at
        FROM videos
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(video)
}

pub async fn find_by_remote_id(
    pool: &PgPool,
    remote_id: &str,
) -> Result<Option<Video>, sqlx::Error> {
    let video = sqlx::query_as::<_, Video>(
        r#"
        SELECT id, remote_id, title, description, thumbnail_url, duration_seconds,
               view_count, like_count, published_at, is_active, sync_version,
               created_at, updated_at
        FROM videos
        WHERE remote_id = $1
        "#,
    )
    .bind(remote_id)
    .fetch_optional(pool)
    .await?;

    Ok(video)
}

/// The stored membership of a playlist as `(video_id, remote_id)` pairs.
/// This is the local side of every rebuild diff.
pub async fn membership(
    pool: &PgPool,
    playlist_id: Uuid,
) -> Result<Vec<(Uuid, String)>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (Uuid, String)>(
        r#"
        SELECT v.id, v.remote_id
        FROM playlist_videos pv
        JOIN videos v ON v.id = pv.video_id
        WHERE pv.playlist_id = $1
        "#,
    )
    .bind(playlist_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn add_membership(
    pool: &PgPool,
    playlist_id: Uuid,
    video_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO playlist_videos (playlist_id, video_id)
        VALUES ($1, $2)
        ON CONFLICT (playlist_id, video_id) DO NOTHING
        "#,
    )
    .bind(playlist_id)
    .bind(video_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Drop one membership row. The video row itself is never touched here;
/// removal from a playlist says nothing about the video's existence.
pub async fn remove_membership(
    pool: &PgPool,
    playlist_id: Uuid,
    video_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM playlist_videos WHERE playlist_id = $1 AND video_id = $2")
        .bind(playlist_id)
        .bind(video_id)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn remove_all_memberships(pool: &PgPool, video_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM playlist_videos WHERE video_id = $1")
        .bind(video_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// Active videos of a playlist, newest first
pub async fn videos_in_playlist(
    pool: &PgPool,
    playlist_id: Uuid,
    limit: i64,
) -> Result<Vec<Video>, sqlx::Error> {
    let videos = sqlx::query_as::<_, Video>(
        r#"
        SELECT v.id, v.remote_id, v.title, v.description, v.thumbnail_url, v.duration_seconds,
               v.view_count, v.like_count, v.published_at, v.is_active, v.sync_version,
               v.created_at, v.updated_at
        FROM playlist_videos pv
        JOIN videos v ON v.id = pv.video_id
        WHERE pv.playlist_id = $1 AND v.is_active
        ORDER BY v.published_at DESC
        LIMIT $2
        "#,
    )
    .bind(playlist_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(videos)
}

/// Newest active videos across the whole catalog, skipping already
/// selected ids; the homepage supplement stage.
pub async fn latest_active_excluding(
    pool: &PgPool,
    exclude: &[Uuid],
    limit: i64,
) -> Result<Vec<Video>, sqlx::Error> {
    let videos = sqlx::query_as::<_, Video>(
        r#"
        SELECT id, remote_id, title, description, thumbnail_url, duration_seconds,
               view_count, like_count, published_at, is_active, sync_version,
               created_at, updated_at
        FROM videos
        WHERE is_active AND id != ALL($1)
        ORDER BY published_at DESC
        LIMIT $2
        "#,
    )
    .bind(exclude)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(videos)
}

/// Soft-remove a video that the platform no longer serves
pub async fn deactivate(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE videos SET is_active = FALSE, updated_at = now() WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() == 1)
}

/// Hard-delete a video row; membership rows go with it via ON DELETE CASCADE.
/// Stored playlist counts are left alone and converge on the next rebuild or
/// verification pass.
pub async fn purge(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM videos WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn count_active(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM videos WHERE is_active")
        .fetch_one(pool)
        .await?;

    Ok(count)
}
