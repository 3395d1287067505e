use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::SyncStatusRow;

/// The singleton status row; seeded by migration, so always present
pub async fn get(pool: &PgPool) -> Result<SyncStatusRow, sqlx::Error> {
    let status = sqlx::query_as::<_, SyncStatusRow>(
        r#"
        SELECT id, is_syncing, current_playlist_id, started_at, last_sync_at, last_error
        FROM sync_status
        WHERE id
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(status)
}

/// Claim the catalog-wide sync slot.
///
/// Compare-and-set against the single row: the claim succeeds when no sync
/// is marked running, or when the marked one started before `stale_before`
/// and is presumed crashed. Exactly one of any number of concurrent callers
/// sees `true`.
pub async fn try_begin(pool: &PgPool, stale_before: DateTime<Utc>) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE sync_status
        SET is_syncing = TRUE,
            started_at = now(),
            current_playlist_id = NULL,
            last_error = NULL
        WHERE id AND (NOT is_syncing OR started_at IS NULL OR started_at < $1)
        "#,
    )
    .bind(stale_before)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Progress marker so operators can see which playlist a running sync is on
pub async fn set_current_playlist(
    pool: &PgPool,
    playlist_id: Option<Uuid>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE sync_status SET current_playlist_id = $1 WHERE id")
        .bind(playlist_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Release the slot, recording the terminal error if the run failed
pub async fn finish(pool: &PgPool, error: Option<&str>) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE sync_status
        SET is_syncing = FALSE,
            current_playlist_id = NULL,
            last_sync_at = now(),
            last_error = $1
        WHERE id
        "#,
    )
    .bind(error)
    .execute(pool)
    .await?;

    Ok(())
}
