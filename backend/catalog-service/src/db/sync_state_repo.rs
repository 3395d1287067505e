use sqlx::PgPool;

use crate::models::SyncStateRow;

pub async fn find(pool: &PgPool, feed_url: &str) -> Result<Option<SyncStateRow>, sqlx::Error> {
    let state = sqlx::query_as::<_, SyncStateRow>(
        r#"
        SELECT feed_url, etag, last_modified, last_status, checked_at
        FROM sync_state
        WHERE feed_url = $1
        "#,
    )
    .bind(feed_url)
    .fetch_optional(pool)
    .await?;

    Ok(state)
}

/// Record the outcome of a feed check.
///
/// Called after every check, success or not. `COALESCE` keeps the stored
/// validators when a failed or 304 response carried none; a validator is
/// only ever replaced by a fresh one.
pub async fn record_check(
    pool: &PgPool,
    feed_url: &str,
    etag: Option<&str>,
    last_modified: Option<&str>,
    last_status: Option<i16>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO sync_state (feed_url, etag, last_modified, last_status, checked_at)
        VALUES ($1, $2, $3, $4, now())
        ON CONFLICT (feed_url) DO UPDATE
        SET etag = COALESCE(EXCLUDED.etag, sync_state.etag),
            last_modified = COALESCE(EXCLUDED.last_modified, sync_state.last_modified),
            last_status = EXCLUDED.last_status,
            checked_at = now()
        "#,
    )
    .bind(feed_url)
    .bind(etag)
    .bind(last_modified)
    .bind(last_status)
    .execute(pool)
    .await?;

    Ok(())
}
