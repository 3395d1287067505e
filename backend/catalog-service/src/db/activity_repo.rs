use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{ActivityDetails, ActivityLog};

/// Append one audit entry. The `action` column is derived from the details
/// variant so the two can never disagree.
pub async fn append(
    pool: &PgPool,
    actor: &str,
    details: &ActivityDetails,
    trace_id: Uuid,
) -> Result<ActivityLog, sqlx::Error> {
    let payload = serde_json::to_value(details).map_err(|err| sqlx::Error::Encode(err.into()))?;

    let entry = sqlx::query_as::<_, ActivityLog>(
        r#"
        INSERT INTO activity_log (actor, action, details, trace_id)
        VALUES ($1, $2, $3, $4)
        RETURNING id, actor, action, details, trace_id, created_at
        "#,
    )
    .bind(actor)
    .bind(details.action().as_str())
    .bind(payload)
    .bind(trace_id)
    .fetch_one(pool)
    .await?;

    Ok(entry)
}

/// Newest entries first
pub async fn list_recent(pool: &PgPool, limit: i64) -> Result<Vec<ActivityLog>, sqlx::Error> {
    let entries = sqlx::query_as::<_, ActivityLog>(
        r#"
        SELECT id, actor, action, details, trace_id, created_at
        FROM activity_log
        ORDER BY created_at DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}
