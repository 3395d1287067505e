use sqlx::PgPool;

use crate::models::SiteSettings;

/// The singleton settings row; seeded by migration, so always present
pub async fn get(pool: &PgPool) -> Result<SiteSettings, sqlx::Error> {
    let settings = sqlx::query_as::<_, SiteSettings>(
        r#"
        SELECT id, pinned_video_id, featured_playlist_id, updated_at
        FROM site_settings
        WHERE id
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(settings)
}
