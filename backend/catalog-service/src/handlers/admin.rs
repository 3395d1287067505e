//! Admin operations - manual sync, video repair, audit log reads.
//!
//! Everything here is invoked by a human (or the admin dashboard acting for
//! one), so responses return the full structured outcome rather than a bare
//! status: the operator wants to see what the operation actually did.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::activity_repo;
use crate::error::Result;
use crate::jobs::VerificationJob;
use crate::models::ActivityEntry;
use crate::services::ops::{PlaylistSyncOutcome, VideoFixOutcome, VideoPurgeOutcome};
use crate::services::AdminOps;
use sqlx::PgPool;

const ADMIN_ACTOR: &str = "admin";

#[derive(Debug, Deserialize, ToSchema)]
pub struct SyncPlaylistRequest {
    /// Skip strategy selection and force a full rebuild.
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    #[serde(default = "default_activity_limit")]
    pub limit: i64,
}

fn default_activity_limit() -> i64 {
    50
}

/// POST /api/v1/admin/playlists/{id}/sync
#[utoipa::path(
    post,
    path = "/api/v1/admin/playlists/{id}/sync",
    tag = "Admin",
    request_body = SyncPlaylistRequest,
    params(("id" = Uuid, Path, description = "Playlist id")),
    responses(
        (status = 200, description = "Rebuild applied", body = PlaylistSyncOutcome),
        (status = 404, description = "Unknown playlist"),
        (status = 409, description = "Another worker holds the playlist lease")
    )
)]
pub async fn sync_playlist(
    ops: web::Data<AdminOps>,
    path: web::Path<Uuid>,
    req: web::Json<SyncPlaylistRequest>,
) -> Result<HttpResponse> {
    let outcome = ops
        .sync_playlist(path.into_inner(), req.force, ADMIN_ACTOR)
        .await?;
    Ok(HttpResponse::Ok().json(outcome))
}

/// POST /api/v1/admin/videos/{remote_id}/fix
#[utoipa::path(
    post,
    path = "/api/v1/admin/videos/{remote_id}/fix",
    tag = "Admin",
    params(("remote_id" = String, Path, description = "Platform video id")),
    responses(
        (status = 200, description = "Video reconciled", body = VideoFixOutcome),
        (status = 404, description = "Video unknown both locally and upstream")
    )
)]
pub async fn fix_video(
    ops: web::Data<AdminOps>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let outcome = ops.fix_video(&path.into_inner(), ADMIN_ACTOR).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

/// DELETE /api/v1/admin/videos/{remote_id}
#[utoipa::path(
    delete,
    path = "/api/v1/admin/videos/{remote_id}",
    tag = "Admin",
    params(("remote_id" = String, Path, description = "Platform video id")),
    responses(
        (status = 200, description = "Video purged", body = VideoPurgeOutcome),
        (status = 404, description = "No such video")
    )
)]
pub async fn purge_video(
    ops: web::Data<AdminOps>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let outcome = ops.purge_video(&path.into_inner(), ADMIN_ACTOR).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

/// POST /api/v1/admin/verification/run
#[utoipa::path(
    post,
    path = "/api/v1/admin/verification/run",
    tag = "Admin",
    responses(
        (status = 200, description = "Verification finished; body carries corrections and errors")
    )
)]
pub async fn run_verification(job: web::Data<VerificationJob>) -> Result<HttpResponse> {
    let trace_id = Uuid::new_v4();
    let report = job.run(ADMIN_ACTOR, trace_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "trace_id": trace_id,
        "report": report
    })))
}

/// GET /api/v1/admin/activity?limit=N
#[utoipa::path(
    get,
    path = "/api/v1/admin/activity",
    tag = "Admin",
    params(("limit" = i64, Query, description = "Max entries, default 50, cap 200")),
    responses(
        (status = 200, description = "Recent audit entries, newest first")
    )
)]
pub async fn list_activity(
    pool: web::Data<PgPool>,
    query: web::Query<ActivityQuery>,
) -> Result<HttpResponse> {
    let limit = query.limit.clamp(1, 200);
    let entries: Vec<ActivityEntry> = activity_repo::list_recent(&pool, limit)
        .await?
        .into_iter()
        .map(ActivityEntry::from)
        .collect();
    Ok(HttpResponse::Ok().json(entries))
}
