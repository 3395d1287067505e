/// OpenAPI documentation for the Telecast Catalog Service
use utoipa::OpenApi;

use crate::handlers::admin::SyncPlaylistRequest;
use crate::models::{
    CascadeOutcome, CountCorrection, FullSyncReport, HomepageFeed, IdleReport, PlaylistSummary,
    PlaylistSyncError, RebuildReport, SweepReport, SyncStrategy, VerificationReport, VideoSummary,
};
use crate::services::ops::{PlaylistSyncOutcome, VideoFixOutcome, VideoPurgeOutcome};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Telecast Catalog Service API",
        version = "1.0.0",
        description = "Playlist synchronization and cache coherence engine. Mirrors \
            platform playlists into local storage via conditional-fetch change \
            detection, lease-guarded rebuilds and drift verification, and keeps \
            the local, CDN and static-page cache tiers coherent after every change."
    ),
    servers(
        (url = "http://localhost:8084", description = "Development server"),
    ),
    paths(
        crate::handlers::sync::trigger_sweep,
        crate::handlers::sync::trigger_idle_probe,
        crate::handlers::sync::trigger_verification,
        crate::handlers::sync::trigger_full_sync,
        crate::handlers::admin::sync_playlist,
        crate::handlers::admin::fix_video,
        crate::handlers::admin::purge_video,
        crate::handlers::admin::run_verification,
        crate::handlers::admin::list_activity,
        crate::handlers::catalog::get_homepage,
        crate::handlers::catalog::list_playlists,
        crate::handlers::catalog::get_playlist
    ),
    components(schemas(
        SyncPlaylistRequest,
        SyncStrategy,
        PlaylistSummary,
        VideoSummary,
        HomepageFeed,
        CascadeOutcome,
        RebuildReport,
        SweepReport,
        IdleReport,
        CountCorrection,
        PlaylistSyncError,
        VerificationReport,
        FullSyncReport,
        PlaylistSyncOutcome,
        VideoFixOutcome,
        VideoPurgeOutcome
    )),
    tags(
        (name = "Sync triggers", description = "Internal endpoints hit by the external scheduler"),
        (name = "Admin", description = "Manual sync, video repair, audit log"),
        (name = "Catalog", description = "Public catalog reads behind the local cache tier"),
    )
)]
pub struct ApiDoc;

impl ApiDoc {
    pub fn openapi_json_path() -> &'static str {
        "/api/v1/openapi.json"
    }
}
