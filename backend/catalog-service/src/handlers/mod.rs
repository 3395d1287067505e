/// HTTP handlers for the catalog service
///
/// Three surfaces:
/// - `/internal/sync/*` trigger endpoints for the external scheduler
/// - `/api/v1/admin/*` manual operations and the audit log
/// - `/api/v1/*` public catalog reads behind the local cache tier
pub mod admin;
pub mod catalog;
pub mod sync;

pub use admin::{fix_video, list_activity, purge_video, run_verification, sync_playlist};
pub use catalog::{get_homepage, get_playlist, list_playlists};
pub use sync::{trigger_full_sync, trigger_idle_probe, trigger_sweep, trigger_verification};
