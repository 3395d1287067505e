/// Database access layer
///
/// Repositories are free functions over `&PgPool` returning
/// `Result<_, sqlx::Error>`. All cross-worker coordination (leases, the
/// full-sync single-flight flag) is a conditional UPDATE checked through
/// `rows_affected()`; nothing is coordinated in process memory.
use sqlx::migrate::Migrator;

pub mod activity_repo;
pub mod playlist_repo;
pub mod settings_repo;
pub mod sync_state_repo;
pub mod sync_status_repo;
pub mod video_repo;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");
