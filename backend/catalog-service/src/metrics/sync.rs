use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, HistogramVec,
    IntCounter, IntCounterVec,
};

lazy_static! {
    /// Feed checks by outcome (changed/unchanged/failed).
    pub static ref SYNC_FEED_CHECKS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "catalog_feed_checks_total",
        "Conditional feed checks segmented by outcome",
        &["outcome"]
    )
    .expect("failed to register catalog_feed_checks_total");

    /// Rebuild attempts by strategy and outcome (completed/lease_held/failed).
    pub static ref SYNC_REBUILDS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "catalog_rebuilds_total",
        "Playlist rebuild attempts segmented by strategy and outcome",
        &["strategy", "outcome"]
    )
    .expect("failed to register catalog_rebuilds_total");

    /// Items touched by rebuilds (added/updated/removed).
    pub static ref SYNC_ITEMS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "catalog_sync_items_total",
        "Playlist items touched by rebuilds segmented by change kind",
        &["change"]
    )
    .expect("failed to register catalog_sync_items_total");

    /// Lease acquisition attempts that lost the compare-and-set.
    pub static ref SYNC_LEASE_CONTENTION_TOTAL: IntCounter = register_int_counter!(
        "catalog_lease_contention_total",
        "Rebuild lease acquisitions skipped because another worker held the lease"
    )
    .expect("failed to register catalog_lease_contention_total");

    /// Count corrections written by the verification job.
    pub static ref VERIFICATION_CORRECTIONS_TOTAL: IntCounter = register_int_counter!(
        "catalog_verification_corrections_total",
        "Item-count corrections written by the verification job"
    )
    .expect("failed to register catalog_verification_corrections_total");

    /// Duration of one rebuild, segmented by strategy.
    pub static ref SYNC_REBUILD_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "catalog_rebuild_duration_seconds",
        "Playlist rebuild duration segmented by strategy",
        &["strategy"]
    )
    .expect("failed to register catalog_rebuild_duration_seconds");

    /// Duration of one whole job run, segmented by job kind.
    pub static ref SYNC_JOB_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "catalog_sync_job_duration_seconds",
        "Sync job duration segmented by job (feed_sweep, idle_probe, verification, full_sync)",
        &["job"]
    )
    .expect("failed to register catalog_sync_job_duration_seconds");
}
