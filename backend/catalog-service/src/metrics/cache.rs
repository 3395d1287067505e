use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter_vec, Histogram, IntCounterVec,
};

lazy_static! {
    /// Local cache events (hit/miss/insert/eviction/invalidation).
    pub static ref LOCAL_CACHE_EVENTS: IntCounterVec = register_int_counter_vec!(
        "catalog_local_cache_events_total",
        "Local response-cache events segmented by outcome",
        &["event"]
    )
    .expect("failed to register catalog_local_cache_events_total");

    /// Invalidation cascade tier results (local/cdn/revalidate x ok/error/skipped).
    pub static ref CACHE_INVALIDATION_TIER_TOTAL: IntCounterVec = register_int_counter_vec!(
        "catalog_cache_invalidation_tier_total",
        "Cache invalidation cascade results segmented by tier and outcome",
        &["tier", "outcome"]
    )
    .expect("failed to register catalog_cache_invalidation_tier_total");

    /// Duration of one full invalidation cascade.
    pub static ref CASCADE_DURATION_SECONDS: Histogram = register_histogram!(
        "catalog_cascade_duration_seconds",
        "Duration of one cache invalidation cascade across all tiers"
    )
    .expect("failed to register catalog_cascade_duration_seconds");
}
