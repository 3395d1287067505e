//! Batch jobs behind the internal trigger endpoints.
//!
//! Jobs own no timing: an external scheduler (cron, systemd timer) hits the
//! `/internal/sync/*` endpoints on whatever cadence operations wants, and
//! every job is written to tolerate overlapping invocations from multiple
//! replicas.

pub mod feed_sweep;
pub mod full_sync;
pub mod idle_sweep;
pub mod verification;

pub use feed_sweep::FeedSweepJob;
pub use full_sync::FullSyncJob;
pub use idle_sweep::IdleSweepJob;
pub use verification::VerificationJob;
