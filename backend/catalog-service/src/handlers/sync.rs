//! Internal trigger endpoints hit by the external scheduler.
//!
//! Each endpoint runs one job to completion and returns its report with a
//! `trace_id` correlating the response to audit-log entries. The jobs own
//! all overlap handling, so these handlers stay thin.

use actix_web::{web, HttpResponse};
use uuid::Uuid;

use crate::error::Result;
use crate::jobs::{FeedSweepJob, FullSyncJob, IdleSweepJob, VerificationJob};

const SCHEDULER_ACTOR: &str = "scheduler";

/// POST /internal/sync/sweep
#[utoipa::path(
    post,
    path = "/internal/sync/sweep",
    tag = "Sync triggers",
    responses(
        (status = 200, description = "Sweep finished; body carries the sweep report"),
        (status = 500, description = "Fatal configuration or database error")
    )
)]
pub async fn trigger_sweep(job: web::Data<FeedSweepJob>) -> Result<HttpResponse> {
    let trace_id = Uuid::new_v4();
    let report = job.run(SCHEDULER_ACTOR, trace_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "trace_id": trace_id,
        "report": report
    })))
}

/// POST /internal/sync/idle
#[utoipa::path(
    post,
    path = "/internal/sync/idle",
    tag = "Sync triggers",
    responses(
        (status = 200, description = "Probe finished; body carries the probe report")
    )
)]
pub async fn trigger_idle_probe(job: web::Data<IdleSweepJob>) -> Result<HttpResponse> {
    let trace_id = Uuid::new_v4();
    let report = job.run(SCHEDULER_ACTOR, trace_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "trace_id": trace_id,
        "report": report
    })))
}

/// POST /internal/sync/verify
#[utoipa::path(
    post,
    path = "/internal/sync/verify",
    tag = "Sync triggers",
    responses(
        (status = 200, description = "Verification finished; body carries corrections and errors")
    )
)]
pub async fn trigger_verification(job: web::Data<VerificationJob>) -> Result<HttpResponse> {
    let trace_id = Uuid::new_v4();
    let report = job.run(SCHEDULER_ACTOR, trace_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "trace_id": trace_id,
        "report": report
    })))
}

/// POST /internal/sync/full
#[utoipa::path(
    post,
    path = "/internal/sync/full",
    tag = "Sync triggers",
    responses(
        (status = 200, description = "Full sync finished; body carries the run report"),
        (status = 409, description = "Another full sync is already running")
    )
)]
pub async fn trigger_full_sync(job: web::Data<FullSyncJob>) -> Result<HttpResponse> {
    let trace_id = Uuid::new_v4();
    let report = job.run(SCHEDULER_ACTOR, trace_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "trace_id": trace_id,
        "report": report
    })))
}
