//! Catalog Service Library
//!
//! Mirrors curated platform playlists into local storage and keeps every
//! cache tier coherent with what is stored. Change detection is
//! conditional-fetch based, rebuilds run under per-playlist leases, and an
//! idle fingerprint probe plus a drift-verification job catch whatever the
//! cheap paths miss.
//!
//! # Modules
//!
//! - `handlers`: HTTP request handlers (triggers, admin, catalog reads)
//! - `jobs`: batch jobs behind the internal trigger endpoints
//! - `services`: sync strategy, lease, change detection, rebuild, homepage
//! - `db`: repositories over PostgreSQL
//! - `cache`: local cache tier and the three-tier invalidation cascade
//! - `models`: stored rows, reports, audit payloads
//! - `error`: service error type and HTTP mapping
//! - `config`: environment configuration
//! - `metrics`: Prometheus collectors
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod metrics;
pub mod models;
pub mod openapi;
pub mod services;
