/// Configuration management for Catalog Service
///
/// This module handles loading and managing configuration from environment
/// variables. Sync cadence itself is not configured here: external cron owns
/// all timing and this service only exposes trigger endpoints.
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// CORS configuration
    pub cors: CorsConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Upstream video platform configuration
    pub upstream: UpstreamConfig,
    /// Sync engine tuning
    pub sync: SyncConfig,
    /// Homepage composition settings
    pub homepage: HomepageConfig,
    /// Cache tiers (local, CDN, static regeneration)
    pub cache: CacheConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (dev, staging, prod)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated list of allowed origins
    pub allowed_origins: String,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL
    pub url: String,
    /// Max connections in pool
    pub max_connections: u32,
}

/// Upstream video platform configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the data API
    pub api_base_url: String,
    /// Base URL of the public feed host
    pub feed_base_url: String,
    /// Data API key; feed checks work without one
    pub api_key: Option<String>,
    /// Items requested per page (platform caps at 50)
    pub page_size: u32,
    /// Page ceiling for full enumerations
    pub max_pages: u32,
    /// Tighter page ceiling for verification passes
    pub verify_max_pages: u32,
    /// Hard per-request timeout in seconds
    pub timeout_secs: u64,
}

/// Sync engine tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Concurrent feed checks per sweep
    pub sweep_concurrency: usize,
    /// Concurrent playlist rebuilds per sweep
    pub rebuild_concurrency: usize,
    /// Rebuild lease time-to-live in seconds
    pub lease_ttl_secs: i64,
    /// Days before a stored count must be fully re-enumerated
    pub full_recount_days: i64,
    /// Relative count drift that triggers a verification correction
    pub count_drift_ratio: f64,
    /// Age after which a running catalog-wide sync is presumed crashed
    pub status_stale_secs: i64,
}

/// Homepage composition settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomepageConfig {
    /// Minimum number of videos the homepage should carry
    pub min_items: usize,
}

/// Cache tiers (local, CDN, static regeneration)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Public site base URL, prepended to paths for CDN purges
    pub site_base_url: String,
    /// Local tier: per-entry TTL in seconds
    pub local_ttl_secs: u64,
    /// Local tier: entry cap before eviction
    pub local_max_entries: usize,
    /// CDN purge API
    pub cdn: CdnConfig,
    /// Static-regeneration endpoint
    pub revalidate: RevalidateConfig,
}

/// CDN purge API configuration; empty token or zone disables the tier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdnConfig {
    pub api_base_url: String,
    pub zone_id: String,
    pub api_token: String,
    /// Cache tag used by the coarse fallback purge
    pub purge_tag: String,
    pub timeout_secs: u64,
}

/// Static-regeneration endpoint configuration; empty URL disables the tier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevalidateConfig {
    pub url: String,
    pub secret: String,
    pub timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let production = app_env.eq_ignore_ascii_case("production");

        Ok(Config {
            app: AppConfig {
                env: app_env.clone(),
                host: std::env::var("CATALOG_SERVICE_HOST")
                    .unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("CATALOG_SERVICE_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8084),
            },
            cors: {
                let allowed_origins = match std::env::var("CORS_ALLOWED_ORIGINS") {
                    Ok(value) => value,
                    Err(_) if production => {
                        return Err("CORS_ALLOWED_ORIGINS must be set in production".to_string())
                    }
                    Err(_) => "http://localhost:3000".to_string(),
                };

                if production && allowed_origins.trim() == "*" {
                    return Err("CORS_ALLOWED_ORIGINS cannot be '*' in production".to_string());
                }

                CorsConfig { allowed_origins }
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "postgresql://localhost/catalog".to_string()),
                max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|c| c.parse().ok())
                    .unwrap_or(10),
            },
            upstream: {
                let api_key = std::env::var("UPSTREAM_API_KEY")
                    .ok()
                    .filter(|key| !key.trim().is_empty());
                if production && api_key.is_none() {
                    return Err("UPSTREAM_API_KEY must be set in production".to_string());
                }

                UpstreamConfig {
                    api_base_url: std::env::var("UPSTREAM_API_BASE_URL")
                        .unwrap_or_else(|_| "https://api.video-platform.example/v3".to_string()),
                    feed_base_url: std::env::var("UPSTREAM_FEED_BASE_URL")
                        .unwrap_or_else(|_| "https://www.video-platform.example".to_string()),
                    api_key,
                    page_size: std::env::var("UPSTREAM_PAGE_SIZE")
                        .ok()
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(50),
                    max_pages: std::env::var("UPSTREAM_MAX_PAGES")
                        .ok()
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(40),
                    verify_max_pages: std::env::var("UPSTREAM_VERIFY_MAX_PAGES")
                        .ok()
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(30),
                    timeout_secs: std::env::var("UPSTREAM_TIMEOUT_SECS")
                        .ok()
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(10),
                }
            },
            sync: SyncConfig {
                sweep_concurrency: std::env::var("SYNC_SWEEP_CONCURRENCY")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(8),
                rebuild_concurrency: std::env::var("SYNC_REBUILD_CONCURRENCY")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(2),
                lease_ttl_secs: std::env::var("SYNC_LEASE_TTL_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(30),
                full_recount_days: std::env::var("SYNC_FULL_RECOUNT_DAYS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(7),
                count_drift_ratio: parse_env_or_default("SYNC_COUNT_DRIFT_RATIO", 0.01)?,
                status_stale_secs: std::env::var("SYNC_STATUS_STALE_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(900),
            },
            homepage: HomepageConfig {
                min_items: std::env::var("HOMEPAGE_MIN_ITEMS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(12),
            },
            cache: {
                let revalidate_url = std::env::var("REVALIDATE_URL").unwrap_or_default();
                let revalidate_secret = std::env::var("REVALIDATE_SECRET").unwrap_or_default();
                if production
                    && !revalidate_url.trim().is_empty()
                    && (revalidate_secret.trim().is_empty() || revalidate_secret == "changeme")
                {
                    return Err(
                        "REVALIDATE_SECRET must be set to a non-default value in production"
                            .to_string(),
                    );
                }

                CacheConfig {
                    site_base_url: std::env::var("SITE_BASE_URL")
                        .unwrap_or_else(|_| "http://localhost:3000".to_string()),
                    local_ttl_secs: std::env::var("LOCAL_CACHE_TTL_SECS")
                        .ok()
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(60),
                    local_max_entries: std::env::var("LOCAL_CACHE_MAX_ENTRIES")
                        .ok()
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(1024),
                    cdn: CdnConfig {
                        api_base_url: std::env::var("CDN_API_BASE")
                            .unwrap_or_else(|_| "https://api.cdn.example/v4".to_string()),
                        zone_id: std::env::var("CDN_ZONE_ID").unwrap_or_default(),
                        api_token: std::env::var("CDN_API_TOKEN").unwrap_or_default(),
                        purge_tag: std::env::var("CDN_PURGE_TAG")
                            .unwrap_or_else(|_| "catalog".to_string()),
                        timeout_secs: std::env::var("CDN_TIMEOUT_SECS")
                            .ok()
                            .and_then(|v| v.parse().ok())
                            .unwrap_or(10),
                    },
                    revalidate: RevalidateConfig {
                        url: revalidate_url,
                        secret: revalidate_secret,
                        timeout_secs: std::env::var("REVALIDATE_TIMEOUT_SECS")
                            .ok()
                            .and_then(|v| v.parse().ok())
                            .unwrap_or(10),
                    },
                }
            },
        })
    }
}

fn parse_env_or_default(key: &str, default: f64) -> Result<f64, String> {
    match std::env::var(key) {
        Ok(val) => val
            .parse()
            .map_err(|e| format!("Failed to parse {}='{}': {}", key, val, e)),
        Err(_) => Ok(default),
    }
}
