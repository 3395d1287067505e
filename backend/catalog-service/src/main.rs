use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpResponse, HttpServer};
use catalog_service::cache::{CacheCascade, CdnPurger, LocalCache, Revalidator};
use catalog_service::config::Config;
use catalog_service::db;
use catalog_service::handlers;
use catalog_service::jobs::{FeedSweepJob, FullSyncJob, IdleSweepJob, VerificationJob};
use catalog_service::openapi::ApiDoc;
use catalog_service::services::{AdminOps, ChangeDetector, LeaseManager, PlaylistRebuilder};
use chrono::Utc;
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use upstream_client::{UpstreamApi, UpstreamClient, UpstreamClientConfig};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

struct HealthState {
    db_pool: sqlx::Pool<sqlx::Postgres>,
    upstream: Arc<dyn UpstreamApi>,
}

#[derive(Serialize, Clone)]
#[serde(rename_all = "lowercase")]
enum ComponentStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Serialize)]
struct ComponentCheck {
    status: ComponentStatus,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    latency_ms: Option<u64>,
}

#[derive(Serialize)]
struct ReadinessResponse {
    ready: bool,
    status: ComponentStatus,
    checks: HashMap<String, ComponentCheck>,
    timestamp: String,
}

impl HealthState {
    fn new(db_pool: sqlx::Pool<sqlx::Postgres>, upstream: Arc<dyn UpstreamApi>) -> Self {
        Self { db_pool, upstream }
    }

    async fn check_postgres(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.db_pool)
            .await
            .map(|_| ())
    }
}

async fn health_summary(state: web::Data<HealthState>) -> HttpResponse {
    match state.check_postgres().await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "status": "ok",
            "service": "catalog-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
        Err(e) => HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "status": "unhealthy",
            "error": format!("PostgreSQL connection failed: {}", e),
            "service": "catalog-service"
        })),
    }
}

async fn readiness_summary(state: web::Data<HealthState>) -> HttpResponse {
    let mut checks = HashMap::new();
    let mut ready = true;

    let start = Instant::now();
    let pg_result = state.check_postgres().await;
    let pg_latency = Some(start.elapsed().as_millis() as u64);
    let postgres_check = match pg_result {
        Ok(_) => ComponentCheck {
            status: ComponentStatus::Healthy,
            message: "PostgreSQL connection successful".to_string(),
            latency_ms: pg_latency,
        },
        Err(e) => {
            ready = false;
            ComponentCheck {
                status: ComponentStatus::Unhealthy,
                message: format!("PostgreSQL connection failed: {}", e),
                latency_ms: pg_latency,
            }
        }
    };
    checks.insert("postgresql".to_string(), postgres_check);

    // Missing platform credentials degrade sync but catalog reads still
    // serve from storage, so the service stays ready.
    let upstream_check = if state.upstream.has_credentials() {
        ComponentCheck {
            status: ComponentStatus::Healthy,
            message: "Upstream API key configured".to_string(),
            latency_ms: None,
        }
    } else {
        ComponentCheck {
            status: ComponentStatus::Degraded,
            message: "UPSTREAM_API_KEY not set; playlist rebuilds will fail".to_string(),
            latency_ms: None,
        }
    };
    checks.insert("upstream_config".to_string(), upstream_check);

    let status = if ready {
        ComponentStatus::Healthy
    } else {
        ComponentStatus::Unhealthy
    };

    let response = ReadinessResponse {
        ready,
        status,
        checks,
        timestamp: Utc::now().to_rfc3339(),
    };

    if ready {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}

async fn liveness_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"alive": true}))
}

async fn openapi_json(doc: web::Data<utoipa::openapi::OpenApi>) -> actix_web::Result<HttpResponse> {
    let body = serde_json::to_string(&*doc).map_err(|e| {
        tracing::error!("OpenAPI serialization failed: {}", e);
        actix_web::error::ErrorInternalServerError("OpenAPI serialization error")
    })?;

    Ok(HttpResponse::Ok()
        .content_type("application/json")
        .body(body))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Support container healthchecks via CLI subcommand: `healthcheck-http` or legacy `healthcheck`
    {
        let mut args = std::env::args();
        let _bin = args.next();
        if let Some(cmd) = args.next() {
            if cmd == "healthcheck" || cmd == "healthcheck-http" {
                let port =
                    std::env::var("CATALOG_SERVICE_PORT").unwrap_or_else(|_| "8084".to_string());
                let url = format!("http://127.0.0.1:{}/api/v1/health", port);
                match reqwest::Client::new().get(&url).send().await {
                    Ok(resp) if resp.status().is_success() => return Ok(()),
                    Ok(resp) => {
                        eprintln!("healthcheck HTTP status: {}", resp.status());
                        return Err(io::Error::new(io::ErrorKind::Other, "healthcheck failed"));
                    }
                    Err(e) => {
                        eprintln!("healthcheck HTTP error: {}", e);
                        return Err(io::Error::new(io::ErrorKind::Other, "healthcheck error"));
                    }
                }
            }
        }
    }

    dotenvy::dotenv().ok();

    // Initialize tracing; JSON lines in production so the log pipeline can
    // index the structured fields.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,actix_web=debug,sqlx=warn".into());
    let json_logs = std::env::var("APP_ENV")
        .map(|v| v == "production")
        .unwrap_or(false);
    if json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration loading failed: {:#}", e);
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Starting catalog-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);

    // Database pool
    let db_pool = match PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database.url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Database pool creation failed: {:#}", e);
            eprintln!("ERROR: Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Running database migrations...");
    db::MIGRATOR.run(&db_pool).await.map_err(|e| {
        io::Error::new(
            io::ErrorKind::Other,
            format!("Failed to run migrations: {}", e),
        )
    })?;
    tracing::info!("Migrations completed successfully");

    // Upstream platform client
    let upstream: Arc<dyn UpstreamApi> = Arc::new(
        UpstreamClient::new(UpstreamClientConfig {
            api_base_url: config.upstream.api_base_url.clone(),
            feed_base_url: config.upstream.feed_base_url.clone(),
            api_key: config.upstream.api_key.clone(),
            page_size: config.upstream.page_size,
            timeout: Duration::from_secs(config.upstream.timeout_secs),
        })
        .map_err(|e| {
            io::Error::new(
                io::ErrorKind::Other,
                format!("Failed to build upstream client: {}", e),
            )
        })?,
    );
    if !upstream.has_credentials() {
        tracing::warn!("UPSTREAM_API_KEY not set; feed checks work but rebuilds will fail");
    }

    // Cache tiers
    let local_cache = Arc::new(LocalCache::new(
        config.cache.local_max_entries,
        Duration::from_secs(config.cache.local_ttl_secs),
    ));
    let cdn = CdnPurger::new(&config.cache.cdn, &config.cache.site_base_url).map_err(|e| {
        io::Error::new(
            io::ErrorKind::Other,
            format!("Failed to build CDN purge client: {}", e),
        )
    })?;
    if !cdn.is_configured() {
        tracing::warn!("CDN purge credentials not set; tier 2 invalidation will be skipped");
    }
    let revalidator = Revalidator::new(&config.cache.revalidate).map_err(|e| {
        io::Error::new(
            io::ErrorKind::Other,
            format!("Failed to build revalidate client: {}", e),
        )
    })?;
    let cascade = Arc::new(CacheCascade::new(
        local_cache.clone(),
        cdn,
        revalidator,
    ));

    // Sync engine
    let lease = LeaseManager::new(db_pool.clone(), config.sync.lease_ttl_secs);
    let detector = ChangeDetector::new(db_pool.clone(), upstream.clone());
    let rebuilder = PlaylistRebuilder::new(db_pool.clone(), upstream.clone(), config.upstream.max_pages);

    let sweep_job = FeedSweepJob::new(
        db_pool.clone(),
        detector.clone(),
        lease.clone(),
        rebuilder.clone(),
        cascade.clone(),
        config.sync.sweep_concurrency,
        config.sync.rebuild_concurrency,
        config.sync.full_recount_days,
    );
    let idle_job = IdleSweepJob::new(
        db_pool.clone(),
        upstream.clone(),
        lease.clone(),
        rebuilder.clone(),
        cascade.clone(),
        config.upstream.max_pages,
    );
    let verification_job = VerificationJob::new(
        db_pool.clone(),
        upstream.clone(),
        lease.clone(),
        rebuilder.clone(),
        cascade.clone(),
        config.upstream.verify_max_pages,
        config.sync.count_drift_ratio,
    );
    let full_sync_job = FullSyncJob::new(
        db_pool.clone(),
        lease.clone(),
        rebuilder.clone(),
        cascade.clone(),
        config.sync.status_stale_secs as u64,
    );
    let admin_ops = AdminOps::new(
        db_pool.clone(),
        upstream.clone(),
        lease.clone(),
        rebuilder.clone(),
        cascade.clone(),
        config.sync.full_recount_days,
        config.upstream.max_pages,
    );

    let health_state = web::Data::new(HealthState::new(db_pool.clone(), upstream.clone()));

    let pool_data = web::Data::new(db_pool.clone());
    let cache_data = web::Data::new(local_cache.clone());
    let config_data = web::Data::new(config.clone());
    let sweep_data = web::Data::new(sweep_job);
    let idle_data = web::Data::new(idle_job);
    let verification_data = web::Data::new(verification_job);
    let full_sync_data = web::Data::new(full_sync_job);
    let admin_ops_data = web::Data::new(admin_ops);

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    tracing::info!("Starting HTTP server at {}", bind_address);

    let cors_origins = config.cors.allowed_origins.clone();

    HttpServer::new(move || {
        // Build CORS configuration
        let cors_builder = Cors::default();
        let mut cors = cors_builder;
        for origin in cors_origins.split(',') {
            let origin = origin.trim();
            if origin == "*" {
                cors = cors.allow_any_origin();
            } else {
                cors = cors.allowed_origin(origin);
            }
        }
        cors = cors.allow_any_method().allow_any_header().max_age(3600);

        let openapi_doc = ApiDoc::openapi();

        App::new()
            .app_data(web::Data::new(openapi_doc.clone()))
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url(ApiDoc::openapi_json_path(), openapi_doc.clone()),
            )
            .route(ApiDoc::openapi_json_path(), web::get().to(openapi_json))
            .app_data(pool_data.clone())
            .app_data(cache_data.clone())
            .app_data(config_data.clone())
            .app_data(sweep_data.clone())
            .app_data(idle_data.clone())
            .app_data(verification_data.clone())
            .app_data(full_sync_data.clone())
            .app_data(admin_ops_data.clone())
            .app_data(health_state.clone())
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(tracing_actix_web::TracingLogger::default())
            .route(
                "/metrics",
                web::get().to(catalog_service::metrics::serve_metrics),
            )
            // Health check endpoints
            .route("/api/v1/health", web::get().to(health_summary))
            .route("/api/v1/health/ready", web::get().to(readiness_summary))
            .route("/api/v1/health/live", web::get().to(liveness_check))
            .service(
                web::scope("/internal/sync")
                    .route("/sweep", web::post().to(handlers::trigger_sweep))
                    .route("/idle", web::post().to(handlers::trigger_idle_probe))
                    .route("/verify", web::post().to(handlers::trigger_verification))
                    .route("/full", web::post().to(handlers::trigger_full_sync)),
            )
            .service(
                web::scope("/api/v1")
                    .service(
                        web::scope("/admin")
                            .route(
                                "/playlists/{id}/sync",
                                web::post().to(handlers::sync_playlist),
                            )
                            .service(
                                web::resource("/videos/{remote_id}")
                                    .route(web::delete().to(handlers::purge_video)),
                            )
                            .route(
                                "/videos/{remote_id}/fix",
                                web::post().to(handlers::fix_video),
                            )
                            .route(
                                "/verification/run",
                                web::post().to(handlers::run_verification),
                            )
                            .route("/activity", web::get().to(handlers::list_activity)),
                    )
                    .route("/homepage", web::get().to(handlers::get_homepage))
                    .service(
                        web::scope("/playlists")
                            .route("", web::get().to(handlers::list_playlists))
                            .route("/{slug}", web::get().to(handlers::get_playlist)),
                    ),
            )
    })
    .bind(&bind_address)?
    .workers(4)
    .run()
    .await
}
