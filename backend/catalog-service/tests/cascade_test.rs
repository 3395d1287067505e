//! Tier independence of the cache invalidation cascade.
//!
//! The CDN and revalidation endpoints are wiremock fakes, so these tests
//! exercise the real HTTP clients without a database and pin the contract
//! that no tier's failure prevents another tier from running.

use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use catalog_service::cache::{local, CacheCascade, CdnPurger, LocalCache, Revalidator};
use catalog_service::config::{CdnConfig, RevalidateConfig};

fn cdn_config(base: &str) -> CdnConfig {
    CdnConfig {
        api_base_url: base.to_string(),
        zone_id: "zone-1".to_string(),
        api_token: "test-token".to_string(),
        purge_tag: "catalog".to_string(),
        timeout_secs: 5,
    }
}

fn revalidate_config(base: &str) -> RevalidateConfig {
    RevalidateConfig {
        url: format!("{}/revalidate", base),
        secret: "s3cret".to_string(),
        timeout_secs: 5,
    }
}

fn seeded_cache() -> Arc<LocalCache> {
    let cache = Arc::new(LocalCache::new(32, Duration::from_secs(60)));
    cache.insert(local::homepage_key(), "home".to_string());
    cache.insert(local::playlist_index_key(), "index".to_string());
    cache.insert(local::playlist_key("news"), "news-body".to_string());
    cache.insert(local::playlist_key("music"), "music-body".to_string());
    cache
}

fn cascade(cache: Arc<LocalCache>, cdn_base: &str, reval_base: &str) -> CacheCascade {
    let cdn = CdnPurger::new(&cdn_config(cdn_base), "https://site.example").unwrap();
    let revalidator = Revalidator::new(&revalidate_config(reval_base)).unwrap();
    CacheCascade::new(cache, cdn, revalidator)
}

#[tokio::test]
async fn all_tiers_succeed_on_healthy_backends() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/zones/zone-1/purge"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/revalidate"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let cache = seeded_cache();
    let cascade = cascade(cache.clone(), &server.uri(), &server.uri());

    let outcome = cascade.run(Some("vid-9"), &["news".to_string()]).await;

    assert!(outcome.all_succeeded());
    // Affected entries are gone, unrelated ones survive.
    assert!(cache.get(&local::homepage_key()).is_none());
    assert!(cache.get(&local::playlist_key("news")).is_none());
    assert!(cache.get(&local::playlist_key("music")).is_some());
}

#[tokio::test]
async fn cdn_url_purge_falls_back_to_tag_purge() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/zones/zone-1/purge"))
        .and(body_string_contains("files"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/zones/zone-1/purge"))
        .and(body_string_contains("tags"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/revalidate"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let cascade = cascade(seeded_cache(), &server.uri(), &server.uri());

    let outcome = cascade.run(None, &["news".to_string()]).await;

    assert!(outcome.cdn_purged, "tag fallback must rescue a failed URL purge");
    assert!(outcome.all_succeeded());
}

#[tokio::test]
async fn cdn_failure_does_not_block_other_tiers() {
    let server = MockServer::start().await;
    // Both purge forms fail; revalidation stays healthy.
    Mock::given(method("POST"))
        .and(path("/zones/zone-1/purge"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/revalidate"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let cache = seeded_cache();
    let cascade = cascade(cache.clone(), &server.uri(), &server.uri());

    let outcome = cascade.run(None, &["news".to_string()]).await;

    assert!(outcome.lru_cleared);
    assert!(!outcome.cdn_purged);
    assert!(outcome.pages_revalidated);
    assert!(cache.get(&local::playlist_key("news")).is_none());
}

#[tokio::test]
async fn revalidation_failure_is_reported_per_tier() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/zones/zone-1/purge"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/revalidate"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let cascade = cascade(seeded_cache(), &server.uri(), &server.uri());

    let outcome = cascade.run(None, &["news".to_string()]).await;

    assert!(outcome.lru_cleared);
    assert!(outcome.cdn_purged);
    assert!(!outcome.pages_revalidated);
}

#[tokio::test]
async fn unconfigured_tiers_are_successful_no_ops() {
    let cdn = CdnPurger::new(
        &CdnConfig {
            api_base_url: "https://cdn.example".to_string(),
            zone_id: String::new(),
            api_token: String::new(),
            purge_tag: "catalog".to_string(),
            timeout_secs: 5,
        },
        "https://site.example",
    )
    .unwrap();
    let revalidator = Revalidator::new(&RevalidateConfig {
        url: String::new(),
        secret: String::new(),
        timeout_secs: 5,
    })
    .unwrap();
    let cascade = CacheCascade::new(seeded_cache(), cdn, revalidator);

    let outcome = cascade.run(None, &["news".to_string()]).await;

    assert!(
        outcome.all_succeeded(),
        "unconfigured remote tiers must not poison the per-tier report"
    );
}
