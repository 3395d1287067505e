//! CDN purge client (tier 2 of the invalidation cascade).
//!
//! Purges by explicit URL list, never by wildcard; when the URL-based call
//! itself fails, falls back to a coarse tag purge so stale pages still age
//! out quickly. An unconfigured CDN (no zone or token) makes this tier a
//! no-op that reports success.

use std::time::Duration;

use serde_json::json;
use tracing::{debug, warn};

use crate::config::CdnConfig;

pub struct CdnPurger {
    http: reqwest::Client,
    purge_url: String,
    api_token: String,
    purge_tag: String,
    site_base: String,
    configured: bool,
}

impl CdnPurger {
    pub fn new(config: &CdnConfig, site_base_url: &str) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let configured =
            !config.zone_id.trim().is_empty() && !config.api_token.trim().is_empty();

        Ok(Self {
            http,
            purge_url: format!(
                "{}/zones/{}/purge",
                config.api_base_url.trim_end_matches('/'),
                config.zone_id
            ),
            api_token: config.api_token.clone(),
            purge_tag: config.purge_tag.clone(),
            site_base: site_base_url.trim_end_matches('/').to_string(),
            configured,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Purge the given logical paths from the edge.
    ///
    /// Returns whether the edge is believed clean afterwards: `true` on a
    /// successful URL purge, a successful tag fallback, or an unconfigured
    /// tier; `false` only when both purge forms failed.
    pub async fn purge_paths(&self, paths: &[String]) -> bool {
        if !self.configured {
            debug!("CDN purge skipped: tier not configured");
            return true;
        }
        if paths.is_empty() {
            return true;
        }

        let files: Vec<String> = paths
            .iter()
            .map(|path| format!("{}{}", self.site_base, path))
            .collect();

        match self.send_purge(json!({ "files": files })).await {
            Ok(()) => {
                debug!(urls = files.len(), "CDN purge by URL succeeded");
                true
            }
            Err(err) => {
                warn!(error = %err, "CDN purge by URL failed, falling back to tag purge");
                match self.send_purge(json!({ "tags": [self.purge_tag] })).await {
                    Ok(()) => {
                        debug!(tag = %self.purge_tag, "CDN tag purge succeeded");
                        true
                    }
                    Err(err) => {
                        warn!(error = %err, "CDN tag purge failed");
                        false
                    }
                }
            }
        }
    }

    async fn send_purge(&self, body: serde_json::Value) -> Result<(), String> {
        let response = self
            .http
            .post(&self.purge_url)
            .bearer_auth(&self.api_token)
            .json(&body)
            .send()
            .await
            .map_err(|err| err.to_string())?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(format!("purge endpoint returned {}", status.as_u16()))
        }
    }
}
