//! Static-regeneration trigger (tier 3 of the invalidation cascade).
//!
//! POSTs the affected logical paths to the display layer's revalidation
//! endpoint, which schedules page rebuilds on its side. A 2xx answer means
//! scheduled, nothing more; the pages regenerate asynchronously.

use std::time::Duration;

use serde_json::json;
use tracing::{debug, warn};

use crate::config::RevalidateConfig;

pub struct Revalidator {
    http: reqwest::Client,
    url: String,
    secret: String,
    configured: bool,
}

impl Revalidator {
    pub fn new(config: &RevalidateConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            configured: !config.url.trim().is_empty(),
            url: config.url.clone(),
            secret: config.secret.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Ask the display layer to regenerate the given paths.
    /// Returns whether regeneration is believed scheduled.
    pub async fn revalidate(&self, paths: &[String]) -> bool {
        if !self.configured {
            debug!("revalidation skipped: tier not configured");
            return true;
        }
        if paths.is_empty() {
            return true;
        }

        let body = json!({ "paths": paths, "secret": self.secret });
        match self.http.post(&self.url).json(&body).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(paths = paths.len(), "page regeneration scheduled");
                true
            }
            Ok(response) => {
                warn!(status = response.status().as_u16(), "revalidation endpoint rejected request");
                false
            }
            Err(err) => {
                warn!(error = %err, "revalidation request failed");
                false
            }
        }
    }
}
