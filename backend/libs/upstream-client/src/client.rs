use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};

use crate::error::UpstreamError;
use crate::types::{FeedCheck, FeedDocument, FeedValidators, ItemListing, ItemPage, RemoteItem};

const API_KEY_HEADER: &str = "X-Api-Key";

/// Connection settings for [`UpstreamClient`].
#[derive(Debug, Clone)]
pub struct UpstreamClientConfig {
    /// Base URL of the data API, e.g. `https://api.video-platform.example/v3`.
    pub api_base_url: String,
    /// Base URL of the public feed host.
    pub feed_base_url: String,
    /// API key for the data API. Feed checks work without one.
    pub api_key: Option<String>,
    /// Items requested per page (the platform caps this at 50).
    pub page_size: u32,
    /// Hard timeout applied to every request.
    pub timeout: Duration,
}

/// Abstraction over the platform so sync code can run against fakes.
#[async_trait]
pub trait UpstreamApi: Send + Sync {
    /// Whether data-API calls can be made at all.
    fn has_credentials(&self) -> bool;

    /// Canonical feed URL for a playlist; used as the validator-store key.
    fn feed_url(&self, playlist_remote_id: &str) -> String;

    /// Conditional feed fetch. `changed == false` only on a 304.
    async fn check_feed(
        &self,
        playlist_remote_id: &str,
        validators: &FeedValidators,
    ) -> Result<FeedCheck, UpstreamError>;

    /// One page of a playlist's item list.
    async fn list_page(
        &self,
        playlist_remote_id: &str,
        page_token: Option<&str>,
    ) -> Result<ItemPage, UpstreamError>;

    /// The full item list, paginating up to `max_pages`.
    async fn list_all(
        &self,
        playlist_remote_id: &str,
        max_pages: u32,
    ) -> Result<ItemListing, UpstreamError>;

    /// Single video snapshot; `None` when the platform no longer has it.
    async fn fetch_video(
        &self,
        video_remote_id: &str,
    ) -> Result<Option<RemoteItem>, UpstreamError>;
}

/// HTTP implementation of [`UpstreamApi`].
pub struct UpstreamClient {
    http: reqwest::Client,
    api_base: String,
    feed_base: String,
    api_key: Option<String>,
    page_size: u32,
}

impl UpstreamClient {
    pub fn new(config: UpstreamClientConfig) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("telecast-catalog/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            api_base: config.api_base_url.trim_end_matches('/').to_string(),
            feed_base: config.feed_base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.filter(|key| !key.trim().is_empty()),
            page_size: config.page_size.max(1),
        })
    }

    fn items_url(&self, playlist_remote_id: &str) -> String {
        format!("{}/playlists/{}/items", self.api_base, playlist_remote_id)
    }

    fn video_url(&self, video_remote_id: &str) -> String {
        format!("{}/videos/{}", self.api_base, video_remote_id)
    }

    fn require_key(&self) -> Result<&str, UpstreamError> {
        self.api_key
            .as_deref()
            .ok_or(UpstreamError::MissingCredentials)
    }
}

async fn decode_json<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, UpstreamError> {
    resp.json::<T>().await.map_err(|err| {
        if err.is_decode() {
            UpstreamError::Decode(err.to_string())
        } else {
            UpstreamError::Http(err)
        }
    })
}

fn header_string(resp: &reqwest::Response, name: reqwest::header::HeaderName) -> Option<String> {
    resp.headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

#[async_trait]
impl UpstreamApi for UpstreamClient {
    fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    fn feed_url(&self, playlist_remote_id: &str) -> String {
        format!("{}/feeds/playlists/{}", self.feed_base, playlist_remote_id)
    }

    async fn check_feed(
        &self,
        playlist_remote_id: &str,
        validators: &FeedValidators,
    ) -> Result<FeedCheck, UpstreamError> {
        let mut request = self.http.get(self.feed_url(playlist_remote_id));
        if let Some(etag) = &validators.etag {
            request = request.header(IF_NONE_MATCH, etag);
        }
        if let Some(last_modified) = &validators.last_modified {
            request = request.header(IF_MODIFIED_SINCE, last_modified);
        }

        let resp = request.send().await?;
        match resp.status().as_u16() {
            304 => Ok(FeedCheck {
                changed: false,
                status: 304,
                validators: validators.clone(),
                entry_ids: Vec::new(),
            }),
            200 => {
                let fresh = FeedValidators::new(
                    header_string(&resp, ETAG),
                    header_string(&resp, LAST_MODIFIED),
                );
                let doc: FeedDocument = decode_json(resp).await?;
                Ok(FeedCheck {
                    changed: true,
                    status: 200,
                    validators: fresh,
                    entry_ids: doc.entries.into_iter().map(|entry| entry.id).collect(),
                })
            }
            code => Err(UpstreamError::Status(code)),
        }
    }

    async fn list_page(
        &self,
        playlist_remote_id: &str,
        page_token: Option<&str>,
    ) -> Result<ItemPage, UpstreamError> {
        let key = self.require_key()?;
        let mut request = self
            .http
            .get(self.items_url(playlist_remote_id))
            .header(API_KEY_HEADER, key)
            .query(&[("page_size", self.page_size.to_string())]);
        if let Some(token) = page_token {
            request = request.query(&[("page_token", token)]);
        }

        let resp = request.send().await?;
        match resp.status().as_u16() {
            200 => decode_json(resp).await,
            code => Err(UpstreamError::Status(code)),
        }
    }

    async fn list_all(
        &self,
        playlist_remote_id: &str,
        max_pages: u32,
    ) -> Result<ItemListing, UpstreamError> {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages_fetched = 0u32;
        let mut truncated = false;

        loop {
            let page = self
                .list_page(playlist_remote_id, page_token.as_deref())
                .await?;
            pages_fetched += 1;
            items.extend(page.items);

            match page.next_page_token {
                Some(_) if pages_fetched >= max_pages => {
                    tracing::warn!(
                        playlist = playlist_remote_id,
                        pages = pages_fetched,
                        "item listing hit the page cap; treating result as truncated"
                    );
                    truncated = true;
                    break;
                }
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        Ok(ItemListing {
            items,
            pages_fetched,
            truncated,
        })
    }

    async fn fetch_video(
        &self,
        video_remote_id: &str,
    ) -> Result<Option<RemoteItem>, UpstreamError> {
        let key = self.require_key()?;
        let resp = self
            .http
            .get(self.video_url(video_remote_id))
            .header(API_KEY_HEADER, key)
            .send()
            .await?;

        match resp.status().as_u16() {
            200 => Ok(Some(decode_json(resp).await?)),
            404 => Ok(None),
            code => Err(UpstreamError::Status(code)),
        }
    }
}
