//! Typed client for the upstream video platform.
//!
//! The catalog engine never talks to the platform directly; everything goes
//! through this crate so that rate-limit discipline (conditional fetches,
//! page caps) and error classification live in one place.
//!
//! # Endpoints
//!
//! - **Feed** (`{feed_base}/feeds/playlists/{id}`): lightweight JSON feed of
//!   the latest entries in a playlist. Supports conditional GET via
//!   `ETag` / `Last-Modified`; a `304 Not Modified` is the cheap "nothing to
//!   do" answer. No API key required.
//! - **Item listing** (`{api_base}/playlists/{id}/items`): paginated,
//!   authoritative item list (page token based). Requires an API key.
//! - **Video lookup** (`{api_base}/videos/{id}`): single item snapshot.
//!   Requires an API key.
//!
//! The [`UpstreamApi`] trait abstracts the client so service code and tests
//! can substitute implementations.
//!
//! # Example
//!
//! ```no_run
//! use upstream_client::{UpstreamApi, UpstreamClient, UpstreamClientConfig, FeedValidators};
//!
//! # async fn example() -> Result<(), upstream_client::UpstreamError> {
//! let client = UpstreamClient::new(UpstreamClientConfig {
//!     api_base_url: "https://api.video-platform.example/v3".into(),
//!     feed_base_url: "https://www.video-platform.example".into(),
//!     api_key: Some("key".into()),
//!     page_size: 50,
//!     timeout: std::time::Duration::from_secs(10),
//! })?;
//!
//! let check = client.check_feed("PL123", &FeedValidators::default()).await?;
//! if check.changed {
//!     let listing = client.list_all("PL123", 40).await?;
//!     println!("{} items", listing.items.len());
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod types;

pub use client::{UpstreamApi, UpstreamClient, UpstreamClientConfig};
pub use error::UpstreamError;
pub use types::{FeedCheck, FeedValidators, ItemListing, ItemPage, RemoteItem};
